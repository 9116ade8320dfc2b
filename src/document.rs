//! The target XML document a signature is inserted into.

use crate::error::{Error, Result};
use xml::reader::XmlEvent;

/// A parsed XML document held as `xml-rs` reader events.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    events: Vec<XmlEvent>,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self> {
        let events = xml::reader::EventReader::new_with_config(
            source.as_bytes(),
            xml::ParserConfig::new()
                .ignore_comments(false)
                .trim_whitespace(false)
                .coalesce_characters(true)
                .ignore_root_level_whitespace(true),
        )
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Xml(format!("unable to decode XML: {}", e)))?;

        if !events
            .iter()
            .any(|e| matches!(e, XmlEvent::StartElement { .. }))
        {
            return Err(Error::Xml("document has no root element".to_string()));
        }

        Ok(Document { events })
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn root_name(&self) -> Option<&xml::name::OwnedName> {
        self.events.iter().find_map(|e| match e {
            XmlEvent::StartElement { name, .. } => Some(name),
            _ => None,
        })
    }

    pub fn to_xml(&self) -> Result<String> {
        crate::events_to_string(&self.events)
    }

    /// A copy of this document with `subtree` appended as the last child of the
    /// document element. The copy is re-parsed so that every event carries its
    /// real in-scope namespaces.
    pub(crate) fn with_last_child(&self, subtree: &[XmlEvent]) -> Result<Document> {
        let root_end = self
            .events
            .iter()
            .rposition(|e| matches!(e, XmlEvent::EndElement { .. }))
            .ok_or_else(|| Error::InvalidInput("document has no root element".to_string()))?;

        let mut events = Vec::with_capacity(self.events.len() + subtree.len());
        events.extend_from_slice(&self.events[..root_end]);
        events.extend(subtree.iter().cloned());
        events.extend_from_slice(&self.events[root_end..]);

        Document::parse(&crate::events_to_string(&events)?)
    }
}

impl std::str::FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Document::parse(s)
    }
}

//! The XML writer abstraction every element of the model serializes through.

use crate::error::{Error, Result};
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::namespace::NamespaceStack;
use xml::reader::XmlEvent;

pub trait XmlWriter {
    /// Opens an element. An empty `prefix` binds `namespace` as the default namespace.
    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str)
        -> Result<()>;

    fn write_end_element(&mut self) -> Result<()>;

    /// Adds an attribute to the element opened last. Only valid before any content is written.
    fn write_attribute(
        &mut self,
        prefix: &str,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<()>;

    /// Like [`XmlWriter::write_attribute`], additionally registering `value` as a
    /// fragment identifier that `#value` references can point at.
    fn write_id_attribute(
        &mut self,
        prefix: &str,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<()>;

    fn write_characters(&mut self, text: &str) -> Result<()>;

    /// Splices a foreign node into the output as is.
    fn marshal_foreign_node(&mut self, node: &ForeignNode) -> Result<()>;

    fn write_text_element(
        &mut self,
        prefix: &str,
        local_name: &str,
        namespace: &str,
        text: &str,
    ) -> Result<()> {
        self.write_start_element(prefix, local_name, namespace)?;
        self.write_characters(text)?;
        self.write_end_element()
    }
}

fn owned_name(prefix: &str, namespace: Option<&str>, local_name: &str) -> OwnedName {
    OwnedName {
        local_name: local_name.to_string(),
        namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        prefix: if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_string())
        },
    }
}

/// [`XmlWriter`] producing owned `xml-rs` reader events.
///
/// Every start event carries the full set of namespaces in scope, the same
/// shape the `xml-rs` parser produces, so the output can be spliced into a
/// parsed document or canonicalized directly.
#[derive(Debug)]
pub struct EventWriter {
    events: Vec<XmlEvent>,
    namespaces: NamespaceStack,
    open: Vec<OwnedName>,
    pending: Option<(OwnedName, Vec<OwnedAttribute>)>,
    ids: Vec<String>,
}

impl Default for EventWriter {
    fn default() -> Self {
        EventWriter {
            events: vec![],
            namespaces: NamespaceStack::default(),
            open: vec![],
            pending: None,
            ids: vec![],
        }
    }
}

impl EventWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers written through [`XmlWriter::write_id_attribute`] so far.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn into_events(mut self) -> Result<Vec<XmlEvent>> {
        self.flush();
        if let Some(name) = self.open.last() {
            return Err(Error::Serialization(format!(
                "element {} was never closed",
                name
            )));
        }
        Ok(self.events)
    }

    fn flush(&mut self) {
        if let Some((name, attributes)) = self.pending.take() {
            self.events.push(XmlEvent::StartElement {
                name,
                attributes,
                namespace: self.namespaces.squash(),
            });
        }
    }

    fn bind(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        if self.namespaces.get(prefix) == Some(namespace) {
            return Ok(());
        }
        if namespace.is_empty() && !prefix.is_empty() {
            return Err(Error::Serialization(format!(
                "prefix {} cannot be bound to the empty namespace",
                prefix
            )));
        }
        self.namespaces.put(prefix, namespace);
        Ok(())
    }

    fn add_attribute(
        &mut self,
        prefix: &str,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<()> {
        if self.pending.is_none() {
            return Err(Error::Serialization(format!(
                "attribute {} written outside of a start tag",
                local_name
            )));
        }
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            if prefix.is_empty() {
                return Err(Error::Serialization(format!(
                    "namespaced attribute {} needs a prefix",
                    local_name
                )));
            }
            self.bind(prefix, ns)?;
        }
        if let Some((_, attributes)) = self.pending.as_mut() {
            attributes.push(OwnedAttribute {
                name: owned_name(prefix, namespace, local_name),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

impl XmlWriter for EventWriter {
    fn write_start_element(
        &mut self,
        prefix: &str,
        local_name: &str,
        namespace: &str,
    ) -> Result<()> {
        self.flush();
        self.namespaces.push_empty();
        self.bind(prefix, namespace)?;
        let name = owned_name(prefix, Some(namespace), local_name);
        self.open.push(name.clone());
        self.pending = Some((name, vec![]));
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.flush();
        let name = self
            .open
            .pop()
            .ok_or_else(|| Error::Serialization("end element without open element".to_string()))?;
        self.namespaces.try_pop();
        self.events.push(XmlEvent::EndElement { name });
        Ok(())
    }

    fn write_attribute(
        &mut self,
        prefix: &str,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<()> {
        self.add_attribute(prefix, namespace, local_name, value)
    }

    fn write_id_attribute(
        &mut self,
        prefix: &str,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<()> {
        self.add_attribute(prefix, namespace, local_name, value)?;
        self.ids.push(value.to_string());
        Ok(())
    }

    fn write_characters(&mut self, text: &str) -> Result<()> {
        self.flush();
        if self.open.is_empty() {
            return Err(Error::Serialization(
                "character data outside of an element".to_string(),
            ));
        }
        if !text.is_empty() {
            self.events.push(XmlEvent::Characters(text.to_string()));
        }
        Ok(())
    }

    fn marshal_foreign_node(&mut self, node: &ForeignNode) -> Result<()> {
        self.flush();
        if self.open.is_empty() {
            return Err(Error::Serialization(
                "foreign node outside of an element".to_string(),
            ));
        }
        self.events.extend(node.events.iter().cloned());
        Ok(())
    }
}

/// An owned copy of a piece of foreign XML: one element subtree, or a single
/// non-element node such as text.
///
/// Two nodes are equal when their events are, so both content and order count.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignNode {
    events: Vec<XmlEvent>,
}

impl ForeignNode {
    /// Parses `source` and keeps its document element.
    pub fn parse(source: &str) -> Result<Self> {
        let doc = crate::document::Document::parse(source)?;
        let events = doc.events();
        let start = events
            .iter()
            .position(|e| matches!(e, XmlEvent::StartElement { .. }))
            .ok_or_else(|| Error::Xml("fragment has no element".to_string()))?;
        let end = events
            .iter()
            .rposition(|e| matches!(e, XmlEvent::EndElement { .. }))
            .ok_or_else(|| Error::Xml("fragment has no element".to_string()))?;
        Ok(ForeignNode {
            events: events[start..end + 1].to_vec(),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        ForeignNode {
            events: vec![XmlEvent::Characters(text.into())],
        }
    }

    /// Wraps already parsed events. Document start and end markers are dropped;
    /// the remainder must form exactly one balanced node.
    pub fn from_events(events: Vec<XmlEvent>) -> Result<Self> {
        let events = events
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    XmlEvent::StartDocument { .. } | XmlEvent::EndDocument
                )
            })
            .collect::<Vec<_>>();

        let mut depth = 0usize;
        for (i, e) in events.iter().enumerate() {
            match e {
                XmlEvent::StartElement { .. } => depth += 1,
                XmlEvent::EndElement { .. } => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| Error::Xml("unbalanced end element".to_string()))?;
                }
                _ => {}
            }
            if depth == 0 && i + 1 < events.len() {
                return Err(Error::Xml("events hold more than one node".to_string()));
            }
        }
        if events.is_empty() || depth != 0 {
            return Err(Error::Xml("events do not form a complete node".to_string()));
        }
        Ok(ForeignNode { events })
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn is_element(&self) -> bool {
        matches!(self.events.first(), Some(XmlEvent::StartElement { .. }))
    }

    /// The child nodes of an element node, in document order.
    pub fn children(&self) -> Vec<ForeignNode> {
        if !self.is_element() || self.events.len() < 2 {
            return vec![];
        }

        let mut nodes = vec![];
        let mut current = vec![];
        let mut depth = 0usize;
        for e in &self.events[1..self.events.len() - 1] {
            match e {
                XmlEvent::StartElement { .. } => depth += 1,
                XmlEvent::EndElement { .. } => depth = depth.saturating_sub(1),
                _ => {}
            }
            current.push(e.clone());
            if depth == 0 {
                nodes.push(ForeignNode {
                    events: std::mem::take(&mut current),
                });
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::outline;

    #[test]
    fn writes_nested_elements_with_namespaces() {
        let mut w = EventWriter::new();
        w.write_start_element("xades", "A", "urn:x").unwrap();
        w.write_id_attribute("", None, "Id", "a1").unwrap();
        w.write_text_element("xades", "B", "urn:x", "t").unwrap();
        w.write_start_element("ds", "C", "urn:ds").unwrap();
        w.write_attribute("", None, "Algorithm", "urn:alg").unwrap();
        w.write_end_element().unwrap();
        w.write_end_element().unwrap();

        assert_eq!(w.ids().to_vec(), vec!["a1".to_string()]);
        assert_eq!(
            outline(&w.into_events().unwrap()),
            vec![
                "<xades:A {urn:x} Id=a1>",
                "<xades:B {urn:x}>",
                "t",
                "</xades:B>",
                "<ds:C {urn:ds} Algorithm=urn:alg>",
                "</ds:C>",
                "</xades:A>",
            ]
        );
    }

    #[test]
    fn declares_namespace_once() {
        let mut w = EventWriter::new();
        w.write_start_element("xades", "A", "urn:x").unwrap();
        w.write_text_element("xades", "B", "urn:x", "t").unwrap();
        w.write_end_element().unwrap();

        let out = crate::events_to_string(&w.into_events().unwrap()).unwrap();
        assert_eq!(out.matches("xmlns:xades=\"urn:x\"").count(), 1);
        assert!(out.contains("<xades:B>t</xades:B>"));
    }

    #[test]
    fn rejects_misplaced_output() {
        let mut w = EventWriter::new();
        assert!(matches!(
            w.write_attribute("", None, "Id", "x"),
            Err(Error::Serialization(_))
        ));
        assert!(w.write_end_element().is_err());
        assert!(w.write_characters("t").is_err());

        w.write_start_element("p", "A", "urn:x").unwrap();
        w.write_characters("t").unwrap();
        assert!(w.write_attribute("", None, "Id", "x").is_err());
        assert!(w.into_events().is_err());
    }

    #[test]
    fn splices_foreign_nodes() {
        let node = ForeignNode::parse(r#"<r:role xmlns:r="urn:r">Manager</r:role>"#).unwrap();
        let mut w = EventWriter::new();
        w.write_start_element("xades", "ClaimedRole", "urn:x").unwrap();
        w.marshal_foreign_node(&node).unwrap();
        w.marshal_foreign_node(&ForeignNode::text("!")).unwrap();
        w.write_end_element().unwrap();

        assert_eq!(
            outline(&w.into_events().unwrap()),
            vec![
                "<xades:ClaimedRole {urn:x}>",
                "<r:role {urn:r}>",
                "Manager",
                "</r:role>",
                "!",
                "</xades:ClaimedRole>",
            ]
        );
    }

    #[test]
    fn foreign_node_children_keep_order() {
        let node = ForeignNode::parse("<roles><a>1</a>text<b/></roles>").unwrap();
        let children = node.children();
        assert_eq!(children.len(), 3);
        assert!(children[0].is_element());
        assert_eq!(children[1], ForeignNode::text("text"));
        assert!(ForeignNode::parse("<empty/>").unwrap().children().is_empty());
        assert!(ForeignNode::text("t").children().is_empty());
    }

    #[test]
    fn from_events_requires_one_balanced_node() {
        let doc = crate::document::Document::parse("<a><b/></a>").unwrap();
        assert!(ForeignNode::from_events(doc.events().to_vec()).is_ok());
        assert!(ForeignNode::from_events(doc.events()[1..3].to_vec()).is_err());
        assert!(ForeignNode::from_events(vec![]).is_err());
    }
}

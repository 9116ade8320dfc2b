//! Canonical XML 1.0/1.1 and Exclusive Canonical XML over `xml-rs` events.
//!
//! The input is a slice of events starting either at the document start or at
//! the start tag of the element to canonicalize. Each start event must carry
//! its complete in-scope namespace set, which is what the `xml-rs` reader
//! produces.

use crate::error::{Error, Result};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Inclusive,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonicalization {
    pub method: Method,
    pub with_comments: bool,
}

impl Canonicalization {
    pub fn from_uri(uri: &str) -> Option<Self> {
        let (method, with_comments) = match uri {
            crate::CANONICAL_1_0 | crate::CANONICAL_1_1 => (Method::Inclusive, false),
            crate::CANONICAL_1_0_COMMENTS | crate::CANONICAL_1_1_COMMENTS => {
                (Method::Inclusive, true)
            }
            crate::CANONICAL_EXCLUSIVE_1_0 => (Method::Exclusive, false),
            crate::CANONICAL_EXCLUSIVE_1_0_COMMENTS => (Method::Exclusive, true),
            _ => return None,
        };
        Some(Canonicalization {
            method,
            with_comments,
        })
    }

    pub fn apply(&self, events: &[xml::reader::XmlEvent]) -> Result<String> {
        canonicalize(events, self.with_comments, self.method == Method::Exclusive)
    }
}

fn escape_text(data: &str) -> String {
    data.replace("\r\n", "\n")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\r', "&#xD;")
}

fn canon_attr<'a>(
    whitespace: &regex::Regex,
    a: &'a xml::attribute::OwnedAttribute,
) -> (xml::name::Name<'a>, String) {
    (
        a.name.borrow(),
        whitespace
            .replace_all(&a.value, " ")
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('"', "&quot;"),
    )
}

fn attr_order(a: &xml::name::Name, b: &xml::name::Name) -> std::cmp::Ordering {
    match (a.prefix, b.prefix) {
        (None, None) => a.local_name.cmp(b.local_name),
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(_), Some(_)) => {
            let a_ns = a.namespace.unwrap_or_default();
            let b_ns = b.namespace.unwrap_or_default();
            if a_ns == b_ns {
                a.local_name.cmp(b.local_name)
            } else {
                a_ns.cmp(b_ns)
            }
        }
    }
}

pub fn canonicalize(
    events: &[xml::reader::XmlEvent],
    include_comments: bool,
    exclusive: bool,
) -> Result<String> {
    let whitespace = regex::Regex::new(r"[ \r\n\t]")
        .map_err(|e| Error::Canonicalization(e.to_string()))?;

    let mut output = Vec::new();
    let mut output_writer = xml::writer::EventWriter::new_with_config(
        &mut output,
        xml::writer::EmitterConfig {
            perform_indent: false,
            perform_escaping: false,
            write_document_declaration: false,
            autopad_comments: false,
            cdata_to_characters: true,
            line_separator: std::borrow::Cow::Borrowed("\n"),
            normalize_empty_elements: false,
            ..std::default::Default::default()
        },
    );

    let mut level: usize = 0;
    let mut inherited_xml_attrs = vec![];
    let mut exc_ns_stack = xml::namespace::NamespaceStack::default();
    for (i, event) in events.iter().enumerate() {
        let written = match event {
            xml::reader::XmlEvent::ProcessingInstruction { name, data } => {
                output_writer.write(xml::writer::XmlEvent::ProcessingInstruction {
                    name,
                    data: data.as_deref(),
                })
            }
            xml::reader::XmlEvent::StartElement {
                name,
                attributes,
                namespace,
            } => {
                let own_xml_attrs = attributes
                    .iter()
                    .filter(|a| a.name.namespace.as_deref() == Some(XML_NAMESPACE))
                    .collect::<Vec<_>>();
                let ancestor_xml_attrs = inherited_xml_attrs.clone();
                inherited_xml_attrs.push(own_xml_attrs);
                level += 1;

                let attribute_prefixes = attributes
                    .iter()
                    .map(|a| a.name.prefix.as_deref())
                    .collect::<Vec<_>>();
                exc_ns_stack.push_empty();
                exc_ns_stack.extend(
                    namespace
                        .0
                        .iter()
                        .filter(|n| {
                            name.prefix.as_deref().unwrap_or("") == n.0.as_str()
                                || attribute_prefixes.contains(&Some(n.0.as_str()))
                        })
                        .map(|n| (n.0.as_str(), n.1.as_str()))
                        .collect::<Vec<_>>(),
                );

                // The apex element of a document subset inherits xml:* attributes
                // from its ancestors in inclusive mode.
                let mut mapped_attr = if i == 0 && !exclusive {
                    let present = attributes
                        .iter()
                        .filter(|a| a.name.namespace.as_deref() == Some(XML_NAMESPACE))
                        .map(|a| a.name.local_name.clone())
                        .collect::<Vec<_>>();
                    attributes
                        .iter()
                        .chain(
                            ancestor_xml_attrs
                                .iter()
                                .flatten()
                                .filter(|a| !present.contains(&a.name.local_name))
                                .copied(),
                        )
                        .map(|a| canon_attr(&whitespace, a))
                        .collect::<Vec<_>>()
                } else {
                    attributes
                        .iter()
                        .map(|a| canon_attr(&whitespace, a))
                        .collect::<Vec<_>>()
                };
                mapped_attr.sort_by(|a, b| attr_order(&a.0, &b.0));

                output_writer.write(xml::writer::XmlEvent::StartElement {
                    name: name.borrow(),
                    attributes: mapped_attr
                        .iter()
                        .map(|a| xml::attribute::Attribute {
                            name: a.0,
                            value: &a.1,
                        })
                        .collect(),
                    namespace: if exclusive {
                        std::borrow::Cow::Owned(exc_ns_stack.squash())
                    } else {
                        std::borrow::Cow::Borrowed(namespace)
                    },
                })
            }
            xml::reader::XmlEvent::EndElement { name } => {
                inherited_xml_attrs.pop();
                exc_ns_stack.try_pop();
                level = level.saturating_sub(1);

                let res = output_writer.write(xml::writer::XmlEvent::EndElement {
                    name: Some(name.borrow()),
                });
                if res.is_ok() && level == 0 {
                    break;
                }
                res
            }
            xml::reader::XmlEvent::CData(data) | xml::reader::XmlEvent::Characters(data) => {
                output_writer.write(xml::writer::XmlEvent::Characters(&escape_text(data)))
            }
            xml::reader::XmlEvent::Comment(data) => {
                if include_comments {
                    output_writer.write(xml::writer::XmlEvent::Comment(&data.replace("\r\n", "\n")))
                } else {
                    Ok(())
                }
            }
            xml::reader::XmlEvent::Whitespace(data) => {
                if level > 0 {
                    output_writer.write(xml::writer::XmlEvent::Characters(&data.replace("\r\n", "\n")))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        };
        written.map_err(|e| Error::Canonicalization(e.to_string()))?;
    }

    Ok(String::from_utf8_lossy(&output).to_string())
}

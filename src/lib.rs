//! XAdES qualifying properties and enveloped XAdES signatures.
//!
//! The element model under [`model`] mirrors the XAdES schemas of both
//! supported dialects (ETSI TS 101 903 V1.4.1 and ETSI EN 319 132 V1.1.1).
//! Instances are created through [`XadesFactory`], which picks the dialect
//! specific variant of every element, and serialized through the
//! [`writer::XmlWriter`] abstraction. [`EnvelopedSignatureBuilder`] wires
//! everything into a complete enveloped signature and signs it with a
//! [`SignatureEngine`].

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod builder;
pub mod c14n;
pub mod context;
pub mod dialect;
pub mod document;
pub mod dsig;
pub mod engine;
pub mod error;
pub mod factory;
pub mod model;
pub mod proto;
pub mod signature;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use builder::{EnvelopedSignatureBuilder, ObjectId};
pub use context::MarshalContext;
pub use dialect::{Dialect, SignatureSettings};
pub use document::Document;
pub use engine::{OpensslEngine, SignatureEngine};
pub use error::{Error, Result};
pub use factory::XadesFactory;
pub use signature::XadesSignature;
pub use writer::{EventWriter, ForeignNode, XmlWriter};

pub const DSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XADES_NS: &str = "http://uri.etsi.org/01903/v1.3.2#";
pub const XADES141_NS: &str = "http://uri.etsi.org/01903/v1.4.1#";

pub const DSIG_PREFIX: &str = "ds";
pub const XADES_PREFIX: &str = "xades";
pub const XADES141_PREFIX: &str = "xades141";

/// `Type` of the reference that covers the `SignedProperties` element.
pub const SIGNED_PROPERTIES_TYPE: &str = "http://uri.etsi.org/01903#SignedProperties";

pub const DIGEST_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const DIGEST_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";
pub const DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const DIGEST_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const DIGEST_SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

pub const TRANSFORM_ENVELOPED_SIGNATURE: &str =
    "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

pub const CANONICAL_1_0: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const CANONICAL_1_0_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
pub const CANONICAL_1_1: &str = "http://www.w3.org/2006/10/xml-c14n11";
pub const CANONICAL_1_1_COMMENTS: &str = "http://www.w3.org/2006/10/xml-c14n11#WithComments";
pub const CANONICAL_EXCLUSIVE_1_0: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const CANONICAL_EXCLUSIVE_1_0_COMMENTS: &str =
    "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

pub const SIGNATURE_RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const SIGNATURE_RSA_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha224";
pub const SIGNATURE_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const SIGNATURE_RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
pub const SIGNATURE_RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";
pub const SIGNATURE_ECDSA_SHA1: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha1";
pub const SIGNATURE_ECDSA_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha224";
pub const SIGNATURE_ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
pub const SIGNATURE_ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";
pub const SIGNATURE_ECDSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512";
pub const SIGNATURE_DSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#dsa-sha1";
pub const SIGNATURE_DSA_SHA256: &str = "http://www.w3.org/2009/xmldsig11#dsa-sha256";

fn rfc2253_keyword(oid: &yasna::models::ObjectIdentifier) -> Option<&'static str> {
    Some(match oid.components().as_slice() {
        [2, 5, 4, 3] => "CN",
        [2, 5, 4, 7] => "L",
        [2, 5, 4, 8] => "ST",
        [2, 5, 4, 10] => "O",
        [2, 5, 4, 11] => "OU",
        [2, 5, 4, 6] => "C",
        [2, 5, 4, 9] => "STREET",
        [0, 9, 2342, 19200300, 100, 1, 25] => "DC",
        [0, 9, 2342, 19200300, 100, 1, 1] => "UID",
        _ => return None,
    })
}

fn rfc2253_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            c => out.push(c),
        }
    }
    out
}

/// Text of a universal string type, `None` for anything else.
fn directory_string(value: &yasna::models::TaggedDerValue) -> Option<String> {
    if value.tag().tag_class != yasna::TagClass::Universal {
        return None;
    }
    let bytes = value.value();
    match value.tag().tag_number {
        // UTF8String, PrintableString, IA5String, VisibleString
        12 | 19 | 22 | 26 => String::from_utf8(bytes.to_vec()).ok(),
        // TeletexString, read as Latin-1
        20 => Some(bytes.iter().map(|&b| b as char).collect()),
        // BMPString
        30 if bytes.len() % 2 == 0 => {
            let units = bytes
                .chunks(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect::<Vec<_>>();
            String::from_utf16(&units).ok()
        }
        // UniversalString
        28 if bytes.len() % 4 == 0 => bytes
            .chunks(4)
            .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
            .collect(),
        _ => None,
    }
}

fn rfc2253_attribute(oid: &yasna::models::ObjectIdentifier, value: &[u8]) -> String {
    let hex = || value.iter().map(|b| format!("{:02x}", b)).collect::<String>();
    match rfc2253_keyword(oid) {
        Some(keyword) => {
            match yasna::parse_ber(value, |r| r.read_tagged_der())
                .ok()
                .and_then(|v| directory_string(&v))
            {
                Some(text) => format!("{}={}", keyword, rfc2253_escape(&text)),
                None => format!("{}=#{}", keyword, hex()),
            }
        }
        None => format!("{}=#{}", oid, hex()),
    }
}

/// Renders a DER encoded `Name` as an RFC 2253 string: most significant RDN
/// last, members of a multi-valued RDN joined with `+`, attributes without a
/// keyword as `dotted.oid=#<hex DER>`.
fn rfc2253_name(der: &[u8]) -> Result<String> {
    let rdns = yasna::parse_ber(der, |r| {
        r.collect_sequence_of(|r| {
            r.collect_set_of(|r| {
                r.read_sequence(|r| {
                    let oid = r.next().read_oid()?;
                    let value = r.next().read_der()?;
                    Ok((oid, value))
                })
            })
        })
    })
    .map_err(|e| Error::CertificateEncoding(format!("malformed X.509 name: {}", e)))?;

    let mut parts = rdns
        .iter()
        .map(|rdn| {
            rdn.iter()
                .map(|(oid, value)| rfc2253_attribute(oid, value))
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>();
    parts.reverse();
    Ok(parts.join(","))
}

/// Renders an X.509 name as an RFC 2253 string (most significant RDN last).
pub fn x509_name_to_string(name: &openssl::x509::X509NameRef) -> Result<String> {
    let der = name
        .to_der()
        .map_err(|e| Error::CertificateEncoding(format!("name is not DER encodable: {}", e)))?;
    rfc2253_name(&der)
}

/// Renders reader events back into XML text.
pub fn events_to_string(events: &[xml::reader::XmlEvent]) -> Result<String> {
    let mut output = Vec::new();
    let mut output_writer = xml::writer::EventWriter::new_with_config(
        &mut output,
        xml::writer::EmitterConfig {
            perform_indent: false,
            perform_escaping: true,
            write_document_declaration: true,
            autopad_comments: false,
            cdata_to_characters: true,
            line_separator: std::borrow::Cow::Borrowed("\n"),
            normalize_empty_elements: false,
            ..std::default::Default::default()
        },
    );

    for event in events {
        if let Some(e) = event.as_writer_event() {
            output_writer
                .write(e)
                .map_err(|e| Error::Serialization(e.to_string()))?;
        }
    }

    Ok(String::from_utf8_lossy(&output).to_string())
}

fn element_slice<'a, F>(
    events: &'a [xml::reader::XmlEvent],
    mut matches: F,
) -> Option<&'a [xml::reader::XmlEvent]>
where
    F: FnMut(&xml::name::OwnedName, &[xml::attribute::OwnedAttribute]) -> bool,
{
    let mut start = None;
    let mut depth = 0usize;
    for (i, evt) in events.iter().enumerate() {
        match evt {
            xml::reader::XmlEvent::StartElement {
                name, attributes, ..
            } => {
                if start.is_some() {
                    depth += 1;
                } else if matches(name, attributes) {
                    start = Some(i);
                    depth = 1;
                }
            }
            xml::reader::XmlEvent::EndElement { .. } => {
                if let Some(s) = start {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&events[s..i + 1]);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the first element whose unqualified `Id` attribute equals `id`.
pub fn find_element_by_id<'a>(
    events: &'a [xml::reader::XmlEvent],
    id: &str,
) -> Option<&'a [xml::reader::XmlEvent]> {
    element_slice(events, |_, attributes| {
        attributes.iter().any(|a| {
            a.name.prefix.is_none()
                && a.name.namespace.is_none()
                && a.name.local_name.eq_ignore_ascii_case("id")
                && a.value == id
        })
    })
}

/// Finds the first element with the given expanded name.
pub fn find_element<'a>(
    events: &'a [xml::reader::XmlEvent],
    namespace: &str,
    local_name: &str,
) -> Option<&'a [xml::reader::XmlEvent]> {
    element_slice(events, |name, _| {
        name.namespace.as_deref() == Some(namespace) && name.local_name == local_name
    })
}

/// Concatenated character data directly inside the first element of `events`.
pub(crate) fn element_text(events: &[xml::reader::XmlEvent]) -> String {
    let mut depth = 0usize;
    let mut text = String::new();
    for evt in events {
        match evt {
            xml::reader::XmlEvent::StartElement { .. } => depth += 1,
            xml::reader::XmlEvent::EndElement { .. } => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            xml::reader::XmlEvent::Characters(t) | xml::reader::XmlEvent::CData(t)
                if depth == 1 =>
            {
                text.push_str(t)
            }
            _ => {}
        }
    }
    text
}

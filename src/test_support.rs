//! Keys, certificates and event helpers shared by the unit tests.

use crate::context::MarshalContext;
use crate::model::XadesElement;
use crate::writer::EventWriter;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use xml::name::OwnedName;
use xml::reader::XmlEvent;

pub(crate) fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// An RSA-2048 key with a self-signed certificate (serial 0x1234, subject
/// `C=NL, O=Example Org, CN=<common_name>`).
pub(crate) fn key_and_certificate(common_name: &str) -> (PKey<Private>, X509) {
    let key = PKey::from_rsa(openssl::rsa::Rsa::generate(2048).unwrap()).unwrap();

    let mut name = openssl::x509::X509NameBuilder::new().unwrap();
    name.append_entry_by_text("C", "NL").unwrap();
    name.append_entry_by_text("O", "Example Org").unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let serial = openssl::bn::BigNum::from_u32(0x1234)
        .unwrap()
        .to_asn1_integer()
        .unwrap();
    let not_before = openssl::asn1::Asn1Time::days_from_now(0).unwrap();
    let not_after = openssl::asn1::Asn1Time::days_from_now(365).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&not_before).unwrap();
    builder.set_not_after(&not_after).unwrap();
    builder
        .sign(&key, openssl::hash::MessageDigest::sha256())
        .unwrap();

    (key, builder.build())
}

pub(crate) fn marshal<E: XadesElement + ?Sized>(element: &E) -> Vec<XmlEvent> {
    marshal_with(element, &MarshalContext::new())
}

pub(crate) fn marshal_with<E: XadesElement + ?Sized>(
    element: &E,
    ctx: &MarshalContext,
) -> Vec<XmlEvent> {
    let mut w = EventWriter::new();
    element.marshal(&mut w, crate::DSIG_PREFIX, ctx).unwrap();
    w.into_events().unwrap()
}

fn qualified(name: &OwnedName) -> String {
    match &name.prefix {
        Some(p) => format!("{}:{}", p, name.local_name),
        None => name.local_name.clone(),
    }
}

/// One line per node: `<prefix:Local {namespace} attr=value...>`, text, or
/// `</prefix:Local>`. Attributes are sorted so the outline only depends on
/// names, namespaces, attribute sets, child order and text.
pub(crate) fn outline(events: &[XmlEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let mut line = format!("<{}", qualified(name));
                if let Some(ns) = &name.namespace {
                    line.push_str(&format!(" {{{}}}", ns));
                }
                let mut attrs = attributes
                    .iter()
                    .map(|a| format!("{}={}", qualified(&a.name), a.value))
                    .collect::<Vec<_>>();
                attrs.sort();
                for a in attrs {
                    line.push(' ');
                    line.push_str(&a);
                }
                line.push('>');
                Some(line)
            }
            XmlEvent::EndElement { name } => Some(format!("</{}>", qualified(name))),
            XmlEvent::Characters(t) | XmlEvent::CData(t) | XmlEvent::Whitespace(t) => {
                Some(t.clone())
            }
            _ => None,
        })
        .collect()
}

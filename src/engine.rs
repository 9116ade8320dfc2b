//! The XML signature engine the XAdES layer hands its object graph to.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::proto;
use crate::writer::{EventWriter, ForeignNode, XmlWriter};
use openssl::pkey::{HasPublic, PKey, PKeyRef, Private, Public};
use std::borrow::Cow;
use xml::reader::XmlEvent;

/// Everything needed to produce one `ds:Signature` element.
#[derive(Debug, Clone)]
pub struct SignatureTemplate {
    pub id: String,
    /// References carry empty digest values; the engine fills them in.
    pub signed_info: proto::ds::SignedInfo,
    pub key_info: Option<proto::ds::KeyInfo>,
    /// Content of the `ds:Object` elements, one per entry, in order.
    pub objects: Vec<ForeignNode>,
    pub ds_prefix: String,
}

/// The outcome of a successful sign operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedSignature {
    /// SignedInfo with every reference digest filled in.
    pub signed_info: proto::ds::SignedInfo,
    pub signature_value: Vec<u8>,
    /// The `ds:Signature` element as inserted into the document.
    pub element: Vec<XmlEvent>,
}

pub trait SignatureEngine {
    /// Computes the reference digests and the signature value of `template`
    /// and appends the resulting `ds:Signature` as the last child of the
    /// document element. `document` is left unchanged on failure.
    fn sign(
        &self,
        template: &SignatureTemplate,
        key: &PKeyRef<Private>,
        document: &mut Document,
    ) -> Result<SignedSignature>;

    /// Checks the first `ds:Signature` of `document`. A digest or signature
    /// mismatch is `Ok(false)`; a missing or malformed signature is an error.
    fn validate(&self, document: &Document) -> Result<bool>;
}

/// [`SignatureEngine`] on top of `openssl` and the [`crate::c14n`] module.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpensslEngine;

impl OpensslEngine {
    pub fn new() -> Self {
        OpensslEngine
    }
}

#[derive(Debug)]
enum AlgorithmData<'a> {
    NodeSet(Cow<'a, [XmlEvent]>),
    OctetStream(String),
}

fn openssl_error(e: openssl::error::ErrorStack) -> Error {
    Error::Signing(format!("openssl error: {}", e))
}

fn is_signature(name: &xml::name::OwnedName) -> bool {
    name.namespace.as_deref() == Some(crate::DSIG_NS) && name.local_name == "Signature"
}

fn id_of(attributes: &[xml::attribute::OwnedAttribute]) -> Option<&str> {
    attributes
        .iter()
        .find(|a| a.name.prefix.is_none() && a.name.local_name.eq_ignore_ascii_case("id"))
        .map(|a| a.value.as_str())
}

/// Drops the `ds:Signature` element with the given id, or the first one found
/// when the signature has no id.
fn transform_enveloped_signature(events: &[XmlEvent], signature_id: Option<&str>) -> Vec<XmlEvent> {
    let mut output = Vec::with_capacity(events.len());
    let mut skip_depth = 0usize;
    let mut removed = false;

    for evt in events {
        match evt {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                if !removed
                    && is_signature(name)
                    && (signature_id.is_none() || id_of(attributes) == signature_id)
                {
                    skip_depth = 1;
                    removed = true;
                    continue;
                }
                output.push(evt.clone());
            }
            XmlEvent::EndElement { .. } if skip_depth > 0 => skip_depth -= 1,
            _ if skip_depth > 0 => {}
            e => output.push(e.clone()),
        }
    }
    output
}

fn apply_transforms(
    reference: &proto::ds::Reference,
    mut data: AlgorithmData,
    signature_id: Option<&str>,
) -> Result<Vec<u8>> {
    if let Some(transforms) = &reference.transforms {
        for transform in &transforms.transforms {
            data = match (transform.algorithm.as_str(), data) {
                (crate::TRANSFORM_ENVELOPED_SIGNATURE, AlgorithmData::NodeSet(events)) => {
                    AlgorithmData::NodeSet(Cow::Owned(transform_enveloped_signature(
                        &events,
                        signature_id,
                    )))
                }
                (uri, AlgorithmData::NodeSet(events)) => {
                    let c14n = crate::c14n::Canonicalization::from_uri(uri).ok_or_else(|| {
                        Error::AlgorithmNotAvailable(format!("unsupported transformation: {}", uri))
                    })?;
                    AlgorithmData::OctetStream(c14n.apply(&events)?)
                }
                (uri, AlgorithmData::OctetStream(_)) => {
                    return Err(Error::UnsupportedFeature(format!(
                        "transformation {} needs a node set as input",
                        uri
                    )))
                }
            };
        }
    }

    Ok(match data {
        AlgorithmData::OctetStream(o) => o.into_bytes(),
        AlgorithmData::NodeSet(events) => {
            crate::c14n::canonicalize(&events, false, false)?.into_bytes()
        }
    })
}

fn referenced_events<'a>(events: &'a [XmlEvent], uri: &str) -> Result<&'a [XmlEvent]> {
    if uri.is_empty() {
        Ok(events)
    } else if let Some(id) = uri.strip_prefix('#') {
        crate::find_element_by_id(events, id)
            .ok_or_else(|| Error::InvalidInput(format!("unable to find signed element: {}", uri)))
    } else {
        Err(Error::UnsupportedFeature(format!(
            "unsupported reference URI: {}",
            uri
        )))
    }
}

fn reference_digest(
    events: &[XmlEvent],
    reference: &proto::ds::Reference,
    signature_id: Option<&str>,
) -> Result<Vec<u8>> {
    let uri = reference.uri.as_deref().unwrap_or_default();
    let data = apply_transforms(
        reference,
        AlgorithmData::NodeSet(Cow::Borrowed(referenced_events(events, uri)?)),
        signature_id,
    )?;
    let md = crate::dsig::digest_algorithm(&reference.digest_method.algorithm)?;
    let digest = openssl::hash::hash(md, &data).map_err(openssl_error)?;
    trace!("digest of reference {:?}: {}", uri, base64::encode(&digest));
    Ok(digest.to_vec())
}

fn serde_events<T: serde::Serialize>(value: &T) -> Result<ForeignNode> {
    let events = xml_serde::to_events(value).map_err(|e| Error::Serialization(e.to_string()))?;
    ForeignNode::from_events(events)
}

fn canonical_signed_info(signature: &[XmlEvent], c14n_method: &str) -> Result<String> {
    let signed_info = crate::find_element(signature, crate::DSIG_NS, "SignedInfo")
        .ok_or_else(|| Error::InvalidInput("signature has no SignedInfo".to_string()))?;
    let c14n = crate::c14n::Canonicalization::from_uri(c14n_method).ok_or_else(|| {
        Error::AlgorithmNotAvailable(format!(
            "unsupported canonicalisation method: {}",
            c14n_method
        ))
    })?;
    let canonical = c14n.apply(signed_info)?;
    trace!("canonical SignedInfo is {} bytes", canonical.len());
    Ok(canonical)
}

fn ec_field_size<T: HasPublic>(key: &PKeyRef<T>) -> Result<usize> {
    let ec = key.ec_key().map_err(openssl_error)?;
    Ok((ec.group().degree() as usize + 7) / 8)
}

/// XML signatures carry ECDSA values as `r || s`, openssl works with DER.
fn ecdsa_der_to_raw(der: &[u8], size: usize) -> Result<Vec<u8>> {
    let sig = openssl::ecdsa::EcdsaSig::from_der(der).map_err(openssl_error)?;
    let mut raw = sig.r().to_vec_padded(size as i32).map_err(openssl_error)?;
    raw.extend(sig.s().to_vec_padded(size as i32).map_err(openssl_error)?);
    Ok(raw)
}

fn ecdsa_raw_to_der(raw: &[u8]) -> Option<Vec<u8>> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return None;
    }
    let (r, s) = raw.split_at(raw.len() / 2);
    let r = openssl::bn::BigNum::from_slice(r).ok()?;
    let s = openssl::bn::BigNum::from_slice(s).ok()?;
    openssl::ecdsa::EcdsaSig::from_private_components(r, s)
        .and_then(|sig| sig.to_der())
        .ok()
}

fn verify_signature(
    signature_method: &str,
    pkey: &PKeyRef<Public>,
    signature: &[u8],
    data: &[u8],
) -> Result<bool> {
    let algorithm = crate::dsig::signature_algorithm(signature_method)?;
    if pkey.id() != algorithm.key_type {
        return Ok(false);
    }

    let signature = if algorithm.key_type == openssl::pkey::Id::EC {
        match ecdsa_raw_to_der(signature) {
            Some(der) => Cow::Owned(der),
            None => return Ok(false),
        }
    } else {
        Cow::Borrowed(signature)
    };

    let mut verifier = openssl::sign::Verifier::new(algorithm.digest, pkey).map_err(openssl_error)?;
    Ok(verifier.verify_oneshot(&signature, data).unwrap_or(false))
}

fn decode_key(key_info: &proto::ds::KeyInfo) -> Result<PKey<Public>> {
    for key in &key_info.keys_info {
        if let proto::ds::KeyInfoType::X509Data(x509_data) = key {
            for datum in &x509_data.x509_data {
                if let proto::ds::X509Datum::Certificate(c) = datum {
                    let der = base64::decode(c.replace(['\r', '\n', ' '], ""))
                        .map_err(|e| Error::CertificateEncoding(format!("error decoding X509 cert: {}", e)))?;
                    let cert = openssl::x509::X509::from_der(&der)
                        .map_err(|e| Error::CertificateEncoding(format!("error decoding X509 cert: {}", e)))?;
                    return cert
                        .public_key()
                        .map_err(|e| Error::CertificateEncoding(format!("error decoding X509 cert: {}", e)));
                }
            }
        }
    }
    Err(Error::UnsupportedFeature(
        "KeyInfo carries no X.509 certificate".to_string(),
    ))
}

fn parse_serde<T: serde::de::DeserializeOwned>(events: &[XmlEvent]) -> Result<T> {
    let events = events
        .iter()
        .map(|e| xml::reader::Result::Ok(e.to_owned()))
        .collect::<Vec<_>>();
    xml_serde::from_events(events.as_slice())
        .map_err(|e| Error::Xml(format!("unable to decode XML signature: {}", e)))
}

impl OpensslEngine {
    fn assemble(
        &self,
        template: &SignatureTemplate,
        signed_info: &proto::ds::SignedInfo,
        signature_value: &str,
    ) -> Result<Vec<XmlEvent>> {
        let p = template.ds_prefix.as_str();
        let mut w = EventWriter::new();

        w.write_start_element(p, "Signature", crate::DSIG_NS)?;
        w.write_id_attribute("", None, "Id", &template.id)?;
        w.marshal_foreign_node(&serde_events(&proto::ds::OuterSignedInfo {
            signed_info: signed_info.clone(),
        })?)?;

        w.write_start_element(p, "SignatureValue", crate::DSIG_NS)?;
        w.write_id_attribute("", None, "Id", &format!("SV-{}", template.id))?;
        w.write_characters(signature_value)?;
        w.write_end_element()?;

        if let Some(key_info) = &template.key_info {
            w.marshal_foreign_node(&serde_events(&proto::ds::OuterKeyInfo {
                key_info: key_info.clone(),
            })?)?;
        }

        for object in &template.objects {
            w.write_start_element(p, "Object", crate::DSIG_NS)?;
            w.marshal_foreign_node(object)?;
            w.write_end_element()?;
        }

        w.write_end_element()?;
        w.into_events()
    }
}

impl SignatureEngine for OpensslEngine {
    fn sign(
        &self,
        template: &SignatureTemplate,
        key: &PKeyRef<Private>,
        document: &mut Document,
    ) -> Result<SignedSignature> {
        let algorithm =
            crate::dsig::signature_algorithm(&template.signed_info.signature_method.algorithm)?;
        if key.id() != algorithm.key_type {
            return Err(Error::Signing(format!(
                "{} needs a {:?} key",
                template.signed_info.signature_method.algorithm, algorithm.key_type
            )));
        }

        let mut signed_info = template.signed_info.clone();
        let scratch = document.with_last_child(&self.assemble(template, &signed_info, "")?)?;
        for reference in signed_info.reference.iter_mut() {
            reference.digest_value = base64::encode(reference_digest(
                scratch.events(),
                reference,
                Some(template.id.as_str()),
            )?);
        }

        let scratch = document.with_last_child(&self.assemble(template, &signed_info, "")?)?;
        let signature = crate::find_element_by_id(scratch.events(), &template.id)
            .ok_or_else(|| Error::Signing("signature element went missing".to_string()))?;
        let canonical =
            canonical_signed_info(signature, &signed_info.canonicalization_method.algorithm)?;

        let mut signer = openssl::sign::Signer::new(algorithm.digest, key).map_err(openssl_error)?;
        signer.update(canonical.as_bytes()).map_err(openssl_error)?;
        let mut signature_value = signer.sign_to_vec().map_err(openssl_error)?;
        if algorithm.key_type == openssl::pkey::Id::EC {
            signature_value = ecdsa_der_to_raw(&signature_value, ec_field_size(key)?)?;
        }

        let signed = document.with_last_child(&self.assemble(
            template,
            &signed_info,
            &base64::encode(&signature_value),
        )?)?;
        let element = crate::find_element_by_id(signed.events(), &template.id)
            .ok_or_else(|| Error::Signing("signature element went missing".to_string()))?
            .to_vec();
        debug!(
            "signed {} with {} references",
            template.id,
            signed_info.reference.len()
        );

        *document = signed;
        Ok(SignedSignature {
            signed_info,
            signature_value,
            element,
        })
    }

    fn validate(&self, document: &Document) -> Result<bool> {
        let events = document.events();
        let signature = crate::find_element(events, crate::DSIG_NS, "Signature")
            .ok_or_else(|| Error::InvalidInput("document carries no signature".to_string()))?;
        let signature_id = match signature.first() {
            Some(XmlEvent::StartElement { attributes, .. }) => id_of(attributes),
            _ => None,
        };

        let signed_info_events = crate::find_element(signature, crate::DSIG_NS, "SignedInfo")
            .ok_or_else(|| Error::InvalidInput("signature has no SignedInfo".to_string()))?;
        let signed_info = parse_serde::<proto::ds::OuterSignedInfo>(signed_info_events)?.signed_info;

        let key_info_events = crate::find_element(signature, crate::DSIG_NS, "KeyInfo")
            .ok_or_else(|| Error::InvalidInput("signature has no KeyInfo".to_string()))?;
        let key_info = parse_serde::<proto::ds::OuterKeyInfo>(key_info_events)?.key_info;

        for reference in &signed_info.reference {
            let provided = base64::decode(reference.digest_value.trim())
                .map_err(|e| Error::Xml(format!("invalid digest base64: {}", e)))?;
            if reference_digest(events, reference, signature_id)? != provided {
                debug!("digest mismatch for reference {:?}", reference.uri);
                return Ok(false);
            }
        }

        let value = crate::find_element(signature, crate::DSIG_NS, "SignatureValue")
            .map(crate::element_text)
            .ok_or_else(|| Error::InvalidInput("signature has no SignatureValue".to_string()))?;
        let value = base64::decode(value.replace(['\r', '\n', ' '], ""))
            .map_err(|e| Error::Xml(format!("error decoding signature: {}", e)))?;

        let canonical =
            canonical_signed_info(signature, &signed_info.canonicalization_method.algorithm)?;
        let pkey = decode_key(&key_info)?;
        verify_signature(
            &signed_info.signature_method.algorithm,
            &pkey,
            &value,
            canonical.as_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{init_logging, key_and_certificate};

    fn template(cert: &openssl::x509::X509, signature_method: &str) -> SignatureTemplate {
        let reference = crate::dsig::new_reference(
            "",
            crate::DIGEST_SHA256,
            &[crate::TRANSFORM_ENVELOPED_SIGNATURE, crate::CANONICAL_EXCLUSIVE_1_0],
            None,
            Some("DR-1"),
        )
        .unwrap();
        let object_ref = crate::dsig::new_reference(
            "#obj",
            crate::DIGEST_SHA1,
            &[crate::CANONICAL_1_0],
            Some("urn:type"),
            None,
        )
        .unwrap();

        SignatureTemplate {
            id: "sig-1".to_string(),
            signed_info: crate::dsig::new_signed_info(
                crate::CANONICAL_EXCLUSIVE_1_0,
                signature_method,
                vec![reference, object_ref],
            )
            .unwrap(),
            key_info: Some(crate::dsig::new_x509_key_info(&[cert.clone()]).unwrap()),
            objects: vec![ForeignNode::parse(r#"<o:data xmlns:o="urn:o" Id="obj">payload</o:data>"#).unwrap()],
            ds_prefix: "ds".to_string(),
        }
    }

    #[test]
    fn signs_and_validates() {
        init_logging();
        let (key, cert) = key_and_certificate("Engine");
        let mut doc = Document::parse(r#"<doc xmlns="urn:doc"><a>1</a></doc>"#).unwrap();

        let engine = OpensslEngine::new();
        let signed = engine
            .sign(&template(&cert, crate::SIGNATURE_RSA_SHA256), &key, &mut doc)
            .unwrap();

        assert!(signed
            .signed_info
            .reference
            .iter()
            .all(|r| !r.digest_value.is_empty()));
        assert!(!signed.signature_value.is_empty());
        assert_eq!(
            crate::find_element_by_id(doc.events(), "sig-1").unwrap(),
            signed.element.as_slice()
        );
        assert!(crate::find_element_by_id(doc.events(), "SV-sig-1").is_some());
        assert!(engine.validate(&doc).unwrap());
    }

    #[test]
    fn validates_with_descriptive_key_info() {
        let (key, cert) = key_and_certificate("Engine");
        let mut signature = template(&cert, crate::SIGNATURE_RSA_SHA256);
        signature.key_info = Some(proto::ds::KeyInfo {
            keys_info: vec![
                proto::ds::KeyInfoType::KeyName("engine key".to_string()),
                proto::ds::KeyInfoType::X509Data(proto::ds::X509Data {
                    x509_data: vec![
                        proto::ds::X509Datum::SubjectName(
                            crate::x509_name_to_string(cert.subject_name()).unwrap(),
                        ),
                        proto::ds::X509Datum::IssuerSerial(proto::ds::X509IssuerSerial {
                            issuer_name: crate::x509_name_to_string(cert.issuer_name()).unwrap(),
                            serial_number: "4660".to_string(),
                        }),
                        proto::ds::X509Datum::Certificate(base64::encode(cert.to_der().unwrap())),
                    ],
                }),
            ],
        });

        let mut doc = Document::parse("<doc><a>1</a></doc>").unwrap();
        OpensslEngine.sign(&signature, &key, &mut doc).unwrap();
        let xml = doc.to_xml().unwrap();
        assert!(xml.contains(">engine key</ds:KeyName>"));
        assert!(xml.contains(">4660</ds:X509SerialNumber>"));
        assert!(OpensslEngine.validate(&doc).unwrap());
    }

    #[test]
    fn detects_tampering() {
        let (key, cert) = key_and_certificate("Engine");
        let mut doc = Document::parse("<doc><a>1</a></doc>").unwrap();
        OpensslEngine
            .sign(&template(&cert, crate::SIGNATURE_RSA_SHA256), &key, &mut doc)
            .unwrap();

        let tampered = Document::parse(&doc.to_xml().unwrap().replace("<a>1</a>", "<a>2</a>")).unwrap();
        assert!(!OpensslEngine.validate(&tampered).unwrap());

        let tampered =
            Document::parse(&doc.to_xml().unwrap().replace(">payload<", ">changed<")).unwrap();
        assert!(!OpensslEngine.validate(&tampered).unwrap());
    }

    #[test]
    fn signs_with_ecdsa() {
        let key = PKey::from_ec_key(
            openssl::ec::EcKey::generate(
                &openssl::ec::EcGroup::from_curve_name(openssl::nid::Nid::X9_62_PRIME256V1).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        let (_, rsa_cert) = key_and_certificate("Unused");
        let mut builder = openssl::x509::X509::builder().unwrap();
        builder.set_subject_name(rsa_cert.subject_name()).unwrap();
        builder.set_issuer_name(rsa_cert.subject_name()).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&openssl::asn1::Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&openssl::asn1::Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder.sign(&key, openssl::hash::MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        let mut doc = Document::parse("<doc/>").unwrap();
        let signed = OpensslEngine
            .sign(&template(&cert, crate::SIGNATURE_ECDSA_SHA256), &key, &mut doc)
            .unwrap();
        assert_eq!(signed.signature_value.len(), 64);
        assert!(OpensslEngine.validate(&doc).unwrap());
    }

    #[test]
    fn failure_leaves_document_untouched() {
        let (key, cert) = key_and_certificate("Engine");
        let mut doc = Document::parse("<doc/>").unwrap();
        let before = doc.clone();

        let err = OpensslEngine
            .sign(&template(&cert, crate::SIGNATURE_ECDSA_SHA256), &key, &mut doc)
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
        assert_eq!(doc, before);

        let mut missing = template(&cert, crate::SIGNATURE_RSA_SHA256);
        missing.objects.clear();
        assert!(OpensslEngine.sign(&missing, &key, &mut doc).is_err());
        assert_eq!(doc, before);
        assert!(matches!(OpensslEngine.validate(&doc), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn enveloped_transform_drops_only_the_named_signature() {
        let doc = Document::parse(concat!(
            r#"<doc xmlns:ds="http://www.w3.org/2000/09/xmldsig#">"#,
            r#"<ds:Signature Id="other"/><ds:Signature Id="mine"><x/></ds:Signature><b/></doc>"#
        ))
        .unwrap();

        let kept = transform_enveloped_signature(doc.events(), Some("mine"));
        assert!(crate::find_element_by_id(&kept, "other").is_some());
        assert!(crate::find_element_by_id(&kept, "mine").is_none());
        assert_eq!(kept.len(), doc.events().len() - 4);
    }
}

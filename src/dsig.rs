//! Algorithm registry and constructors for the `ds:` object graph.
//!
//! Every constructor checks its algorithm identifiers against what the
//! [`crate::OpensslEngine`] can compute, so an unknown URI fails when the
//! object is built rather than when signing.

use crate::error::{Error, Result};
use crate::proto;
use openssl::hash::MessageDigest;
use openssl::pkey::Id;

pub fn digest_algorithm(uri: &str) -> Result<MessageDigest> {
    match uri {
        crate::DIGEST_SHA1 => Ok(MessageDigest::sha1()),
        crate::DIGEST_SHA224 => Ok(MessageDigest::sha224()),
        crate::DIGEST_SHA256 => Ok(MessageDigest::sha256()),
        crate::DIGEST_SHA384 => Ok(MessageDigest::sha384()),
        crate::DIGEST_SHA512 => Ok(MessageDigest::sha512()),
        u => Err(Error::AlgorithmNotAvailable(format!("unsupported digest: {}", u))),
    }
}

#[derive(Clone, Copy)]
pub struct SignatureAlgorithm {
    pub digest: MessageDigest,
    pub key_type: Id,
}

pub fn signature_algorithm(uri: &str) -> Result<SignatureAlgorithm> {
    let (digest, key_type) = match uri {
        crate::SIGNATURE_RSA_SHA1 => (MessageDigest::sha1(), Id::RSA),
        crate::SIGNATURE_RSA_SHA224 => (MessageDigest::sha224(), Id::RSA),
        crate::SIGNATURE_RSA_SHA256 => (MessageDigest::sha256(), Id::RSA),
        crate::SIGNATURE_RSA_SHA384 => (MessageDigest::sha384(), Id::RSA),
        crate::SIGNATURE_RSA_SHA512 => (MessageDigest::sha512(), Id::RSA),
        crate::SIGNATURE_ECDSA_SHA1 => (MessageDigest::sha1(), Id::EC),
        crate::SIGNATURE_ECDSA_SHA224 => (MessageDigest::sha224(), Id::EC),
        crate::SIGNATURE_ECDSA_SHA256 => (MessageDigest::sha256(), Id::EC),
        crate::SIGNATURE_ECDSA_SHA384 => (MessageDigest::sha384(), Id::EC),
        crate::SIGNATURE_ECDSA_SHA512 => (MessageDigest::sha512(), Id::EC),
        crate::SIGNATURE_DSA_SHA1 => (MessageDigest::sha1(), Id::DSA),
        crate::SIGNATURE_DSA_SHA256 => (MessageDigest::sha256(), Id::DSA),
        u => {
            return Err(Error::AlgorithmNotAvailable(format!(
                "unsupported signature method: {}",
                u
            )))
        }
    };
    Ok(SignatureAlgorithm { digest, key_type })
}

pub fn new_canonicalization_method(uri: &str) -> Result<proto::ds::CanonicalizationMethod> {
    if crate::c14n::Canonicalization::from_uri(uri).is_none() {
        return Err(Error::AlgorithmNotAvailable(format!(
            "unsupported canonicalisation method: {}",
            uri
        )));
    }
    Ok(proto::ds::CanonicalizationMethod {
        algorithm: uri.to_string(),
    })
}

pub fn new_digest_method(uri: &str) -> Result<proto::ds::DigestMethod> {
    digest_algorithm(uri)?;
    Ok(proto::ds::DigestMethod {
        algorithm: uri.to_string(),
    })
}

pub fn new_signature_method(uri: &str) -> Result<proto::ds::SignatureMethod> {
    signature_algorithm(uri)?;
    Ok(proto::ds::SignatureMethod {
        algorithm: uri.to_string(),
    })
}

pub fn new_transform(uri: &str) -> Result<proto::ds::Transform> {
    if uri != crate::TRANSFORM_ENVELOPED_SIGNATURE
        && crate::c14n::Canonicalization::from_uri(uri).is_none()
    {
        return Err(Error::AlgorithmNotAvailable(format!(
            "unsupported transformation: {}",
            uri
        )));
    }
    Ok(proto::ds::Transform {
        algorithm: uri.to_string(),
    })
}

/// A reference with an empty digest value; the engine fills it in when signing.
pub fn new_reference(
    uri: &str,
    digest_method: &str,
    transforms: &[&str],
    ref_type: Option<&str>,
    id: Option<&str>,
) -> Result<proto::ds::Reference> {
    let transforms = transforms
        .iter()
        .map(|t| new_transform(t))
        .collect::<Result<Vec<_>>>()?;

    Ok(proto::ds::Reference {
        transforms: if transforms.is_empty() {
            None
        } else {
            Some(proto::ds::Transforms { transforms })
        },
        digest_method: new_digest_method(digest_method)?,
        digest_value: String::new(),
        id: id.map(str::to_string),
        uri: Some(uri.to_string()),
        ref_type: ref_type.map(str::to_string),
    })
}

pub fn new_signed_info(
    c14n_method: &str,
    signature_method: &str,
    references: Vec<proto::ds::Reference>,
) -> Result<proto::ds::SignedInfo> {
    if references.is_empty() {
        return Err(Error::InvalidInput(
            "SignedInfo needs at least one reference".to_string(),
        ));
    }
    Ok(proto::ds::SignedInfo {
        canonicalization_method: new_canonicalization_method(c14n_method)?,
        signature_method: new_signature_method(signature_method)?,
        reference: references,
        id: None,
    })
}

/// `ds:KeyInfo` holding one `ds:X509Data` with every certificate, in order.
pub fn new_x509_key_info(certs: &[openssl::x509::X509]) -> Result<proto::ds::KeyInfo> {
    if certs.is_empty() {
        return Err(Error::InvalidInput(
            "KeyInfo needs at least one certificate".to_string(),
        ));
    }
    let x509_data = certs
        .iter()
        .map(|c| {
            c.to_der()
                .map(|der| proto::ds::X509Datum::Certificate(base64::encode(der)))
                .map_err(|e| Error::CertificateEncoding(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(proto::ds::KeyInfo {
        keys_info: vec![proto::ds::KeyInfoType::X509Data(proto::ds::X509Data {
            x509_data,
        })],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_algorithms_are_unavailable() {
        assert!(matches!(
            digest_algorithm("urn:md2"),
            Err(Error::AlgorithmNotAvailable(_))
        ));
        assert!(matches!(
            new_signed_info(crate::CANONICAL_EXCLUSIVE_1_0, "urn:sig", vec![]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            new_reference("", crate::DIGEST_SHA256, &["urn:xslt"], None, None),
            Err(Error::AlgorithmNotAvailable(_))
        ));
        assert!(matches!(
            new_canonicalization_method("urn:c14n"),
            Err(Error::AlgorithmNotAvailable(_))
        ));
    }

    #[test]
    fn builds_references() {
        let reference = new_reference(
            "",
            crate::DIGEST_SHA256,
            &[crate::TRANSFORM_ENVELOPED_SIGNATURE, crate::CANONICAL_EXCLUSIVE_1_0],
            None,
            Some("DR-1"),
        )
        .unwrap();
        assert_eq!(reference.uri.as_deref(), Some(""));
        assert_eq!(reference.id.as_deref(), Some("DR-1"));
        assert_eq!(reference.transforms.unwrap().transforms.len(), 2);

        let si = new_signed_info(
            crate::CANONICAL_EXCLUSIVE_1_0,
            crate::SIGNATURE_ECDSA_SHA256,
            vec![new_reference("#x", crate::DIGEST_SHA1, &[], None, None).unwrap()],
        )
        .unwrap();
        assert!(si.reference[0].transforms.is_none());
        assert_eq!(signature_algorithm(crate::SIGNATURE_ECDSA_SHA256).unwrap().key_type, Id::EC);
    }

    #[test]
    fn key_info_lists_certificates_in_order() {
        let (_, first) = crate::test_support::key_and_certificate("First");
        let (_, second) = crate::test_support::key_and_certificate("Second");
        let ki = new_x509_key_info(&[first.clone(), second]).unwrap();

        match &ki.keys_info[0] {
            proto::ds::KeyInfoType::X509Data(data) => {
                assert_eq!(data.x509_data.len(), 2);
                assert_eq!(
                    data.x509_data[0],
                    proto::ds::X509Datum::Certificate(base64::encode(first.to_der().unwrap()))
                );
            }
            other => panic!("unexpected key info {:?}", other),
        }
        assert!(new_x509_key_info(&[]).is_err());
    }
}

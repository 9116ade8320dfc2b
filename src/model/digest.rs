use super::{names, ElementName, QName, XadesElement};
use crate::context::MarshalContext;
use crate::error::{Error, Result};
use crate::writer::XmlWriter;
use std::marker::PhantomData;

/// `xades:DigestAlgAndValueType`: a `ds:DigestMethod` and the base64 `ds:DigestValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestAlgAndValue<N> {
    algorithm: String,
    digest: Vec<u8>,
    name: PhantomData<N>,
}

impl<N: ElementName> DigestAlgAndValue<N> {
    pub(crate) fn new(algorithm: &str, digest: Vec<u8>) -> Result<Self> {
        crate::dsig::digest_algorithm(algorithm)?;
        Ok(DigestAlgAndValue {
            algorithm: algorithm.to_string(),
            digest,
            name: PhantomData,
        })
    }

    /// Digests `data` with `algorithm`.
    pub(crate) fn compute(algorithm: &str, data: &[u8]) -> Result<Self> {
        let md = crate::dsig::digest_algorithm(algorithm)?;
        let digest = openssl::hash::hash(md, data)
            .map_err(|e| Error::AlgorithmNotAvailable(format!("openssl error: {}", e)))?;
        Self::new(algorithm, digest.to_vec())
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}

pub(crate) fn write_digest_alg_and_value(
    w: &mut dyn XmlWriter,
    ds_prefix: &str,
    algorithm: &str,
    digest: &[u8],
) -> Result<()> {
    w.write_start_element(ds_prefix, "DigestMethod", crate::DSIG_NS)?;
    w.write_attribute("", None, "Algorithm", algorithm)?;
    w.write_end_element()?;
    w.write_text_element(ds_prefix, "DigestValue", crate::DSIG_NS, &base64::encode(digest))
}

impl<N: ElementName> XadesElement for DigestAlgAndValue<N> {
    fn name(&self) -> QName {
        N::NAME
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        _ctx: &MarshalContext,
    ) -> Result<()> {
        write_digest_alg_and_value(w, ds_prefix, &self.algorithm, &self.digest)
    }
}

pub type CertDigest = DigestAlgAndValue<names::CertDigest>;
pub type SigPolicyHash = DigestAlgAndValue<names::SigPolicyHash>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{marshal, outline};

    #[test]
    fn marshals_method_and_value() {
        let hash = SigPolicyHash::new(crate::DIGEST_SHA256, vec![1, 2, 3]).unwrap();
        assert_eq!(
            outline(&marshal(&hash)),
            vec![
                format!("<xades:SigPolicyHash {{{}}}>", crate::XADES_NS),
                format!("<ds:DigestMethod {{{}}} Algorithm={}>", crate::DSIG_NS, crate::DIGEST_SHA256),
                "</ds:DigestMethod>".to_string(),
                format!("<ds:DigestValue {{{}}}>", crate::DSIG_NS),
                "AQID".to_string(),
                "</ds:DigestValue>".to_string(),
                "</xades:SigPolicyHash>".to_string(),
            ]
        );
    }

    #[test]
    fn equality_covers_algorithm_and_digest() {
        let a = CertDigest::new(crate::DIGEST_SHA256, vec![1, 2, 3]).unwrap();
        assert_eq!(a, CertDigest::new(crate::DIGEST_SHA256, vec![1, 2, 3]).unwrap());
        assert_ne!(a, CertDigest::new(crate::DIGEST_SHA256, vec![1, 2, 4]).unwrap());
        assert_ne!(a, CertDigest::new(crate::DIGEST_SHA512, vec![1, 2, 3]).unwrap());
    }

    #[test]
    fn computes_digest() {
        let d = CertDigest::compute(crate::DIGEST_SHA256, b"abc").unwrap();
        assert_eq!(
            base64::encode(d.digest()),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
        assert!(matches!(
            CertDigest::compute("urn:unknown", b"abc"),
            Err(Error::AlgorithmNotAvailable(_))
        ));
    }
}

use super::{names, ElementName, EncapsulatedTimeStamp, QName, XadesElement, XmlTimeStamp};
use crate::context::MarshalContext;
use crate::error::{Error, Result};
use crate::writer::XmlWriter;
use std::marker::PhantomData;

/// `xades:Include`, pointing a timestamp at a `ds:Reference` or other node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    uri: String,
    referenced_data: Option<bool>,
}

impl Include {
    pub(crate) fn new(uri: &str, referenced_data: Option<bool>) -> Result<Self> {
        if uri.is_empty() {
            return Err(Error::InvalidInput("an Include needs a URI".to_string()));
        }
        Ok(Include {
            uri: uri.to_string(),
            referenced_data,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn referenced_data(&self) -> Option<bool> {
        self.referenced_data
    }
}

impl XadesElement for Include {
    fn name(&self) -> QName {
        QName::xades("Include")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        _ds_prefix: &str,
        _ctx: &MarshalContext,
    ) -> Result<()> {
        w.write_attribute("", None, "URI", &self.uri)?;
        if let Some(referenced) = self.referenced_data {
            w.write_attribute("", None, "referencedData", if referenced { "true" } else { "false" })?;
        }
        Ok(())
    }
}

/// `xades:ReferenceInfo`: the digest of something the timestamp covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInfo {
    id: Option<String>,
    uri: Option<String>,
    algorithm: String,
    digest: Vec<u8>,
}

impl ReferenceInfo {
    pub(crate) fn new(
        id: Option<&str>,
        uri: Option<&str>,
        algorithm: &str,
        digest: Vec<u8>,
    ) -> Result<Self> {
        crate::dsig::digest_algorithm(algorithm)?;
        Ok(ReferenceInfo {
            id: super::non_empty(id),
            uri: super::non_empty(uri),
            algorithm: algorithm.to_string(),
            digest,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}

impl XadesElement for ReferenceInfo {
    fn name(&self) -> QName {
        QName::xades("ReferenceInfo")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        _ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        if let Some(uri) = &self.uri {
            w.write_attribute("", None, "URI", uri)?;
        }
        super::write_digest_alg_and_value(w, ds_prefix, &self.algorithm, &self.digest)
    }
}

/// One timestamp token: an encapsulated RFC 3161 token or an XML one.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeStampToken {
    Encapsulated(EncapsulatedTimeStamp),
    Xml(XmlTimeStamp),
}

impl TimeStampToken {
    fn marshal(&self, w: &mut dyn XmlWriter, ds_prefix: &str, ctx: &MarshalContext) -> Result<()> {
        match self {
            TimeStampToken::Encapsulated(t) => t.marshal(w, ds_prefix, ctx),
            TimeStampToken::Xml(t) => t.marshal(w, ds_prefix, ctx),
        }
    }
}

/// `xades:GenericTimeStampType`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericTimeStamp<N> {
    id: Option<String>,
    includes: Vec<Include>,
    reference_infos: Vec<ReferenceInfo>,
    c14n_method: Option<String>,
    tokens: Vec<TimeStampToken>,
    name: PhantomData<N>,
}

impl<N: ElementName> GenericTimeStamp<N> {
    pub(crate) fn new(
        id: Option<&str>,
        includes: Vec<Include>,
        reference_infos: Vec<ReferenceInfo>,
        c14n_method: Option<&str>,
        tokens: Vec<TimeStampToken>,
    ) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::InvalidInput(
                "a timestamp needs at least one token".to_string(),
            ));
        }
        if !includes.is_empty() && !reference_infos.is_empty() {
            return Err(Error::InvalidInput(
                "a timestamp holds either Include or ReferenceInfo elements, not both".to_string(),
            ));
        }
        let c14n_method = super::non_empty(c14n_method);
        if let Some(uri) = &c14n_method {
            crate::dsig::new_canonicalization_method(uri)?;
        }
        Ok(GenericTimeStamp {
            id: super::non_empty(id),
            includes,
            reference_infos,
            c14n_method,
            tokens,
            name: PhantomData,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub fn reference_infos(&self) -> &[ReferenceInfo] {
        &self.reference_infos
    }

    pub fn canonicalization_method(&self) -> Option<&str> {
        self.c14n_method.as_deref()
    }

    pub fn tokens(&self) -> &[TimeStampToken] {
        &self.tokens
    }
}

impl<N: ElementName> XadesElement for GenericTimeStamp<N> {
    fn name(&self) -> QName {
        N::NAME
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        for include in &self.includes {
            include.marshal(w, ds_prefix, ctx)?;
        }
        for info in &self.reference_infos {
            info.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(algorithm) = &self.c14n_method {
            w.write_start_element(ds_prefix, "CanonicalizationMethod", crate::DSIG_NS)?;
            w.write_attribute("", None, "Algorithm", algorithm)?;
            w.write_end_element()?;
        }
        for token in &self.tokens {
            token.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

pub type XadesTimeStamp = GenericTimeStamp<names::XadesTimeStamp>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Encoding;
    use crate::test_support::{marshal, outline};
    use crate::writer::ForeignNode;

    fn token() -> TimeStampToken {
        TimeStampToken::Encapsulated(EncapsulatedTimeStamp::new(None, vec![7], Some(Encoding::Der)))
    }

    #[test]
    fn timestamp_with_includes() {
        let ts = XadesTimeStamp::new(
            Some("ts"),
            vec![Include::new("#DR-1", Some(true)).unwrap()],
            vec![],
            Some(crate::CANONICAL_EXCLUSIVE_1_0),
            vec![token()],
        )
        .unwrap();

        let (x, ds) = (crate::XADES_NS, crate::DSIG_NS);
        assert_eq!(
            outline(&marshal(&ts)),
            vec![
                format!("<xades:XAdESTimeStamp {{{}}} Id=ts>", x),
                format!("<xades:Include {{{}}} URI=#DR-1 referencedData=true>", x),
                "</xades:Include>".to_string(),
                format!(
                    "<ds:CanonicalizationMethod {{{}}} Algorithm={}>",
                    ds,
                    crate::CANONICAL_EXCLUSIVE_1_0
                ),
                "</ds:CanonicalizationMethod>".to_string(),
                format!(
                    "<xades:EncapsulatedTimeStamp {{{}}} Encoding={}>",
                    x,
                    Encoding::Der.uri()
                ),
                "Bw==".to_string(),
                "</xades:EncapsulatedTimeStamp>".to_string(),
                "</xades:XAdESTimeStamp>".to_string(),
            ]
        );
    }

    #[test]
    fn timestamp_with_reference_infos_and_xml_token() {
        let info = ReferenceInfo::new(Some("ri"), Some("#obj"), crate::DIGEST_SHA1, vec![1]).unwrap();
        let ts = XadesTimeStamp::new(
            None,
            vec![],
            vec![info],
            None,
            vec![TimeStampToken::Xml(XmlTimeStamp::new(vec![ForeignNode::text("tst")]))],
        )
        .unwrap();

        let (x, ds) = (crate::XADES_NS, crate::DSIG_NS);
        assert_eq!(
            outline(&marshal(&ts)),
            vec![
                format!("<xades:XAdESTimeStamp {{{}}}>", x),
                format!("<xades:ReferenceInfo {{{}}} Id=ri URI=#obj>", x),
                format!("<ds:DigestMethod {{{}}} Algorithm={}>", ds, crate::DIGEST_SHA1),
                "</ds:DigestMethod>".to_string(),
                format!("<ds:DigestValue {{{}}}>", ds),
                "AQ==".to_string(),
                "</ds:DigestValue>".to_string(),
                "</xades:ReferenceInfo>".to_string(),
                format!("<xades:XMLTimeStamp {{{}}}>", x),
                "tst".to_string(),
                "</xades:XMLTimeStamp>".to_string(),
                "</xades:XAdESTimeStamp>".to_string(),
            ]
        );
    }

    #[test]
    fn reference_info_equality() {
        let info = |id: Option<&str>, uri: Option<&str>, alg: &str, digest: Vec<u8>| {
            ReferenceInfo::new(id, uri, alg, digest).unwrap()
        };
        let base = info(Some("ri"), Some("#obj"), crate::DIGEST_SHA256, vec![1, 2]);

        assert_eq!(base, base.clone());
        assert_eq!(base, info(Some("ri"), Some("#obj"), crate::DIGEST_SHA256, vec![1, 2]));
        assert_ne!(base, info(Some("other"), Some("#obj"), crate::DIGEST_SHA256, vec![1, 2]));
        assert_ne!(base, info(None, Some("#obj"), crate::DIGEST_SHA256, vec![1, 2]));
        assert_ne!(base, info(Some("ri"), Some("#x"), crate::DIGEST_SHA256, vec![1, 2]));
        assert_ne!(base, info(Some("ri"), Some("#obj"), crate::DIGEST_SHA1, vec![1, 2]));
        assert_ne!(base, info(Some("ri"), Some("#obj"), crate::DIGEST_SHA256, vec![2, 1]));
    }

    #[test]
    fn timestamp_equality_follows_fields_and_token_order() {
        let xml_token = || TimeStampToken::Xml(XmlTimeStamp::new(vec![ForeignNode::text("tst")]));
        let ts = |id: Option<&str>, include: Option<bool>, tokens: Vec<TimeStampToken>| {
            XadesTimeStamp::new(
                id,
                vec![Include::new("#DR-1", include).unwrap()],
                vec![],
                Some(crate::CANONICAL_EXCLUSIVE_1_0),
                tokens,
            )
            .unwrap()
        };
        let base = ts(Some("ts"), Some(true), vec![token(), xml_token()]);

        assert_eq!(base, ts(Some("ts"), Some(true), vec![token(), xml_token()]));
        assert_ne!(base, ts(Some("ts"), Some(true), vec![xml_token(), token()]));
        assert_ne!(base, ts(None, Some(true), vec![token(), xml_token()]));
        assert_ne!(base, ts(Some("ts"), Some(false), vec![token(), xml_token()]));
        assert_ne!(base, ts(Some("ts"), Some(true), vec![token()]));
        assert_ne!(
            base,
            XadesTimeStamp::new(
                Some("ts"),
                vec![Include::new("#DR-1", Some(true)).unwrap()],
                vec![],
                None,
                vec![token(), xml_token()],
            )
            .unwrap()
        );
    }

    #[test]
    fn rejects_invalid_timestamps() {
        assert!(matches!(
            XadesTimeStamp::new(None, vec![], vec![], None, vec![]),
            Err(Error::InvalidInput(_))
        ));
        let include = Include::new("#a", None).unwrap();
        let info = ReferenceInfo::new(None, None, crate::DIGEST_SHA256, vec![]).unwrap();
        assert!(XadesTimeStamp::new(None, vec![include], vec![info], None, vec![token()]).is_err());
        assert!(matches!(
            XadesTimeStamp::new(None, vec![], vec![], Some("urn:c14n"), vec![token()]),
            Err(Error::AlgorithmNotAvailable(_))
        ));
        assert!(Include::new("", None).is_err());
    }
}

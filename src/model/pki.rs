use super::{names, ElementName, QName, XadesElement};
use crate::context::MarshalContext;
use crate::error::Result;
use crate::writer::XmlWriter;
use std::marker::PhantomData;

/// Encoding of the data held by an [`EncapsulatedPkiData`] element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    Der,
    Ber,
    Cer,
    Per,
    Xer,
}

impl Encoding {
    pub fn uri(self) -> &'static str {
        match self {
            Encoding::Der => "http://uri.etsi.org/01903/v1.2.2#DER",
            Encoding::Ber => "http://uri.etsi.org/01903/v1.2.2#BER",
            Encoding::Cer => "http://uri.etsi.org/01903/v1.2.2#CER",
            Encoding::Per => "http://uri.etsi.org/01903/v1.2.2#PER",
            Encoding::Xer => "http://uri.etsi.org/01903/v1.2.2#XER",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        [
            Encoding::Der,
            Encoding::Ber,
            Encoding::Cer,
            Encoding::Per,
            Encoding::Xer,
        ]
        .into_iter()
        .find(|e| e.uri() == uri)
    }
}

/// `xades:EncapsulatedPKIDataType`: base64 data with optional `Id` and `Encoding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulatedPkiData<N> {
    id: Option<String>,
    data: Vec<u8>,
    encoding: Option<Encoding>,
    name: PhantomData<N>,
}

impl<N: ElementName> EncapsulatedPkiData<N> {
    pub(crate) fn new(id: Option<&str>, data: Vec<u8>, encoding: Option<Encoding>) -> Self {
        EncapsulatedPkiData {
            id: super::non_empty(id),
            data,
            encoding,
            name: PhantomData,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }
}

impl<N: ElementName> XadesElement for EncapsulatedPkiData<N> {
    fn name(&self) -> QName {
        N::NAME
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        _ds_prefix: &str,
        _ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        if let Some(encoding) = self.encoding {
            w.write_attribute("", None, "Encoding", encoding.uri())?;
        }
        w.write_characters(&base64::encode(&self.data))
    }
}

pub type EncapsulatedTimeStamp = EncapsulatedPkiData<names::EncapsulatedTimeStamp>;
pub type X509AttributeCertificate = EncapsulatedPkiData<names::X509AttributeCertificate>;
/// The TS 101 903 certified role: a DER encoded attribute certificate.
pub type CertifiedRoleV1 = EncapsulatedPkiData<names::CertifiedRole>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{marshal, outline};

    #[test]
    fn marshals_attributes_and_base64() {
        let ts = EncapsulatedTimeStamp::new(Some("ts-1"), b"token".to_vec(), Some(Encoding::Der));
        assert_eq!(
            outline(&marshal(&ts)),
            vec![
                format!(
                    "<xades:EncapsulatedTimeStamp {{{}}} Encoding={} Id=ts-1>",
                    crate::XADES_NS,
                    Encoding::Der.uri()
                ),
                "dG9rZW4=".to_string(),
                "</xades:EncapsulatedTimeStamp>".to_string(),
            ]
        );
    }

    #[test]
    fn absent_attributes_are_not_written() {
        let ts = EncapsulatedTimeStamp::new(Some(""), vec![0xff], None);
        assert_eq!(
            outline(&marshal(&ts)),
            vec![
                format!("<xades:EncapsulatedTimeStamp {{{}}}>", crate::XADES_NS),
                "/w==".to_string(),
                "</xades:EncapsulatedTimeStamp>".to_string(),
            ]
        );
        assert_eq!(ts, EncapsulatedTimeStamp::new(None, vec![0xff], None));
    }

    #[test]
    fn equality_covers_every_field() {
        let base = X509AttributeCertificate::new(Some("a"), vec![1], Some(Encoding::Ber));
        assert_ne!(base, X509AttributeCertificate::new(Some("b"), vec![1], Some(Encoding::Ber)));
        assert_ne!(base, X509AttributeCertificate::new(Some("a"), vec![2], Some(Encoding::Ber)));
        assert_ne!(base, X509AttributeCertificate::new(Some("a"), vec![1], Some(Encoding::Per)));
        assert_ne!(base, X509AttributeCertificate::new(Some("a"), vec![1], None));
    }

    #[test]
    fn encoding_uris() {
        assert_eq!(
            Encoding::from_uri("http://uri.etsi.org/01903/v1.2.2#XER"),
            Some(Encoding::Xer)
        );
        assert_eq!(Encoding::from_uri("urn:none"), None);
    }
}

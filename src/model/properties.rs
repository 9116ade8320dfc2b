use super::{
    QName, SignaturePolicyIdentifier, SignaturePolicyStore, SignatureProductionPlace,
    SignedDataObjectProperties, SignerRole, SigningCertificate, UnsignedDataObjectProperties,
    XadesElement,
};
use crate::context::MarshalContext;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::writer::{ForeignNode, XmlWriter};
use chrono::{DateTime, Utc};

/// `xades:SignedSignatureProperties`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignedSignatureProperties {
    id: Option<String>,
    signing_time: Option<DateTime<Utc>>,
    signing_certificate: Option<SigningCertificate>,
    policy: Option<SignaturePolicyIdentifier>,
    production_place: Option<SignatureProductionPlace>,
    signer_role: Option<SignerRole>,
    extensions: Vec<ForeignNode>,
}

impl SignedSignatureProperties {
    /// Fails when the dialect specific children were built for different dialects.
    pub(crate) fn new(
        id: Option<&str>,
        signing_time: Option<DateTime<Utc>>,
        signing_certificate: Option<SigningCertificate>,
        policy: Option<SignaturePolicyIdentifier>,
        production_place: Option<SignatureProductionPlace>,
        signer_role: Option<SignerRole>,
        extensions: Vec<ForeignNode>,
    ) -> Result<Self> {
        let dialects = [
            signing_certificate.as_ref().map(SigningCertificate::dialect),
            production_place.as_ref().map(SignatureProductionPlace::dialect),
            signer_role.as_ref().map(SignerRole::dialect),
        ];
        let mut present = dialects.iter().flatten();
        if let Some(first) = present.next() {
            if present.any(|d| d != first) {
                return Err(Error::UnsupportedFeature(
                    "TS 101 903 and EN 319 132 elements mixed in one SignedSignatureProperties"
                        .to_string(),
                ));
            }
        }

        Ok(SignedSignatureProperties {
            id: super::non_empty(id),
            signing_time,
            signing_certificate,
            policy,
            production_place,
            signer_role,
            extensions,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn signing_time(&self) -> Option<&DateTime<Utc>> {
        self.signing_time.as_ref()
    }

    pub fn signing_certificate(&self) -> Option<&SigningCertificate> {
        self.signing_certificate.as_ref()
    }

    pub fn signature_policy_identifier(&self) -> Option<&SignaturePolicyIdentifier> {
        self.policy.as_ref()
    }

    pub fn signature_production_place(&self) -> Option<&SignatureProductionPlace> {
        self.production_place.as_ref()
    }

    pub fn signer_role(&self) -> Option<&SignerRole> {
        self.signer_role.as_ref()
    }

    pub fn extensions(&self) -> &[ForeignNode] {
        &self.extensions
    }

    /// The dialect of the first dialect specific child, if any.
    pub fn dialect(&self) -> Option<Dialect> {
        self.signing_certificate
            .as_ref()
            .map(SigningCertificate::dialect)
            .or_else(|| self.production_place.as_ref().map(SignatureProductionPlace::dialect))
            .or_else(|| self.signer_role.as_ref().map(SignerRole::dialect))
    }
}

impl XadesElement for SignedSignatureProperties {
    fn name(&self) -> QName {
        QName::xades("SignedSignatureProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        if let Some(time) = &self.signing_time {
            w.write_text_element(
                ns_prefix,
                "SigningTime",
                crate::XADES_NS,
                &super::format_signing_time(time),
            )?;
        }
        if let Some(c) = &self.signing_certificate {
            c.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(p) = &self.policy {
            p.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(p) = &self.production_place {
            p.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(r) = &self.signer_role {
            r.marshal(w, ds_prefix, ctx)?;
        }
        for node in &self.extensions {
            w.marshal_foreign_node(node)?;
        }
        Ok(())
    }
}

/// `xades:SignedProperties`, the part of the qualifying properties covered by the signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedProperties {
    id: Option<String>,
    signature_properties: Option<SignedSignatureProperties>,
    data_object_properties: Option<SignedDataObjectProperties>,
}

impl SignedProperties {
    pub(crate) fn new(
        id: Option<&str>,
        signature_properties: Option<SignedSignatureProperties>,
        data_object_properties: Option<SignedDataObjectProperties>,
    ) -> Self {
        SignedProperties {
            id: super::non_empty(id),
            signature_properties,
            data_object_properties,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn signed_signature_properties(&self) -> Option<&SignedSignatureProperties> {
        self.signature_properties.as_ref()
    }

    pub fn signed_data_object_properties(&self) -> Option<&SignedDataObjectProperties> {
        self.data_object_properties.as_ref()
    }
}

impl XadesElement for SignedProperties {
    fn name(&self) -> QName {
        QName::xades("SignedProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        if let Some(p) = &self.signature_properties {
            p.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(p) = &self.data_object_properties {
            p.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

/// `xades:UnsignedSignatureProperties`. Only the policy store is modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedSignatureProperties {
    id: Option<String>,
    policy_store: Option<SignaturePolicyStore>,
}

impl UnsignedSignatureProperties {
    pub(crate) fn new(id: Option<&str>, policy_store: Option<SignaturePolicyStore>) -> Self {
        UnsignedSignatureProperties {
            id: super::non_empty(id),
            policy_store,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn signature_policy_store(&self) -> Option<&SignaturePolicyStore> {
        self.policy_store.as_ref()
    }
}

impl XadesElement for UnsignedSignatureProperties {
    fn name(&self) -> QName {
        QName::xades("UnsignedSignatureProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        if let Some(store) = &self.policy_store {
            store.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

/// `xades:UnsignedProperties`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedProperties {
    id: Option<String>,
    signature_properties: Option<UnsignedSignatureProperties>,
    data_object_properties: Option<UnsignedDataObjectProperties>,
}

impl UnsignedProperties {
    pub(crate) fn new(
        id: Option<&str>,
        signature_properties: Option<UnsignedSignatureProperties>,
        data_object_properties: Option<UnsignedDataObjectProperties>,
    ) -> Self {
        UnsignedProperties {
            id: super::non_empty(id),
            signature_properties,
            data_object_properties,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn unsigned_signature_properties(&self) -> Option<&UnsignedSignatureProperties> {
        self.signature_properties.as_ref()
    }

    pub fn unsigned_data_object_properties(&self) -> Option<&UnsignedDataObjectProperties> {
        self.data_object_properties.as_ref()
    }
}

impl XadesElement for UnsignedProperties {
    fn name(&self) -> QName {
        QName::xades("UnsignedProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        if let Some(p) = &self.signature_properties {
            p.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(p) = &self.data_object_properties {
            p.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

/// `xades:QualifyingProperties`, the root of the XAdES tree. `Target` points
/// at the `ds:Signature` it qualifies.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifyingProperties {
    id: Option<String>,
    target: String,
    signed: Option<SignedProperties>,
    unsigned: Option<UnsignedProperties>,
}

impl QualifyingProperties {
    pub(crate) fn new(
        id: Option<&str>,
        target: &str,
        signed: Option<SignedProperties>,
        unsigned: Option<UnsignedProperties>,
    ) -> Result<Self> {
        if target.is_empty() {
            return Err(Error::InvalidInput(
                "QualifyingProperties needs a target".to_string(),
            ));
        }
        Ok(QualifyingProperties {
            id: super::non_empty(id),
            target: target.to_string(),
            signed,
            unsigned,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn signed_properties(&self) -> Option<&SignedProperties> {
        self.signed.as_ref()
    }

    pub fn unsigned_properties(&self) -> Option<&UnsignedProperties> {
        self.unsigned.as_ref()
    }
}

impl XadesElement for QualifyingProperties {
    fn name(&self) -> QName {
        QName::xades("QualifyingProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        w.write_attribute("", None, "Target", &self.target)?;
        if let Some(p) = &self.signed {
            p.marshal(w, ds_prefix, ctx)?;
        }
        if let Some(p) = &self.unsigned {
            p.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

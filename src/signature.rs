use crate::context::MarshalContext;
use crate::document::Document;
use crate::engine::{SignatureEngine, SignatureTemplate, SignedSignature};
use crate::error::Result;
use crate::model::{QualifyingProperties, XadesElement};
use crate::proto;
use crate::writer::{EventWriter, ForeignNode};
use openssl::pkey::{PKeyRef, Private};
use xml::reader::XmlEvent;

/// An XML signature carrying XAdES qualifying properties.
///
/// Created unsigned by [`crate::XadesFactory::new_xades_signature`]; the
/// QualifyingProperties tree is marshalled into a `ds:Object` when signing.
#[derive(Debug, Clone)]
pub struct XadesSignature {
    id: String,
    signed_info: proto::ds::SignedInfo,
    key_info: Option<proto::ds::KeyInfo>,
    qualifying_properties: QualifyingProperties,
    other_objects: Vec<ForeignNode>,
    signed: Option<SignedSignature>,
}

impl XadesSignature {
    pub(crate) fn new(
        id: &str,
        signed_info: proto::ds::SignedInfo,
        key_info: Option<proto::ds::KeyInfo>,
        qualifying_properties: QualifyingProperties,
        other_objects: Vec<ForeignNode>,
    ) -> Self {
        XadesSignature {
            id: id.to_string(),
            signed_info,
            key_info,
            qualifying_properties,
            other_objects,
            signed: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The SignedInfo; after signing it carries the computed digest values.
    pub fn signed_info(&self) -> &proto::ds::SignedInfo {
        match &self.signed {
            Some(s) => &s.signed_info,
            None => &self.signed_info,
        }
    }

    pub fn key_info(&self) -> Option<&proto::ds::KeyInfo> {
        self.key_info.as_ref()
    }

    pub fn qualifying_properties(&self) -> &QualifyingProperties {
        &self.qualifying_properties
    }

    pub fn other_objects(&self) -> &[ForeignNode] {
        &self.other_objects
    }

    /// The `ds:Signature` element as inserted into the signed document.
    pub fn element(&self) -> Option<&[XmlEvent]> {
        self.signed.as_ref().map(|s| s.element.as_slice())
    }

    pub fn signature_value(&self) -> Option<&[u8]> {
        self.signed.as_ref().map(|s| s.signature_value.as_slice())
    }

    pub fn is_signed(&self) -> bool {
        self.signed.is_some()
    }

    fn template(&self, ctx: &MarshalContext) -> Result<SignatureTemplate> {
        let ds_prefix = ctx.namespace_prefix(crate::DSIG_NS, crate::DSIG_PREFIX);

        let mut w = EventWriter::new();
        self.qualifying_properties.marshal(&mut w, ds_prefix, ctx)?;
        let qualifying_properties = ForeignNode::from_events(w.into_events()?)?;

        let mut objects = self.other_objects.clone();
        objects.push(qualifying_properties);

        Ok(SignatureTemplate {
            id: self.id.clone(),
            signed_info: self.signed_info.clone(),
            key_info: self.key_info.clone(),
            objects,
            ds_prefix: ds_prefix.to_string(),
        })
    }

    /// Signs with `key` and appends the signature to `document`. Signing an
    /// already signed signature does nothing.
    pub fn sign<E: SignatureEngine + ?Sized>(
        &mut self,
        engine: &E,
        key: &PKeyRef<Private>,
        ctx: &MarshalContext,
        document: &mut Document,
    ) -> Result<()> {
        if self.signed.is_some() {
            return Ok(());
        }
        let template = self.template(ctx)?;
        self.signed = Some(engine.sign(&template, key, document)?);
        Ok(())
    }

    pub fn validate<E: SignatureEngine + ?Sized>(&self, engine: &E, document: &Document) -> Result<bool> {
        engine.validate(document)
    }
}

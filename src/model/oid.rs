use super::{names, ElementName, QName, XadesElement};
use crate::context::MarshalContext;
use crate::error::{Error, Result};
use crate::writer::XmlWriter;
use std::marker::PhantomData;

/// How an OID in an `Identifier` element is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    #[serde(rename = "OIDAsURI")]
    OidAsUri,
    #[serde(rename = "OIDAsURN")]
    OidAsUrn,
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::OidAsUri => "OIDAsURI",
            Qualifier::OidAsUrn => "OIDAsURN",
        }
    }
}

/// `xades:ObjectIdentifierType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifierType<N> {
    identifier: String,
    qualifier: Option<Qualifier>,
    description: Option<String>,
    documentation_references: Vec<String>,
    name: PhantomData<N>,
}

impl<N: ElementName> ObjectIdentifierType<N> {
    pub(crate) fn new(
        identifier: &str,
        qualifier: Option<Qualifier>,
        description: Option<&str>,
        documentation_references: Vec<String>,
    ) -> Result<Self> {
        if identifier.is_empty() {
            return Err(Error::InvalidInput(
                "an object identifier needs an identifier value".to_string(),
            ));
        }
        Ok(ObjectIdentifierType {
            identifier: identifier.to_string(),
            qualifier,
            description: super::non_empty(description),
            documentation_references,
            name: PhantomData,
        })
    }

    /// The same identifier under another element name.
    pub fn renamed<M: ElementName>(self) -> ObjectIdentifierType<M> {
        ObjectIdentifierType {
            identifier: self.identifier,
            qualifier: self.qualifier,
            description: self.description,
            documentation_references: self.documentation_references,
            name: PhantomData,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn qualifier(&self) -> Option<Qualifier> {
        self.qualifier
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn documentation_references(&self) -> &[String] {
        &self.documentation_references
    }
}

impl<N: ElementName> XadesElement for ObjectIdentifierType<N> {
    fn name(&self) -> QName {
        N::NAME
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        _ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        // Children are declared by the xades schema even when the element is not.
        let prefix = ctx.namespace_prefix(crate::XADES_NS, crate::XADES_PREFIX);

        w.write_start_element(prefix, "Identifier", crate::XADES_NS)?;
        if let Some(qualifier) = self.qualifier {
            w.write_attribute("", None, "Qualifier", qualifier.as_str())?;
        }
        w.write_characters(&self.identifier)?;
        w.write_end_element()?;

        super::write_optional_text(
            w,
            prefix,
            crate::XADES_NS,
            "Description",
            self.description.as_deref(),
        )?;

        if !self.documentation_references.is_empty() {
            w.write_start_element(prefix, "DocumentationReferences", crate::XADES_NS)?;
            for reference in &self.documentation_references {
                w.write_text_element(prefix, "DocumentationReference", crate::XADES_NS, reference)?;
            }
            w.write_end_element()?;
        }
        Ok(())
    }
}

pub type ObjectIdentifier = ObjectIdentifierType<names::ObjectIdentifier>;
pub type CommitmentTypeId = ObjectIdentifierType<names::CommitmentTypeId>;
pub type SigPolicyId = ObjectIdentifierType<names::SigPolicyId>;
pub type SpDocSpecification = ObjectIdentifierType<names::SpDocSpecification>;

use super::{
    CommitmentTypeId, CommitmentTypeQualifier, ObjectIdentifier, QName,
    UnsignedDataObjectProperty, XadesElement,
};
use crate::context::MarshalContext;
use crate::error::{Error, Result};
use crate::writer::XmlWriter;

/// `xades:DataObjectFormat`, describing the data a `ds:Reference` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObjectFormat {
    object_reference: String,
    description: Option<String>,
    object_identifier: Option<ObjectIdentifier>,
    mime_type: Option<String>,
    encoding: Option<String>,
}

impl DataObjectFormat {
    pub(crate) fn new(
        object_reference: &str,
        description: Option<&str>,
        object_identifier: Option<ObjectIdentifier>,
        mime_type: Option<&str>,
        encoding: Option<&str>,
    ) -> Result<Self> {
        if object_reference.is_empty() {
            return Err(Error::InvalidInput(
                "a data object format needs an object reference".to_string(),
            ));
        }
        let description = super::non_empty(description);
        let mime_type = super::non_empty(mime_type);
        if description.is_none() && object_identifier.is_none() && mime_type.is_none() {
            return Err(Error::InvalidInput(
                "a data object format needs a description, an object identifier or a mime type"
                    .to_string(),
            ));
        }
        Ok(DataObjectFormat {
            object_reference: object_reference.to_string(),
            description,
            object_identifier,
            mime_type,
            encoding: super::non_empty(encoding),
        })
    }

    pub fn object_reference(&self) -> &str {
        &self.object_reference
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn object_identifier(&self) -> Option<&ObjectIdentifier> {
        self.object_identifier.as_ref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

impl XadesElement for DataObjectFormat {
    fn name(&self) -> QName {
        QName::xades("DataObjectFormat")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        w.write_attribute("", None, "ObjectReference", &self.object_reference)?;
        super::write_optional_text(
            w,
            ns_prefix,
            crate::XADES_NS,
            "Description",
            self.description.as_deref(),
        )?;
        if let Some(oid) = &self.object_identifier {
            oid.marshal(w, ds_prefix, ctx)?;
        }
        super::write_optional_text(w, ns_prefix, crate::XADES_NS, "MimeType", self.mime_type.as_deref())?;
        super::write_optional_text(w, ns_prefix, crate::XADES_NS, "Encoding", self.encoding.as_deref())
    }
}

/// `xades:CommitmentTypeIndication`. Without object references the commitment
/// applies to every signed data object.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitmentTypeIndication {
    type_id: CommitmentTypeId,
    object_references: Vec<String>,
    qualifiers: Vec<CommitmentTypeQualifier>,
}

impl CommitmentTypeIndication {
    pub(crate) fn new(
        type_id: CommitmentTypeId,
        object_references: Vec<String>,
        qualifiers: Vec<CommitmentTypeQualifier>,
    ) -> Self {
        CommitmentTypeIndication {
            type_id,
            object_references,
            qualifiers,
        }
    }

    pub fn type_id(&self) -> &CommitmentTypeId {
        &self.type_id
    }

    pub fn object_references(&self) -> &[String] {
        &self.object_references
    }

    pub fn qualifiers(&self) -> &[CommitmentTypeQualifier] {
        &self.qualifiers
    }

    pub fn applies_to_all_signed_data_objects(&self) -> bool {
        self.object_references.is_empty()
    }
}

impl XadesElement for CommitmentTypeIndication {
    fn name(&self) -> QName {
        QName::xades("CommitmentTypeIndication")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        self.type_id.marshal(w, ds_prefix, ctx)?;
        if self.applies_to_all_signed_data_objects() {
            w.write_start_element(ns_prefix, "AllSignedDataObjects", crate::XADES_NS)?;
            w.write_end_element()?;
        } else {
            for reference in &self.object_references {
                w.write_text_element(ns_prefix, "ObjectReference", crate::XADES_NS, reference)?;
            }
        }
        super::write_list(
            w,
            ns_prefix,
            "CommitmentTypeQualifiers",
            &self.qualifiers,
            ds_prefix,
            ctx,
        )
    }
}

/// `xades:SignedDataObjectProperties`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedDataObjectProperties {
    id: Option<String>,
    formats: Vec<DataObjectFormat>,
    commitments: Vec<CommitmentTypeIndication>,
}

impl SignedDataObjectProperties {
    pub(crate) fn new(
        id: Option<&str>,
        formats: Vec<DataObjectFormat>,
        commitments: Vec<CommitmentTypeIndication>,
    ) -> Self {
        SignedDataObjectProperties {
            id: super::non_empty(id),
            formats,
            commitments,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data_object_formats(&self) -> &[DataObjectFormat] {
        &self.formats
    }

    pub fn commitment_type_indications(&self) -> &[CommitmentTypeIndication] {
        &self.commitments
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty() && self.commitments.is_empty()
    }
}

impl XadesElement for SignedDataObjectProperties {
    fn name(&self) -> QName {
        QName::xades("SignedDataObjectProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        for format in &self.formats {
            format.marshal(w, ds_prefix, ctx)?;
        }
        for commitment in &self.commitments {
            commitment.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

/// `xades:UnsignedDataObjectProperties`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedDataObjectProperties {
    id: Option<String>,
    properties: Vec<UnsignedDataObjectProperty>,
}

impl UnsignedDataObjectProperties {
    pub(crate) fn new(id: Option<&str>, properties: Vec<UnsignedDataObjectProperty>) -> Self {
        UnsignedDataObjectProperties {
            id: super::non_empty(id),
            properties,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn properties(&self) -> &[UnsignedDataObjectProperty] {
        &self.properties
    }
}

impl XadesElement for UnsignedDataObjectProperties {
    fn name(&self) -> QName {
        QName::xades("UnsignedDataObjectProperties")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        for property in &self.properties {
            property.marshal(w, ds_prefix, ctx)?;
        }
        Ok(())
    }
}

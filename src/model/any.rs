use super::{names, ElementName, QName, XadesElement};
use crate::context::MarshalContext;
use crate::error::Result;
use crate::writer::{ForeignNode, XmlWriter};
use std::marker::PhantomData;

/// An element with arbitrary content (`xsd:anyType`): an ordered list of
/// foreign nodes written verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyType<N> {
    content: Vec<ForeignNode>,
    name: PhantomData<N>,
}

impl<N: ElementName> AnyType<N> {
    pub(crate) fn new(content: Vec<ForeignNode>) -> Self {
        AnyType {
            content,
            name: PhantomData,
        }
    }

    pub fn content(&self) -> &[ForeignNode] {
        &self.content
    }
}

impl<N: ElementName> XadesElement for AnyType<N> {
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
        for node in &self.content {
            w.marshal_foreign_node(node)?;
        }
        Ok(())
    }
}

pub type ClaimedRole = AnyType<names::ClaimedRole>;
pub type SignedAssertion = AnyType<names::SignedAssertion>;
pub type OtherAttributeCertificate = AnyType<names::OtherAttributeCertificate>;
pub type CommitmentTypeQualifier = AnyType<names::CommitmentTypeQualifier>;
pub type SigPolicyQualifier = AnyType<names::SigPolicyQualifier>;
pub type XmlTimeStamp = AnyType<names::XmlTimeStamp>;
pub type UnsignedDataObjectProperty = AnyType<names::UnsignedDataObjectProperty>;

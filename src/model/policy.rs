use super::{QName, SigPolicyHash, SigPolicyId, SigPolicyQualifier, SpDocSpecification, XadesElement};
use crate::context::MarshalContext;
use crate::error::Result;
use crate::writer::XmlWriter;

/// An explicitly identified signature policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePolicyId {
    policy_id: SigPolicyId,
    transforms: Vec<String>,
    hash: SigPolicyHash,
    qualifiers: Vec<SigPolicyQualifier>,
}

impl SignaturePolicyId {
    pub(crate) fn new(
        policy_id: SigPolicyId,
        transforms: Vec<String>,
        hash: SigPolicyHash,
        qualifiers: Vec<SigPolicyQualifier>,
    ) -> Self {
        SignaturePolicyId {
            policy_id,
            transforms,
            hash,
            qualifiers,
        }
    }

    pub fn policy_id(&self) -> &SigPolicyId {
        &self.policy_id
    }

    pub fn transforms(&self) -> &[String] {
        &self.transforms
    }

    pub fn hash(&self) -> &SigPolicyHash {
        &self.hash
    }

    pub fn qualifiers(&self) -> &[SigPolicyQualifier] {
        &self.qualifiers
    }
}

impl XadesElement for SignaturePolicyId {
    fn name(&self) -> QName {
        QName::xades("SignaturePolicyId")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        self.policy_id.marshal(w, ds_prefix, ctx)?;
        if !self.transforms.is_empty() {
            w.write_start_element(ds_prefix, "Transforms", crate::DSIG_NS)?;
            for algorithm in &self.transforms {
                w.write_start_element(ds_prefix, "Transform", crate::DSIG_NS)?;
                w.write_attribute("", None, "Algorithm", algorithm)?;
                w.write_end_element()?;
            }
            w.write_end_element()?;
        }
        self.hash.marshal(w, ds_prefix, ctx)?;
        super::write_list(w, ns_prefix, "SigPolicyQualifiers", &self.qualifiers, ds_prefix, ctx)
    }
}

/// `xades:SignaturePolicyIdentifier`: either an implied policy or an explicit one.
#[derive(Debug, Clone, PartialEq)]
pub enum SignaturePolicyIdentifier {
    Implied,
    Explicit(SignaturePolicyId),
}

impl SignaturePolicyIdentifier {
    pub fn is_implied(&self) -> bool {
        matches!(self, SignaturePolicyIdentifier::Implied)
    }
}

impl XadesElement for SignaturePolicyIdentifier {
    fn name(&self) -> QName {
        QName::xades("SignaturePolicyIdentifier")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        match self {
            SignaturePolicyIdentifier::Implied => {
                w.write_start_element(ns_prefix, "SignaturePolicyImplied", crate::XADES_NS)?;
                w.write_end_element()
            }
            SignaturePolicyIdentifier::Explicit(id) => id.marshal(w, ds_prefix, ctx),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignaturePolicyDocument {
    /// The policy document itself, written base64 encoded.
    Content(Vec<u8>),
    /// Where a local copy of the policy document can be found.
    LocalUri(String),
}

/// `xades141:SignaturePolicyStore`, an unsigned property holding the policy
/// document or a pointer to a local copy of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePolicyStore {
    id: Option<String>,
    specification: SpDocSpecification,
    document: SignaturePolicyDocument,
}

impl SignaturePolicyStore {
    pub(crate) fn new(
        id: Option<&str>,
        specification: SpDocSpecification,
        document: SignaturePolicyDocument,
    ) -> Self {
        SignaturePolicyStore {
            id: super::non_empty(id),
            specification,
            document,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn specification(&self) -> &SpDocSpecification {
        &self.specification
    }

    pub fn document(&self) -> &SignaturePolicyDocument {
        &self.document
    }
}

impl XadesElement for SignaturePolicyStore {
    fn name(&self) -> QName {
        QName::xades141("SignaturePolicyStore")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        super::write_id(w, self.id.as_deref())?;
        self.specification.marshal(w, ds_prefix, ctx)?;
        match &self.document {
            SignaturePolicyDocument::Content(data) => w.write_text_element(
                ns_prefix,
                "SignaturePolicyDocument",
                crate::XADES141_NS,
                &base64::encode(data),
            ),
            SignaturePolicyDocument::LocalUri(uri) => {
                w.write_text_element(ns_prefix, "SigPolDocLocalURI", crate::XADES141_NS, uri)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{marshal, outline};
    use crate::writer::ForeignNode;

    fn policy() -> SignaturePolicyId {
        SignaturePolicyId::new(
            SigPolicyId::new("urn:oid:1.2.3", None, None, vec![]).unwrap(),
            vec![crate::CANONICAL_1_0.to_string()],
            SigPolicyHash::new(crate::DIGEST_SHA256, vec![9]).unwrap(),
            vec![SigPolicyQualifier::new(vec![ForeignNode::text("q")])],
        )
    }

    #[test]
    fn explicit_policy_child_order() {
        let id = SignaturePolicyIdentifier::Explicit(policy());
        let (x, ds) = (crate::XADES_NS, crate::DSIG_NS);
        assert_eq!(
            outline(&marshal(&id)),
            vec![
                format!("<xades:SignaturePolicyIdentifier {{{}}}>", x),
                format!("<xades:SignaturePolicyId {{{}}}>", x),
                format!("<xades:SigPolicyId {{{}}}>", x),
                format!("<xades:Identifier {{{}}}>", x),
                "urn:oid:1.2.3".to_string(),
                "</xades:Identifier>".to_string(),
                "</xades:SigPolicyId>".to_string(),
                format!("<ds:Transforms {{{}}}>", ds),
                format!("<ds:Transform {{{}}} Algorithm={}>", ds, crate::CANONICAL_1_0),
                "</ds:Transform>".to_string(),
                "</ds:Transforms>".to_string(),
                format!("<xades:SigPolicyHash {{{}}}>", x),
                format!("<ds:DigestMethod {{{}}} Algorithm={}>", ds, crate::DIGEST_SHA256),
                "</ds:DigestMethod>".to_string(),
                format!("<ds:DigestValue {{{}}}>", ds),
                "CQ==".to_string(),
                "</ds:DigestValue>".to_string(),
                "</xades:SigPolicyHash>".to_string(),
                format!("<xades:SigPolicyQualifiers {{{}}}>", x),
                format!("<xades:SigPolicyQualifier {{{}}}>", x),
                "q".to_string(),
                "</xades:SigPolicyQualifier>".to_string(),
                "</xades:SigPolicyQualifiers>".to_string(),
                "</xades:SignaturePolicyId>".to_string(),
                "</xades:SignaturePolicyIdentifier>".to_string(),
            ]
        );
    }

    #[test]
    fn implied_policy() {
        let id = SignaturePolicyIdentifier::Implied;
        assert!(id.is_implied());
        assert_eq!(
            outline(&marshal(&id)),
            vec![
                format!("<xades:SignaturePolicyIdentifier {{{}}}>", crate::XADES_NS),
                format!("<xades:SignaturePolicyImplied {{{}}}>", crate::XADES_NS),
                "</xades:SignaturePolicyImplied>".to_string(),
                "</xades:SignaturePolicyIdentifier>".to_string(),
            ]
        );
        assert_ne!(id, SignaturePolicyIdentifier::Explicit(policy()));
    }

    #[test]
    fn policy_store_content_and_local_uri() {
        let doc_spec = SpDocSpecification::new("urn:oid:1.2.3", None, None, vec![]).unwrap();
        let store = SignaturePolicyStore::new(
            Some("store-1"),
            doc_spec.clone(),
            SignaturePolicyDocument::Content(b"policy".to_vec()),
        );
        let lines = outline(&marshal(&store));
        assert_eq!(
            lines[0],
            format!("<xades141:SignaturePolicyStore {{{}}} Id=store-1>", crate::XADES141_NS)
        );
        assert_eq!(
            lines[1],
            format!("<xades141:SPDocSpecification {{{}}}>", crate::XADES141_NS)
        );
        assert_eq!(
            &lines[lines.len() - 4..],
            &[
                format!("<xades141:SignaturePolicyDocument {{{}}}>", crate::XADES141_NS),
                "cG9saWN5".to_string(),
                "</xades141:SignaturePolicyDocument>".to_string(),
                "</xades141:SignaturePolicyStore>".to_string(),
            ]
        );

        let by_ref = SignaturePolicyStore::new(
            None,
            doc_spec,
            SignaturePolicyDocument::LocalUri("file:///policy.pdf".to_string()),
        );
        let lines = outline(&marshal(&by_ref));
        assert!(lines.contains(&format!(
            "<xades141:SigPolDocLocalURI {{{}}}>",
            crate::XADES141_NS
        )));
        assert_ne!(store, by_ref);
    }
}

//! Assembly of complete enveloped XAdES signatures.

use crate::context::MarshalContext;
use crate::dialect::{Dialect, SignatureSettings};
use crate::document::Document;
use crate::engine::{OpensslEngine, SignatureEngine};
use crate::error::{Error, Result};
use crate::factory::XadesFactory;
use crate::model::{
    non_empty, CertifiedRole, ElementName, ObjectIdentifier, ObjectIdentifierType, PostalAddress,
    Qualifier, SignaturePolicyIdentifier, SignerRole,
};
use crate::signature::XadesSignature;
use crate::writer::ForeignNode;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use uuid::Uuid;

/// An object identifier as handed to the builder; turned into the matching
/// `ObjectIdentifierType` element when the signature is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectId {
    pub identifier: String,
    pub qualifier: Option<Qualifier>,
    pub description: Option<String>,
    pub documentation_references: Vec<String>,
}

impl ObjectId {
    pub fn new(identifier: &str) -> Self {
        ObjectId {
            identifier: identifier.to_string(),
            ..Default::default()
        }
    }

    fn element<N: ElementName>(&self, factory: &XadesFactory) -> Result<ObjectIdentifierType<N>> {
        factory.new_object_identifier(
            &self.identifier,
            self.qualifier,
            self.description.as_deref(),
            self.documentation_references.clone(),
        )
    }
}

impl From<&str> for ObjectId {
    fn from(identifier: &str) -> Self {
        ObjectId::new(identifier)
    }
}

/// A commitment indication waiting for the factory.
#[derive(Debug, Clone, PartialEq)]
struct PendingCommitment {
    type_id: ObjectId,
    qualifiers: Vec<ForeignNode>,
}

#[derive(Debug, Clone, PartialEq)]
enum PendingPolicy {
    Implied,
    Explicit {
        policy_id: ObjectId,
        digest_algorithm: String,
        hash: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum PendingPolicyStore {
    Document(ObjectId, Vec<u8>),
    LocalUri(ObjectId, String),
}

/// Collects the signer's inputs and produces one enveloped XAdES signature,
/// appended as the last child of the document element.
///
/// Only the document, the private key and the signing certificate are
/// required. Algorithms and dialect default to [`SignatureSettings::default`].
/// [`build`](Self::build) signs once; later calls return the same signature
/// until one of the setters changes the builder's state.
///
/// ```no_run
/// # fn main() -> xades::Result<()> {
/// # let (key, cert): (openssl::pkey::PKey<openssl::pkey::Private>, openssl::x509::X509) = unimplemented!();
/// let mut doc: xades::Document = "<invoice><amount>10</amount></invoice>".parse()?;
/// let mut builder = xades::EnvelopedSignatureBuilder::new();
/// builder
///     .set_document(&mut doc)
///     .set_private_key(key)
///     .set_signing_certificate(cert)
///     .set_signed_document_description("invoice");
/// let signature = builder.build()?;
/// println!("signed {}", signature.id());
/// # Ok(())
/// # }
/// ```
pub struct EnvelopedSignatureBuilder<'a, E: SignatureEngine = OpensslEngine> {
    engine: E,
    settings: SignatureSettings,
    document: Option<&'a mut Document>,
    key: Option<PKey<Private>>,
    certificate: Option<X509>,
    chain: Vec<X509>,
    description: Option<String>,
    document_oid: Option<ObjectId>,
    location: PostalAddress,
    claimed_roles: Vec<ForeignNode>,
    x509_certified_roles: Vec<X509>,
    other_certified_roles: Vec<ForeignNode>,
    role_assertions: Vec<ForeignNode>,
    commitments: Vec<PendingCommitment>,
    policy: Option<PendingPolicy>,
    policy_store: Option<PendingPolicyStore>,
    ctx: MarshalContext,
    signature: Option<XadesSignature>,
}

impl<'a> EnvelopedSignatureBuilder<'a, OpensslEngine> {
    pub fn new() -> Self {
        Self::with_engine(OpensslEngine::new())
    }
}

impl<'a> Default for EnvelopedSignatureBuilder<'a, OpensslEngine> {
    fn default() -> Self {
        Self::new()
    }
}

/// The children of `node`, which must be an element with content.
fn element_content(node: &ForeignNode, what: &str) -> Result<Vec<ForeignNode>> {
    let content = node.children();
    if !node.is_element() || content.is_empty() {
        return Err(Error::InvalidState(format!("a {} element must have content", what)));
    }
    Ok(content)
}

impl<'a, E: SignatureEngine> EnvelopedSignatureBuilder<'a, E> {
    pub fn with_engine(engine: E) -> Self {
        EnvelopedSignatureBuilder {
            engine,
            settings: SignatureSettings::default(),
            document: None,
            key: None,
            certificate: None,
            chain: vec![],
            description: None,
            document_oid: None,
            location: PostalAddress::default(),
            claimed_roles: vec![],
            x509_certified_roles: vec![],
            other_certified_roles: vec![],
            role_assertions: vec![],
            commitments: vec![],
            policy: None,
            policy_store: None,
            ctx: MarshalContext::with_default_prefixes(),
            signature: None,
        }
    }

    fn changed(&mut self) -> &mut Self {
        self.signature = None;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &SignatureSettings {
        &self.settings
    }

    /// The document being signed, holding the signature once built.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_deref()
    }

    /// The signature produced by the last successful [`build`](Self::build).
    pub fn signature(&self) -> Option<&XadesSignature> {
        self.signature.as_ref()
    }

    pub fn set_settings(&mut self, settings: SignatureSettings) -> &mut Self {
        self.settings = settings;
        self.changed()
    }

    pub fn set_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.settings.dialect = dialect;
        self.changed()
    }

    pub fn set_document(&mut self, document: &'a mut Document) -> &mut Self {
        self.document = Some(document);
        self.changed()
    }

    /// Uses `key` with the first certificate of `chain` as signing
    /// certificate. The rest of the chain goes into the signature when
    /// `include_chain` is set.
    pub fn set_key_pair(&mut self, key: PKey<Private>, chain: Vec<X509>, include_chain: bool) -> &mut Self {
        self.key = Some(key);
        let mut chain = chain.into_iter();
        if let Some(certificate) = chain.next() {
            self.certificate = Some(certificate);
            self.chain = if include_chain { chain.collect() } else { vec![] };
        }
        self.changed()
    }

    pub fn set_private_key(&mut self, key: PKey<Private>) -> &mut Self {
        self.key = Some(key);
        self.changed()
    }

    pub fn set_signing_certificate(&mut self, certificate: X509) -> &mut Self {
        self.certificate = Some(certificate);
        self.changed()
    }

    /// CA certificates to include after the signing certificate, without the
    /// signing certificate itself.
    pub fn set_certificate_chain(&mut self, chain: Vec<X509>) -> &mut Self {
        self.chain = chain;
        self.changed()
    }

    /// An empty URI restores the default.
    pub fn set_c14n_algorithm(&mut self, uri: &str) -> &mut Self {
        self.settings.c14n_algorithm = if uri.is_empty() {
            SignatureSettings::default().c14n_algorithm
        } else {
            uri.to_string()
        };
        self.changed()
    }

    /// An empty URI restores the default.
    pub fn set_digest_algorithm(&mut self, uri: &str) -> &mut Self {
        self.settings.digest_algorithm = if uri.is_empty() {
            SignatureSettings::default().digest_algorithm
        } else {
            uri.to_string()
        };
        self.changed()
    }

    /// An empty URI restores the default.
    pub fn set_signing_algorithm(&mut self, uri: &str) -> &mut Self {
        self.settings.signing_algorithm = if uri.is_empty() {
            SignatureSettings::default().signing_algorithm
        } else {
            uri.to_string()
        };
        self.changed()
    }

    pub fn set_signed_document_description(&mut self, description: &str) -> &mut Self {
        self.description = non_empty(Some(description));
        self.changed()
    }

    pub fn set_signed_document_oid(&mut self, oid: impl Into<ObjectId>) -> &mut Self {
        self.document_oid = Some(oid.into());
        self.changed()
    }

    /// The street is only allowed in EN 319 132 signatures.
    pub fn set_signers_location(
        &mut self,
        street: Option<&str>,
        postal_code: Option<&str>,
        city: Option<&str>,
        state_or_province: Option<&str>,
        country: Option<&str>,
    ) -> &mut Self {
        self.location = PostalAddress {
            city: non_empty(city),
            street_address: non_empty(street),
            state_or_province: non_empty(state_or_province),
            postal_code: non_empty(postal_code),
            country_name: non_empty(country),
        };
        self.changed()
    }

    /// Roles claimed by the signer. Only the content of each element is used.
    pub fn set_claimed_roles(&mut self, roles: Vec<ForeignNode>) -> &mut Self {
        self.claimed_roles = roles;
        self.changed()
    }

    pub fn set_x509_certified_roles(&mut self, certificates: Vec<X509>) -> &mut Self {
        self.x509_certified_roles = certificates;
        self.changed()
    }

    /// Non X.509 role certificates (EN 319 132 only). Only the content of
    /// each element is used.
    pub fn set_other_certified_roles(&mut self, roles: Vec<ForeignNode>) -> &mut Self {
        self.other_certified_roles = roles;
        self.changed()
    }

    /// Signed assertions on the signer's role (EN 319 132 only). Only the
    /// content of each element is used.
    pub fn set_role_assertions(&mut self, assertions: Vec<ForeignNode>) -> &mut Self {
        self.role_assertions = assertions;
        self.changed()
    }

    /// Adds a commitment applying to all signed data objects. Only the content
    /// of each qualifier element is used.
    pub fn add_commitment_indication(
        &mut self,
        type_id: impl Into<ObjectId>,
        qualifiers: Vec<ForeignNode>,
    ) -> &mut Self {
        self.commitments.push(PendingCommitment {
            type_id: type_id.into(),
            qualifiers,
        });
        self.changed()
    }

    pub fn set_signature_policy_implied(&mut self) -> &mut Self {
        self.policy = Some(PendingPolicy::Implied);
        self.changed()
    }

    pub fn set_signature_policy(
        &mut self,
        policy_id: impl Into<ObjectId>,
        digest_algorithm: &str,
        hash: Vec<u8>,
    ) -> &mut Self {
        self.policy = Some(PendingPolicy::Explicit {
            policy_id: policy_id.into(),
            digest_algorithm: digest_algorithm.to_string(),
            hash,
        });
        self.changed()
    }

    /// Embeds the policy document in the unsigned properties (EN 319 132 only).
    pub fn set_signature_policy_store(
        &mut self,
        specification: impl Into<ObjectId>,
        document: Vec<u8>,
    ) -> &mut Self {
        self.policy_store = Some(PendingPolicyStore::Document(specification.into(), document));
        self.changed()
    }

    /// Points the unsigned properties at a local copy of the policy document
    /// (EN 319 132 only).
    pub fn set_signature_policy_store_reference(
        &mut self,
        specification: impl Into<ObjectId>,
        uri: &str,
    ) -> &mut Self {
        self.policy_store = Some(PendingPolicyStore::LocalUri(
            specification.into(),
            uri.to_string(),
        ));
        self.changed()
    }

    pub fn set_namespace_prefix(&mut self, namespace: &str, prefix: &str) -> &mut Self {
        self.ctx.set_namespace_prefix(namespace, prefix);
        self.changed()
    }

    fn check_input(&self) -> Result<()> {
        if self.document.is_none() {
            return Err(Error::InvalidState("no document to sign set".to_string()));
        }
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| Error::InvalidState("private key not set".to_string()))?;
        let certificate = self
            .certificate
            .as_ref()
            .ok_or_else(|| Error::InvalidState("signing certificate not set".to_string()))?;

        let public_key = certificate
            .public_key()
            .map_err(|e| Error::CertificateEncoding(format!("unreadable public key: {}", e)))?;
        if !public_key.public_eq(key) {
            return Err(Error::InvalidState(
                "private key does not belong to the signing certificate".to_string(),
            ));
        }
        let algorithm = crate::dsig::signature_algorithm(&self.settings.signing_algorithm)?;
        if algorithm.key_type != key.id() {
            return Err(Error::InvalidState(format!(
                "{} cannot be used with the private key",
                self.settings.signing_algorithm
            )));
        }

        if matches!(&self.document_oid, Some(oid) if oid.identifier.is_empty()) {
            return Err(Error::InvalidState(
                "the document OID must have an identifier value".to_string(),
            ));
        }
        if self.commitments.iter().any(|c| c.type_id.identifier.is_empty()) {
            return Err(Error::InvalidState(
                "a commitment indication must have an identifier value".to_string(),
            ));
        }
        if matches!(&self.policy, Some(PendingPolicy::Explicit { policy_id, .. }) if policy_id.identifier.is_empty())
        {
            return Err(Error::InvalidState(
                "the signature policy must have an identifier value".to_string(),
            ));
        }

        if self.settings.dialect.is_v1() {
            let v2_only = [
                (!self.role_assertions.is_empty(), "role assertions"),
                (!self.other_certified_roles.is_empty(), "non X.509 certified roles"),
                (self.location.street_address.is_some(), "a street address"),
                (self.policy_store.is_some(), "a signature policy store"),
            ];
            if let Some((_, what)) = v2_only.iter().find(|(set, _)| *set) {
                return Err(Error::InvalidState(format!(
                    "TS 101 903 signatures cannot carry {}",
                    what
                )));
            }
        }

        for role in &self.claimed_roles {
            element_content(role, "ClaimedRole")?;
        }
        for role in &self.other_certified_roles {
            element_content(role, "other certified role")?;
        }
        for assertion in &self.role_assertions {
            element_content(assertion, "SignedAssertion")?;
        }
        Ok(())
    }

    fn signer_role(&self, factory: &XadesFactory) -> Result<Option<SignerRole>> {
        let claimed = self
            .claimed_roles
            .iter()
            .map(|r| Ok(factory.new_claimed_role(element_content(r, "ClaimedRole")?)))
            .collect::<Result<Vec<_>>>()?;
        let mut certified = self
            .x509_certified_roles
            .iter()
            .map(|c| factory.new_certified_role(None, c))
            .collect::<Result<Vec<CertifiedRole>>>()?;
        for role in &self.other_certified_roles {
            certified.push(factory.new_other_certified_role(element_content(role, "other certified role")?)?);
        }
        let assertions = self
            .role_assertions
            .iter()
            .map(|a| factory.new_signed_assertion(element_content(a, "SignedAssertion")?))
            .collect::<Result<Vec<_>>>()?;

        if claimed.is_empty() && certified.is_empty() && assertions.is_empty() {
            return Ok(None);
        }
        factory.new_signer_role(claimed, certified, assertions).map(Some)
    }

    fn policy(&self, factory: &XadesFactory) -> Result<Option<SignaturePolicyIdentifier>> {
        Ok(match &self.policy {
            None => None,
            Some(PendingPolicy::Implied) => Some(factory.new_signature_policy_implied()),
            Some(PendingPolicy::Explicit {
                policy_id,
                digest_algorithm,
                hash,
            }) => Some(factory.new_signature_policy_identifier(
                policy_id.element(factory)?,
                &[],
                digest_algorithm,
                hash.clone(),
                vec![],
            )?),
        })
    }

    /// Creates the unsigned signature object for the current state.
    fn assemble(&self) -> Result<XadesSignature> {
        let settings = &self.settings;
        let factory = XadesFactory::new(settings.dialect);
        let certificate = self
            .certificate
            .as_ref()
            .ok_or_else(|| Error::InvalidState("signing certificate not set".to_string()))?;

        let document_ref_id = format!("DR-{}", Uuid::new_v4());
        let signature_id = format!("xadessig-{}", Uuid::new_v4());
        let signed_properties_id = format!("SP-{}", Uuid::new_v4());
        debug!(
            "building {} signature {} (document reference {}, signed properties {})",
            settings.dialect, signature_id, document_ref_id, signed_properties_id
        );

        let document_ref = crate::dsig::new_reference(
            "",
            &settings.digest_algorithm,
            &[
                crate::TRANSFORM_ENVELOPED_SIGNATURE,
                settings.c14n_algorithm.as_str(),
            ],
            None,
            Some(&document_ref_id),
        )?;

        let mut certs = Vec::with_capacity(self.chain.len() + 1);
        certs.push(certificate.clone());
        certs.extend(self.chain.iter().cloned());
        let key_info = factory.new_key_info(&certs)?;
        let signing_certificate = factory.new_signing_certificate(&certs, &settings.digest_algorithm)?;
        debug!("key info holds {} certificate(s)", certs.len());

        let location = if self.location.is_empty() {
            None
        } else {
            let l = &self.location;
            Some(factory.new_signature_production_place(
                l.city.as_deref(),
                l.street_address.as_deref(),
                l.postal_code.as_deref(),
                l.state_or_province.as_deref(),
                l.country_name.as_deref(),
            )?)
        };

        let signature_properties = factory.new_signed_signature_properties(
            Some(chrono::Utc::now()),
            Some(signing_certificate),
            self.policy(&factory)?,
            location,
            self.signer_role(&factory)?,
            vec![],
        )?;

        let document_oid: Option<ObjectIdentifier> = self
            .document_oid
            .as_ref()
            .map(|oid| oid.element(&factory))
            .transpose()?;
        let data_format = factory.new_data_object_format(
            &format!("#{}", document_ref_id),
            self.description.as_deref(),
            document_oid,
            Some("text/xml"),
            None,
        )?;
        let commitments = self
            .commitments
            .iter()
            .map(|c| {
                let qualifiers = c
                    .qualifiers
                    .iter()
                    .map(|q| {
                        Ok(factory.new_commitment_type_qualifier(element_content(
                            q,
                            "CommitmentTypeQualifier",
                        )?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(factory.new_commitment_type_indication(
                    c.type_id.element(&factory)?,
                    vec![],
                    qualifiers,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        let data_object_properties = factory.new_signed_data_object_properties(vec![data_format], commitments);

        let signed_properties = factory.new_signed_properties(
            &signed_properties_id,
            Some(signature_properties),
            Some(data_object_properties),
        )?;

        let unsigned_properties = match &self.policy_store {
            None => None,
            Some(store) => {
                let store = match store {
                    PendingPolicyStore::Document(spec, document) => factory
                        .new_signature_policy_store(None, spec.element(&factory)?, document.clone())?,
                    PendingPolicyStore::LocalUri(spec, uri) => factory
                        .new_signature_policy_store_reference(None, spec.element(&factory)?, uri)?,
                };
                Some(factory.new_unsigned_properties(
                    None,
                    Some(factory.new_unsigned_signature_properties(None, Some(store))),
                    None,
                ))
            }
        };

        let qualifying_properties = factory.new_qualifying_properties(
            &format!("#{}", signature_id),
            Some(signed_properties),
            unsigned_properties,
        )?;

        factory.new_xades_signature(
            &signature_id,
            &settings.c14n_algorithm,
            &settings.digest_algorithm,
            &settings.signing_algorithm,
            Some(key_info),
            vec![document_ref],
            qualifying_properties,
            vec![],
        )
    }

    /// Builds and signs the signature, appending it to the document.
    ///
    /// Input problems are reported as [`Error::InvalidState`] (or the
    /// algorithm and encoding errors of the factory). A failing sign step is
    /// reported as [`Error::Signing`]; the document is then left unchanged and
    /// the next call starts from scratch.
    pub fn build(&mut self) -> Result<&XadesSignature> {
        if self.signature.is_none() {
            self.check_input()?;
            let mut signature = self.assemble()?;

            let document = self
                .document
                .as_deref_mut()
                .ok_or_else(|| Error::InvalidState("no document to sign set".to_string()))?;
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| Error::InvalidState("private key not set".to_string()))?;
            signature
                .sign(&self.engine, key, &self.ctx, document)
                .map_err(|e| match e {
                    Error::Signing(message) => Error::Signing(message),
                    other => Error::Signing(format!("the sign operation failed: {}", other)),
                })?;
            debug!("signature {} added to the document", signature.id());
            self.signature = Some(signature);
        }

        self.signature
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no signature built".to_string()))
    }
}

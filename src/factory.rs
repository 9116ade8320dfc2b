//! The single construction surface for XAdES elements.
//!
//! A [`XadesFactory`] is bound to one [`Dialect`] and returns the matching
//! variant of every dialect specific element. Requests for EN 319 132 only
//! constructs from a TS 101 903 factory fail right away with
//! [`Error::UnsupportedFeature`].

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::model::*;
use crate::proto;
use crate::signature::XadesSignature;
use crate::writer::ForeignNode;
use chrono::{DateTime, Utc};
use openssl::x509::{X509Ref, X509};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XadesFactory {
    dialect: Dialect,
}

impl XadesFactory {
    pub fn new(dialect: Dialect) -> Self {
        XadesFactory { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn require_v2(&self, what: &str) -> Result<()> {
        if self.dialect.is_v1() {
            return Err(Error::unsupported_in_v1(what));
        }
        Ok(())
    }

    fn check_dialect(&self, what: &str, dialect: Dialect) -> Result<()> {
        if dialect != self.dialect {
            return Err(Error::UnsupportedFeature(format!(
                "{} was built for {}, this factory builds {}",
                what, dialect, self.dialect
            )));
        }
        Ok(())
    }

    /// Creates the signature object. A reference to the SignedProperties
    /// element (`Type` [`crate::SIGNED_PROPERTIES_TYPE`], canonicalized with
    /// `c14n_algorithm`) is appended to `data_references`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_xades_signature(
        &self,
        id: &str,
        c14n_algorithm: &str,
        digest_algorithm: &str,
        signing_algorithm: &str,
        key_info: Option<proto::ds::KeyInfo>,
        data_references: Vec<proto::ds::Reference>,
        qualifying_properties: QualifyingProperties,
        other_objects: Vec<ForeignNode>,
    ) -> Result<XadesSignature> {
        if id.is_empty() {
            return Err(Error::InvalidInput("a signature needs an id".to_string()));
        }
        if data_references.is_empty() {
            return Err(Error::InvalidInput(
                "a signature needs at least one reference to sign".to_string(),
            ));
        }
        let target = format!("#{}", id);
        if qualifying_properties.target() != target {
            return Err(Error::InvalidInput(format!(
                "QualifyingProperties target {} does not point at signature {}",
                qualifying_properties.target(),
                id
            )));
        }

        let mut references = data_references;
        if let Some(signed) = qualifying_properties.signed_properties() {
            let sp_id = signed.id().ok_or_else(|| {
                Error::InvalidInput("SignedProperties must carry an id to be referenced".to_string())
            })?;
            references.push(crate::dsig::new_reference(
                &format!("#{}", sp_id),
                digest_algorithm,
                &[c14n_algorithm],
                Some(crate::SIGNED_PROPERTIES_TYPE),
                None,
            )?);
        }

        let signed_info = crate::dsig::new_signed_info(c14n_algorithm, signing_algorithm, references)?;
        Ok(XadesSignature::new(
            id,
            signed_info,
            key_info,
            qualifying_properties,
            other_objects,
        ))
    }

    pub fn new_key_info(&self, certs: &[X509]) -> Result<proto::ds::KeyInfo> {
        crate::dsig::new_x509_key_info(certs)
    }

    pub fn new_qualifying_properties(
        &self,
        target: &str,
        signed: Option<SignedProperties>,
        unsigned: Option<UnsignedProperties>,
    ) -> Result<QualifyingProperties> {
        QualifyingProperties::new(None, target, signed, unsigned)
    }

    pub fn new_signed_properties(
        &self,
        id: &str,
        signature_properties: Option<SignedSignatureProperties>,
        data_object_properties: Option<SignedDataObjectProperties>,
    ) -> Result<SignedProperties> {
        if id.is_empty() {
            return Err(Error::InvalidInput(
                "SignedProperties needs an id".to_string(),
            ));
        }
        Ok(SignedProperties::new(
            Some(id),
            signature_properties,
            data_object_properties,
        ))
    }

    pub fn new_signed_signature_properties(
        &self,
        signing_time: Option<DateTime<Utc>>,
        signing_certificate: Option<SigningCertificate>,
        policy: Option<SignaturePolicyIdentifier>,
        production_place: Option<SignatureProductionPlace>,
        signer_role: Option<SignerRole>,
        extensions: Vec<ForeignNode>,
    ) -> Result<SignedSignatureProperties> {
        if let Some(c) = &signing_certificate {
            self.check_dialect("SigningCertificate", c.dialect())?;
        }
        if let Some(p) = &production_place {
            self.check_dialect("SignatureProductionPlace", p.dialect())?;
        }
        if let Some(r) = &signer_role {
            self.check_dialect("SignerRole", r.dialect())?;
        }
        SignedSignatureProperties::new(
            None,
            signing_time,
            signing_certificate,
            policy,
            production_place,
            signer_role,
            extensions,
        )
    }

    pub fn new_signed_data_object_properties(
        &self,
        formats: Vec<DataObjectFormat>,
        commitments: Vec<CommitmentTypeIndication>,
    ) -> SignedDataObjectProperties {
        SignedDataObjectProperties::new(None, formats, commitments)
    }

    /// `SigningCertificate` (TS 101 903) or `SigningCertificateV2` (EN 319 132)
    /// identifying every certificate in `certs`, in order.
    pub fn new_signing_certificate(
        &self,
        certs: &[X509],
        digest_algorithm: &str,
    ) -> Result<SigningCertificate> {
        SigningCertificate::from_certificates(self.dialect, certs, digest_algorithm)
    }

    pub fn new_signature_policy_implied(&self) -> SignaturePolicyIdentifier {
        SignaturePolicyIdentifier::Implied
    }

    pub fn new_signature_policy_identifier(
        &self,
        policy_id: SigPolicyId,
        transforms: &[&str],
        digest_algorithm: &str,
        policy_hash: Vec<u8>,
        qualifiers: Vec<SigPolicyQualifier>,
    ) -> Result<SignaturePolicyIdentifier> {
        let transforms = transforms
            .iter()
            .map(|t| crate::dsig::new_transform(t).map(|t| t.algorithm))
            .collect::<Result<Vec<_>>>()?;
        Ok(SignaturePolicyIdentifier::Explicit(SignaturePolicyId::new(
            policy_id,
            transforms,
            SigPolicyHash::new(digest_algorithm, policy_hash)?,
            qualifiers,
        )))
    }

    pub fn new_sig_policy_qualifier(&self, content: Vec<ForeignNode>) -> SigPolicyQualifier {
        SigPolicyQualifier::new(content)
    }

    pub fn new_signature_production_place(
        &self,
        city: Option<&str>,
        street_address: Option<&str>,
        postal_code: Option<&str>,
        state_or_province: Option<&str>,
        country_name: Option<&str>,
    ) -> Result<SignatureProductionPlace> {
        let street_address = non_empty(street_address);
        if street_address.is_some() {
            self.require_v2("StreetAddress")?;
        }
        Ok(SignatureProductionPlace::new(
            self.dialect,
            PostalAddress {
                city: non_empty(city),
                street_address,
                state_or_province: non_empty(state_or_province),
                postal_code: non_empty(postal_code),
                country_name: non_empty(country_name),
            },
        ))
    }

    pub fn new_signer_role(
        &self,
        claimed: Vec<ClaimedRole>,
        certified: Vec<CertifiedRole>,
        assertions: Vec<SignedAssertion>,
    ) -> Result<SignerRole> {
        SignerRole::new(self.dialect, claimed, certified, assertions)
    }

    pub fn new_claimed_role(&self, content: Vec<ForeignNode>) -> ClaimedRole {
        ClaimedRole::new(content)
    }

    /// A certified role holding the DER encoding of `certificate`.
    pub fn new_certified_role(
        &self,
        id: Option<&str>,
        certificate: &X509Ref,
    ) -> Result<CertifiedRole> {
        let der = certificate
            .to_der()
            .map_err(|e| Error::CertificateEncoding(format!("unable to DER encode certificate: {}", e)))?;
        Ok(match self.dialect {
            Dialect::Ts101903 => {
                CertifiedRole::V1(CertifiedRoleV1::new(id, der, Some(Encoding::Der)))
            }
            Dialect::En319132 => CertifiedRole::V2(CertifiedRoleV2::X509AttributeCertificate(
                X509AttributeCertificate::new(id, der, Some(Encoding::Der)),
            )),
        })
    }

    /// A certified role backed by some other kind of attribute certificate.
    pub fn new_other_certified_role(&self, content: Vec<ForeignNode>) -> Result<CertifiedRole> {
        self.require_v2("OtherAttributeCertificate")?;
        Ok(CertifiedRole::V2(CertifiedRoleV2::OtherAttributeCertificate(
            OtherAttributeCertificate::new(content),
        )))
    }

    pub fn new_signed_assertion(&self, content: Vec<ForeignNode>) -> Result<SignedAssertion> {
        self.require_v2("SignedAssertion")?;
        Ok(SignedAssertion::new(content))
    }

    pub fn new_data_object_format(
        &self,
        object_reference: &str,
        description: Option<&str>,
        object_identifier: Option<ObjectIdentifier>,
        mime_type: Option<&str>,
        encoding: Option<&str>,
    ) -> Result<DataObjectFormat> {
        DataObjectFormat::new(
            object_reference,
            description,
            object_identifier,
            mime_type,
            encoding,
        )
    }

    /// Without `object_references` the commitment covers all signed data objects.
    pub fn new_commitment_type_indication(
        &self,
        type_id: CommitmentTypeId,
        object_references: Vec<String>,
        qualifiers: Vec<CommitmentTypeQualifier>,
    ) -> CommitmentTypeIndication {
        CommitmentTypeIndication::new(type_id, object_references, qualifiers)
    }

    pub fn new_commitment_type_qualifier(&self, content: Vec<ForeignNode>) -> CommitmentTypeQualifier {
        CommitmentTypeQualifier::new(content)
    }

    pub fn new_unsigned_properties(
        &self,
        id: Option<&str>,
        signature_properties: Option<UnsignedSignatureProperties>,
        data_object_properties: Option<UnsignedDataObjectProperties>,
    ) -> UnsignedProperties {
        UnsignedProperties::new(id, signature_properties, data_object_properties)
    }

    pub fn new_unsigned_signature_properties(
        &self,
        id: Option<&str>,
        policy_store: Option<SignaturePolicyStore>,
    ) -> UnsignedSignatureProperties {
        UnsignedSignatureProperties::new(id, policy_store)
    }

    pub fn new_unsigned_data_object_properties(
        &self,
        id: Option<&str>,
        properties: Vec<UnsignedDataObjectProperty>,
    ) -> UnsignedDataObjectProperties {
        UnsignedDataObjectProperties::new(id, properties)
    }

    pub fn new_unsigned_data_object_property(
        &self,
        content: Vec<ForeignNode>,
    ) -> UnsignedDataObjectProperty {
        UnsignedDataObjectProperty::new(content)
    }

    /// A policy store embedding the policy document itself.
    pub fn new_signature_policy_store(
        &self,
        id: Option<&str>,
        specification: SpDocSpecification,
        policy_document: Vec<u8>,
    ) -> Result<SignaturePolicyStore> {
        self.require_v2("SignaturePolicyStore")?;
        Ok(SignaturePolicyStore::new(
            id,
            specification,
            SignaturePolicyDocument::Content(policy_document),
        ))
    }

    /// A policy store pointing at a local copy of the policy document.
    pub fn new_signature_policy_store_reference(
        &self,
        id: Option<&str>,
        specification: SpDocSpecification,
        local_uri: &str,
    ) -> Result<SignaturePolicyStore> {
        self.require_v2("SignaturePolicyStore")?;
        if local_uri.is_empty() {
            return Err(Error::InvalidInput(
                "a policy store reference needs a URI".to_string(),
            ));
        }
        Ok(SignaturePolicyStore::new(
            id,
            specification,
            SignaturePolicyDocument::LocalUri(local_uri.to_string()),
        ))
    }

    /// An `ObjectIdentifierType` element; the element name is picked by `N`,
    /// e.g. `names::CommitmentTypeId`.
    pub fn new_object_identifier<N: ElementName>(
        &self,
        identifier: &str,
        qualifier: Option<Qualifier>,
        description: Option<&str>,
        documentation_references: Vec<String>,
    ) -> Result<ObjectIdentifierType<N>> {
        ObjectIdentifierType::new(identifier, qualifier, description, documentation_references)
    }

    pub fn new_include(&self, uri: &str, referenced_data: Option<bool>) -> Result<Include> {
        Include::new(uri, referenced_data)
    }

    pub fn new_reference_info(
        &self,
        id: Option<&str>,
        uri: Option<&str>,
        digest_algorithm: &str,
        digest: Vec<u8>,
    ) -> Result<ReferenceInfo> {
        ReferenceInfo::new(id, uri, digest_algorithm, digest)
    }

    pub fn new_encapsulated_timestamp(
        &self,
        id: Option<&str>,
        data: Vec<u8>,
        encoding: Option<Encoding>,
    ) -> EncapsulatedTimeStamp {
        EncapsulatedTimeStamp::new(id, data, encoding)
    }

    pub fn new_xml_timestamp(&self, content: Vec<ForeignNode>) -> XmlTimeStamp {
        XmlTimeStamp::new(content)
    }

    pub fn new_xades_timestamp(
        &self,
        id: Option<&str>,
        includes: Vec<Include>,
        reference_infos: Vec<ReferenceInfo>,
        c14n_method: Option<&str>,
        tokens: Vec<TimeStampToken>,
    ) -> Result<XadesTimeStamp> {
        XadesTimeStamp::new(id, includes, reference_infos, c14n_method, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{key_and_certificate, marshal, outline};

    const V1: XadesFactory = XadesFactory {
        dialect: Dialect::Ts101903,
    };
    const V2: XadesFactory = XadesFactory {
        dialect: Dialect::En319132,
    };

    fn doc_spec() -> SpDocSpecification {
        V2.new_object_identifier("urn:oid:1.2.3", None, None, vec![])
            .unwrap()
    }

    #[test]
    fn defaults_to_en_319_132() {
        assert_eq!(XadesFactory::default().dialect(), Dialect::En319132);
        assert_eq!(XadesFactory::new(Dialect::Ts101903), V1);
    }

    #[test]
    fn v2_only_features_fail_on_v1() {
        let node = ForeignNode::text("x");
        for result in [
            V1.new_signed_assertion(vec![node.clone()]).map(|_| ()),
            V1.new_other_certified_role(vec![node.clone()]).map(|_| ()),
            V1.new_signature_production_place(Some("Utrecht"), Some("Main 1"), None, None, None)
                .map(|_| ()),
            V1.new_signature_policy_store(None, doc_spec(), b"policy".to_vec()).map(|_| ()),
            V1.new_signature_policy_store_reference(None, doc_spec(), "file:policy.pdf")
                .map(|_| ()),
        ] {
            assert!(matches!(result, Err(Error::UnsupportedFeature(_))));
        }

        assert!(V2.new_signed_assertion(vec![node.clone()]).is_ok());
        assert!(V2.new_other_certified_role(vec![node]).is_ok());
        assert!(V2.new_signature_policy_store(None, doc_spec(), b"policy".to_vec()).is_ok());
    }

    #[test]
    fn picks_variants_by_dialect() {
        let (_, cert) = key_and_certificate("Factory");

        let place = V1
            .new_signature_production_place(Some("Utrecht"), None, Some("3511"), None, Some("NL"))
            .unwrap();
        assert_eq!(place.dialect(), Dialect::Ts101903);
        assert_eq!(place.address().postal_code.as_deref(), Some("3511"));
        let place = V2
            .new_signature_production_place(Some("Utrecht"), Some("Main 1"), None, None, Some(""))
            .unwrap();
        assert_eq!(place.address().street_address.as_deref(), Some("Main 1"));
        assert_eq!(place.address().country_name, None);

        assert!(matches!(
            V1.new_certified_role(Some("r"), &cert).unwrap(),
            CertifiedRole::V1(_)
        ));
        assert!(matches!(
            V2.new_certified_role(None, &cert).unwrap(),
            CertifiedRole::V2(CertifiedRoleV2::X509AttributeCertificate(_))
        ));

        assert!(matches!(
            V1.new_signing_certificate(&[cert.clone()], crate::DIGEST_SHA256)
                .unwrap(),
            SigningCertificate::V1(_)
        ));
        assert!(matches!(
            V2.new_signing_certificate(&[cert], crate::DIGEST_SHA256).unwrap(),
            SigningCertificate::V2(_)
        ));
    }

    #[test]
    fn signing_certificate_needs_certificates() {
        assert!(matches!(
            V2.new_signing_certificate(&[], crate::DIGEST_SHA256),
            Err(Error::InvalidInput(_))
        ));
        let (_, cert) = key_and_certificate("Factory");
        assert!(matches!(
            V2.new_signing_certificate(&[cert], "urn:digest"),
            Err(Error::AlgorithmNotAvailable(_))
        ));
    }

    #[test]
    fn signed_signature_properties_reject_other_dialect() {
        let (_, cert) = key_and_certificate("Factory");
        let v1_cert = V1
            .new_signing_certificate(&[cert], crate::DIGEST_SHA256)
            .unwrap();
        assert!(matches!(
            V2.new_signed_signature_properties(None, Some(v1_cert.clone()), None, None, None, vec![]),
            Err(Error::UnsupportedFeature(_))
        ));
        let ssp = V1
            .new_signed_signature_properties(
                None,
                Some(v1_cert),
                Some(V1.new_signature_policy_implied()),
                None,
                Some(
                    V1.new_signer_role(vec![V1.new_claimed_role(vec![ForeignNode::text("CEO")])], vec![], vec![])
                        .unwrap(),
                ),
                vec![],
            )
            .unwrap();
        assert_eq!(ssp.dialect(), Some(Dialect::Ts101903));
    }

    #[test]
    fn explicit_policy_identifier() {
        let policy_id = V2
            .new_object_identifier("urn:oid:1.2.3.4", Some(Qualifier::OidAsUrn), None, vec![])
            .unwrap();
        let policy = V2
            .new_signature_policy_identifier(
                policy_id,
                &[crate::CANONICAL_1_0],
                crate::DIGEST_SHA256,
                vec![0; 32],
                vec![V2.new_sig_policy_qualifier(vec![ForeignNode::text("q")])],
            )
            .unwrap();
        assert!(!policy.is_implied());
        let lines = outline(&marshal(&policy));
        assert!(lines.contains(&format!(
            "<ds:Transform {{{}}} Algorithm={}>",
            crate::DSIG_NS,
            crate::CANONICAL_1_0
        )));

        let policy_id = V2
            .new_object_identifier::<names::SigPolicyId>("urn:oid:1", None, None, vec![])
            .unwrap();
        assert!(matches!(
            V2.new_signature_policy_identifier(policy_id, &["urn:xslt"], crate::DIGEST_SHA256, vec![], vec![]),
            Err(Error::AlgorithmNotAvailable(_))
        ));
    }

    fn qualifying_properties(target: &str, sp_id: Option<&str>) -> QualifyingProperties {
        let signed = sp_id.map(|id| {
            V2.new_signed_properties(
                id,
                Some(
                    V2.new_signed_signature_properties(None, None, None, None, None, vec![])
                        .unwrap(),
                ),
                None,
            )
            .unwrap()
        });
        V2.new_qualifying_properties(target, signed, None).unwrap()
    }

    fn document_reference() -> Vec<proto::ds::Reference> {
        vec![crate::dsig::new_reference(
            "",
            crate::DIGEST_SHA256,
            &[crate::TRANSFORM_ENVELOPED_SIGNATURE],
            None,
            None,
        )
        .unwrap()]
    }

    #[test]
    fn xades_signature_references_signed_properties() {
        let signature = V2
            .new_xades_signature(
                "sig-1",
                crate::CANONICAL_EXCLUSIVE_1_0,
                crate::DIGEST_SHA512,
                crate::SIGNATURE_RSA_SHA256,
                None,
                document_reference(),
                qualifying_properties("#sig-1", Some("SP-1")),
                vec![],
            )
            .unwrap();

        let references = &signature.signed_info().reference;
        assert_eq!(references.len(), 2);
        let sp = &references[1];
        assert_eq!(sp.uri.as_deref(), Some("#SP-1"));
        assert_eq!(sp.ref_type.as_deref(), Some(crate::SIGNED_PROPERTIES_TYPE));
        assert_eq!(sp.digest_method.algorithm, crate::DIGEST_SHA512);
        assert_eq!(
            sp.transforms.as_ref().unwrap().transforms[0].algorithm,
            crate::CANONICAL_EXCLUSIVE_1_0
        );
        assert!(!signature.is_signed());
    }

    #[test]
    fn xades_signature_input_checks() {
        let build = |id: &str, refs, qp| {
            V2.new_xades_signature(
                id,
                crate::CANONICAL_EXCLUSIVE_1_0,
                crate::DIGEST_SHA256,
                crate::SIGNATURE_RSA_SHA256,
                None,
                refs,
                qp,
                vec![],
            )
        };
        assert!(matches!(
            build("", document_reference(), qualifying_properties("#", Some("SP"))),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            build("s", vec![], qualifying_properties("#s", Some("SP"))),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            build("s", document_reference(), qualifying_properties("#other", Some("SP"))),
            Err(Error::InvalidInput(_))
        ));

        let unnamed = V2
            .new_qualifying_properties(
                "#s",
                Some(SignedProperties::new(None, None, None)),
                None,
            )
            .unwrap();
        assert!(matches!(
            build("s", document_reference(), unnamed),
            Err(Error::InvalidInput(_))
        ));

        let unsigned_only = build("s", document_reference(), qualifying_properties("#s", None)).unwrap();
        assert_eq!(unsigned_only.signed_info().reference.len(), 1);
    }

    #[test]
    fn timestamps_and_unsigned_properties() {
        let ts = V2
            .new_xades_timestamp(
                Some("ts"),
                vec![V2.new_include("#SV-sig", None).unwrap()],
                vec![],
                None,
                vec![TimeStampToken::Encapsulated(V2.new_encapsulated_timestamp(
                    None,
                    vec![1, 2],
                    Some(Encoding::Der),
                ))],
            )
            .unwrap();
        assert_eq!(ts.tokens().len(), 1);
        assert!(V2
            .new_reference_info(None, Some("#a"), "urn:nope", vec![])
            .is_err());

        let store = V2
            .new_signature_policy_store_reference(Some("store"), doc_spec(), "file:policy.xml")
            .unwrap();
        let unsigned = V2.new_unsigned_properties(
            None,
            Some(V2.new_unsigned_signature_properties(None, Some(store))),
            Some(V2.new_unsigned_data_object_properties(
                None,
                vec![V2.new_unsigned_data_object_property(vec![ForeignNode::text("p")])],
            )),
        );
        let lines = outline(&marshal(&unsigned));
        assert!(lines.contains(&format!(
            "<xades141:SignaturePolicyStore {{{}}} Id=store>",
            crate::XADES141_NS
        )));
        assert!(V2.new_signature_policy_store_reference(None, doc_spec(), "").is_err());
    }
}

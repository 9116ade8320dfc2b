use super::{
    ClaimedRole, CertifiedRoleV1, OtherAttributeCertificate, QName, SignedAssertion,
    X509AttributeCertificate, XadesElement,
};
use crate::context::MarshalContext;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::writer::XmlWriter;

/// `xades:CertifiedRole` of EN 319 132: wraps either an encapsulated X.509
/// attribute certificate or some other attribute certificate.
#[derive(Debug, Clone, PartialEq)]
pub enum CertifiedRoleV2 {
    X509AttributeCertificate(X509AttributeCertificate),
    OtherAttributeCertificate(OtherAttributeCertificate),
}

impl XadesElement for CertifiedRoleV2 {
    fn name(&self) -> QName {
        QName::xades("CertifiedRole")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        match self {
            CertifiedRoleV2::X509AttributeCertificate(c) => c.marshal(w, ds_prefix, ctx),
            CertifiedRoleV2::OtherAttributeCertificate(c) => c.marshal(w, ds_prefix, ctx),
        }
    }
}

/// A certified role of either dialect, as handed to the factory.
#[derive(Debug, Clone, PartialEq)]
pub enum CertifiedRole {
    V1(CertifiedRoleV1),
    V2(CertifiedRoleV2),
}

impl CertifiedRole {
    pub fn dialect(&self) -> Dialect {
        match self {
            CertifiedRole::V1(_) => Dialect::Ts101903,
            CertifiedRole::V2(_) => Dialect::En319132,
        }
    }
}

impl XadesElement for CertifiedRole {
    fn name(&self) -> QName {
        match self {
            CertifiedRole::V1(r) => r.name(),
            CertifiedRole::V2(r) => r.name(),
        }
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        match self {
            CertifiedRole::V1(r) => r.write_content(w, ns_prefix, ds_prefix, ctx),
            CertifiedRole::V2(r) => r.write_content(w, ns_prefix, ds_prefix, ctx),
        }
    }
}

/// `xades:SignerRole` (TS 101 903) or `xades:SignerRoleV2` (EN 319 132).
#[derive(Debug, Clone, PartialEq)]
pub enum SignerRole {
    V1 {
        claimed: Vec<ClaimedRole>,
        certified: Vec<CertifiedRoleV1>,
    },
    V2 {
        claimed: Vec<ClaimedRole>,
        certified: Vec<CertifiedRoleV2>,
        assertions: Vec<SignedAssertion>,
    },
}

impl SignerRole {
    /// Sorts `certified` into the dialect's variant. Signed assertions and
    /// non X.509 certified roles only exist in EN 319 132.
    pub(crate) fn new(
        dialect: Dialect,
        claimed: Vec<ClaimedRole>,
        certified: Vec<CertifiedRole>,
        assertions: Vec<SignedAssertion>,
    ) -> Result<Self> {
        if claimed.is_empty() && certified.is_empty() && assertions.is_empty() {
            return Err(Error::InvalidInput(
                "a signer role needs at least one claimed role, certified role or signed assertion"
                    .to_string(),
            ));
        }

        match dialect {
            Dialect::Ts101903 => {
                if !assertions.is_empty() {
                    return Err(Error::unsupported_in_v1("SignedAssertions"));
                }
                let certified = certified
                    .into_iter()
                    .map(|r| match r {
                        CertifiedRole::V1(r) => Ok(r),
                        CertifiedRole::V2(_) => Err(Error::unsupported_in_v1("CertifiedRoleV2")),
                    })
                    .collect::<Result<_>>()?;
                Ok(SignerRole::V1 { claimed, certified })
            }
            Dialect::En319132 => {
                let certified = certified
                    .into_iter()
                    .map(|r| match r {
                        CertifiedRole::V2(r) => Ok(r),
                        CertifiedRole::V1(_) => Err(Error::UnsupportedFeature(
                            "an EN 319 132 signer role needs EN 319 132 certified roles"
                                .to_string(),
                        )),
                    })
                    .collect::<Result<_>>()?;
                Ok(SignerRole::V2 {
                    claimed,
                    certified,
                    assertions,
                })
            }
        }
    }

    pub fn claimed_roles(&self) -> &[ClaimedRole] {
        match self {
            SignerRole::V1 { claimed, .. } | SignerRole::V2 { claimed, .. } => claimed,
        }
    }

    pub fn signed_assertions(&self) -> &[SignedAssertion] {
        match self {
            SignerRole::V1 { .. } => &[],
            SignerRole::V2 { assertions, .. } => assertions,
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            SignerRole::V1 { .. } => Dialect::Ts101903,
            SignerRole::V2 { .. } => Dialect::En319132,
        }
    }
}

impl XadesElement for SignerRole {
    fn name(&self) -> QName {
        match self {
            SignerRole::V1 { .. } => QName::xades("SignerRole"),
            SignerRole::V2 { .. } => QName::xades("SignerRoleV2"),
        }
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        match self {
            SignerRole::V1 { claimed, certified } => {
                super::write_list(w, ns_prefix, "ClaimedRoles", claimed, ds_prefix, ctx)?;
                super::write_list(w, ns_prefix, "CertifiedRoles", certified, ds_prefix, ctx)
            }
            SignerRole::V2 {
                claimed,
                certified,
                assertions,
            } => {
                super::write_list(w, ns_prefix, "ClaimedRoles", claimed, ds_prefix, ctx)?;
                super::write_list(w, ns_prefix, "CertifiedRolesV2", certified, ds_prefix, ctx)?;
                super::write_list(w, ns_prefix, "SignedAssertions", assertions, ds_prefix, ctx)
            }
        }
    }
}

//! The XAdES qualifying properties element model.
//!
//! Every element knows its qualified name and writes itself through an
//! [`XmlWriter`]. Elements are immutable values; equality is structural and,
//! because variants are distinct types or enum arms, never crosses element
//! kinds. Repeated children are plain `Vec`s, so an absent list and an empty
//! list are the same value and produce no output.
//!
//! Construction goes through [`crate::XadesFactory`], which selects the
//! variant matching the configured [`crate::Dialect`].

use crate::context::MarshalContext;
use crate::error::Result;
use crate::writer::XmlWriter;

mod any;
mod cert;
mod data_object;
mod digest;
mod oid;
mod pki;
mod place;
mod policy;
mod properties;
mod role;
mod timestamp;

pub use any::*;
pub use cert::*;
pub use data_object::*;
pub use digest::*;
pub use oid::*;
pub use pki::*;
pub use place::*;
pub use policy::*;
pub use properties::*;
pub use role::*;
pub use timestamp::*;

/// Namespace URI, local name and preferred prefix of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: &'static str,
    pub local_name: &'static str,
    pub prefix: &'static str,
}

impl QName {
    pub const fn xades(local_name: &'static str) -> Self {
        QName {
            namespace: crate::XADES_NS,
            local_name,
            prefix: crate::XADES_PREFIX,
        }
    }

    pub const fn xades141(local_name: &'static str) -> Self {
        QName {
            namespace: crate::XADES141_NS,
            local_name,
            prefix: crate::XADES141_PREFIX,
        }
    }
}

pub trait XadesElement {
    fn name(&self) -> QName;

    /// Writes attributes, then child elements, of an already opened element.
    /// `ns_prefix` is the prefix the element itself was opened with.
    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()>;

    fn marshal(&self, w: &mut dyn XmlWriter, ds_prefix: &str, ctx: &MarshalContext) -> Result<()> {
        let name = self.name();
        let prefix = ctx.namespace_prefix(name.namespace, name.prefix);
        w.write_start_element(prefix, name.local_name, name.namespace)?;
        self.write_content(w, prefix, ds_prefix, ctx)?;
        w.write_end_element()
    }
}

/// Fixes the qualified name of a generic element family member.
pub trait ElementName {
    const NAME: QName;
}

pub mod names {
    //! Marker types naming the members of the generic element families.

    use super::{ElementName, QName};

    macro_rules! element_names {
        ($($marker:ident => $qname:expr,)*) => {
            $(
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
                pub struct $marker;

                impl ElementName for $marker {
                    const NAME: QName = $qname;
                }
            )*
        };
    }

    element_names! {
        ClaimedRole => QName::xades("ClaimedRole"),
        SignedAssertion => QName::xades("SignedAssertion"),
        OtherAttributeCertificate => QName::xades("OtherAttributeCertificate"),
        CommitmentTypeQualifier => QName::xades("CommitmentTypeQualifier"),
        SigPolicyQualifier => QName::xades("SigPolicyQualifier"),
        XmlTimeStamp => QName::xades("XMLTimeStamp"),
        UnsignedDataObjectProperty => QName::xades("UnsignedDataObjectProperty"),
        CertDigest => QName::xades("CertDigest"),
        SigPolicyHash => QName::xades("SigPolicyHash"),
        EncapsulatedTimeStamp => QName::xades("EncapsulatedTimeStamp"),
        X509AttributeCertificate => QName::xades("X509AttributeCertificate"),
        CertifiedRole => QName::xades("CertifiedRole"),
        ObjectIdentifier => QName::xades("ObjectIdentifier"),
        CommitmentTypeId => QName::xades("CommitmentTypeId"),
        SigPolicyId => QName::xades("SigPolicyId"),
        SpDocSpecification => QName::xades141("SPDocSpecification"),
        XadesTimeStamp => QName::xades("XAdESTimeStamp"),
    }
}

pub(crate) fn write_id(w: &mut dyn XmlWriter, id: Option<&str>) -> Result<()> {
    match id.filter(|id| !id.is_empty()) {
        Some(id) => w.write_id_attribute("", None, "Id", id),
        None => Ok(()),
    }
}

/// Writes a text element unless `value` is absent or empty.
pub(crate) fn write_optional_text(
    w: &mut dyn XmlWriter,
    prefix: &str,
    namespace: &str,
    local_name: &str,
    value: Option<&str>,
) -> Result<()> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => w.write_text_element(prefix, local_name, namespace, v),
        None => Ok(()),
    }
}

/// Writes `<local_name>` holding every element of `items`, or nothing when
/// `items` is empty.
pub(crate) fn write_list<E: XadesElement>(
    w: &mut dyn XmlWriter,
    prefix: &str,
    local_name: &str,
    items: &[E],
    ds_prefix: &str,
    ctx: &MarshalContext,
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    w.write_start_element(prefix, local_name, crate::XADES_NS)?;
    for item in items {
        item.marshal(w, ds_prefix, ctx)?;
    }
    w.write_end_element()
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// `xsd:dateTime` rendering of a signing time, without fractional seconds.
pub fn format_signing_time(time: &chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn signing_time_has_no_fraction() {
        let t = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(format_signing_time(&t), "2024-03-01T12:30:05Z");
    }

    #[test]
    fn names_are_fixed_per_marker() {
        assert_eq!(names::SpDocSpecification::NAME.namespace, crate::XADES141_NS);
        assert_eq!(names::XmlTimeStamp::NAME.local_name, "XMLTimeStamp");
        assert_eq!(names::CertDigest::NAME.prefix, "xades");
    }
}

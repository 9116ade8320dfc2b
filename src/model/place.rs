use super::{QName, XadesElement};
use crate::context::MarshalContext;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::writer::XmlWriter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalAddress {
    pub city: Option<String>,
    pub street_address: Option<String>,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    pub country_name: Option<String>,
}

impl PostalAddress {
    pub fn is_empty(&self) -> bool {
        [
            &self.city,
            &self.street_address,
            &self.state_or_province,
            &self.postal_code,
            &self.country_name,
        ]
        .iter()
        .all(|v| v.as_deref().map_or(true, str::is_empty))
    }
}

/// Where the signature was produced. Only the EN 319 132 form carries a street address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureProductionPlace {
    V1(PostalAddress),
    V2(PostalAddress),
}

impl SignatureProductionPlace {
    pub(crate) fn new(dialect: Dialect, mut address: PostalAddress) -> Self {
        match dialect {
            Dialect::Ts101903 => {
                address.street_address = None;
                SignatureProductionPlace::V1(address)
            }
            Dialect::En319132 => SignatureProductionPlace::V2(address),
        }
    }

    pub fn address(&self) -> &PostalAddress {
        match self {
            SignatureProductionPlace::V1(a) | SignatureProductionPlace::V2(a) => a,
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            SignatureProductionPlace::V1(_) => Dialect::Ts101903,
            SignatureProductionPlace::V2(_) => Dialect::En319132,
        }
    }
}

impl XadesElement for SignatureProductionPlace {
    fn name(&self) -> QName {
        match self {
            SignatureProductionPlace::V1(_) => QName::xades("SignatureProductionPlace"),
            SignatureProductionPlace::V2(_) => QName::xades("SignatureProductionPlaceV2"),
        }
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        _ds_prefix: &str,
        _ctx: &MarshalContext,
    ) -> Result<()> {
        let a = self.address();
        let street = match self {
            SignatureProductionPlace::V1(_) => None,
            SignatureProductionPlace::V2(_) => a.street_address.as_deref(),
        };
        let children = [
            ("City", a.city.as_deref()),
            ("StreetAddress", street),
            ("StateOrProvince", a.state_or_province.as_deref()),
            ("PostalCode", a.postal_code.as_deref()),
            ("CountryName", a.country_name.as_deref()),
        ];
        for (local_name, value) in children {
            super::write_optional_text(w, ns_prefix, crate::XADES_NS, local_name, value)?;
        }
        Ok(())
    }
}

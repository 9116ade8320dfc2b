/// The XAdES standard a signature is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// ETSI TS 101 903 V1.4.1
    #[serde(rename = "TS_101_903_V141")]
    Ts101903,
    /// ETSI EN 319 132 V1.1.1
    #[default]
    #[serde(rename = "EN_319_132_V111")]
    En319132,
}

impl Dialect {
    pub fn is_v1(self) -> bool {
        self == Dialect::Ts101903
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Dialect::Ts101903 => "ETSI TS 101 903 V1.4.1",
            Dialect::En319132 => "ETSI EN 319 132 V1.1.1",
        })
    }
}

fn default_c14n_algorithm() -> String {
    crate::CANONICAL_EXCLUSIVE_1_0.to_string()
}

fn default_digest_algorithm() -> String {
    crate::DIGEST_SHA256.to_string()
}

fn default_signing_algorithm() -> String {
    crate::SIGNATURE_RSA_SHA256.to_string()
}

/// Dialect and algorithms used when building a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSettings {
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default = "default_c14n_algorithm")]
    pub c14n_algorithm: String,
    #[serde(default = "default_digest_algorithm")]
    pub digest_algorithm: String,
    #[serde(default = "default_signing_algorithm")]
    pub signing_algorithm: String,
}

impl Default for SignatureSettings {
    fn default() -> Self {
        SignatureSettings {
            dialect: Dialect::default(),
            c14n_algorithm: default_c14n_algorithm(),
            digest_algorithm: default_digest_algorithm(),
            signing_algorithm: default_signing_algorithm(),
        }
    }
}

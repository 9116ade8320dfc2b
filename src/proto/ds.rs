#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OuterSignedInfo {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:SignedInfo")]
    pub signed_info: SignedInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OuterKeyInfo {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:KeyInfo")]
    pub key_info: KeyInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SignedInfo {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:CanonicalizationMethod")]
    pub canonicalization_method: CanonicalizationMethod,
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:SignatureMethod")]
    pub signature_method: SignatureMethod,
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:Reference")]
    pub reference: Vec<Reference>,
    #[serde(rename = "$attr:Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CanonicalizationMethod {
    #[serde(rename = "$attr:Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SignatureMethod {
    #[serde(rename = "$attr:Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KeyInfo {
    #[serde(rename = "$value")]
    pub keys_info: Vec<KeyInfoType>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reference {
    #[serde(
        rename = "{http://www.w3.org/2000/09/xmldsig#}ds:Transforms",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transforms: Option<Transforms>,
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:DigestMethod")]
    pub digest_method: DigestMethod,
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:DigestValue")]
    pub digest_value: String,
    #[serde(rename = "$attr:Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$attr:URI", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(
        rename = "$attr:Type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ref_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transforms {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:Transform")]
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transform {
    #[serde(rename = "$attr:Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DigestMethod {
    #[serde(rename = "$attr:Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum KeyInfoType {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:KeyName")]
    KeyName(String),
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:X509Data")]
    X509Data(X509Data),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct X509Data {
    #[serde(rename = "$value")]
    pub x509_data: Vec<X509Datum>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum X509Datum {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:X509IssuerSerial")]
    IssuerSerial(X509IssuerSerial),
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:X509SubjectName")]
    SubjectName(String),
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:X509Certificate")]
    Certificate(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct X509IssuerSerial {
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:X509IssuerName")]
    pub issuer_name: String,
    #[serde(rename = "{http://www.w3.org/2000/09/xmldsig#}ds:X509SerialNumber")]
    pub serial_number: String,
}

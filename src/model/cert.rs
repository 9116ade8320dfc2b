use super::{CertDigest, QName, XadesElement};
use crate::context::MarshalContext;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::writer::XmlWriter;
use openssl::x509::{X509Ref, X509};

fn encoding_error(what: &str, e: openssl::error::ErrorStack) -> Error {
    Error::CertificateEncoding(format!("{}: {}", what, e))
}

fn certificate_digest(cert: &X509Ref, digest_algorithm: &str) -> Result<CertDigest> {
    crate::dsig::digest_algorithm(digest_algorithm)?;
    let der = cert
        .to_der()
        .map_err(|e| encoding_error("certificate is not DER encodable", e))?;
    CertDigest::compute(digest_algorithm, &der)
}

/// Two's complement of a big-endian magnitude, as `write_bigint_bytes` takes
/// negative values.
fn twos_complement(magnitude: &[u8]) -> Vec<u8> {
    let mut out = magnitude.iter().map(|b| !b).collect::<Vec<_>>();
    for b in out.iter_mut().rev() {
        let (sum, carry) = b.overflowing_add(1);
        *b = sum;
        if !carry {
            break;
        }
    }
    out
}

/// DER encoding of
///
/// ```text
/// IssuerSerial ::= SEQUENCE {
///     issuer   GeneralNames,            -- one directoryName [4]
///     serial   CertificateSerialNumber }
/// ```
pub fn issuer_serial_der(cert: &X509Ref) -> Result<Vec<u8>> {
    let issuer = cert
        .issuer_name()
        .to_der()
        .map_err(|e| encoding_error("issuer name is not DER encodable", e))?;
    let serial = cert
        .serial_number()
        .to_bn()
        .map_err(|e| encoding_error("unreadable serial number", e))?;
    let positive = !serial.is_negative();
    let serial = if positive {
        serial.to_vec()
    } else {
        twos_complement(&serial.to_vec())
    };

    Ok(yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_sequence(|w| {
                w.next()
                    .write_tagged(yasna::Tag::context(4), |w| w.write_der(&issuer));
            });
            w.next().write_bigint_bytes(&serial, positive);
        })
    }))
}

/// `xades:Cert` of a TS 101 903 signature: issuer and serial as plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertIdV1 {
    cert_digest: CertDigest,
    issuer_name: String,
    serial_number: String,
}

impl CertIdV1 {
    pub(crate) fn from_certificate(cert: &X509Ref, digest_algorithm: &str) -> Result<Self> {
        let cert_digest = certificate_digest(cert, digest_algorithm)?;
        let issuer_name = crate::x509_name_to_string(cert.issuer_name())?;
        let serial_number = cert
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_dec_str())
            .map_err(|e| encoding_error("unreadable serial number", e))?
            .to_string();

        Ok(CertIdV1 {
            cert_digest,
            issuer_name,
            serial_number,
        })
    }

    pub fn cert_digest(&self) -> &CertDigest {
        &self.cert_digest
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }
}

impl XadesElement for CertIdV1 {
    fn name(&self) -> QName {
        QName::xades("Cert")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        self.cert_digest.marshal(w, ds_prefix, ctx)?;
        w.write_start_element(ns_prefix, "IssuerSerial", crate::XADES_NS)?;
        w.write_text_element(ds_prefix, "X509IssuerName", crate::DSIG_NS, &self.issuer_name)?;
        w.write_text_element(
            ds_prefix,
            "X509SerialNumber",
            crate::DSIG_NS,
            &self.serial_number,
        )?;
        w.write_end_element()
    }
}

/// `xades:Cert` of an EN 319 132 signature: issuer and serial as one DER blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertIdV2 {
    cert_digest: CertDigest,
    issuer_serial: Vec<u8>,
}

impl CertIdV2 {
    pub(crate) fn from_certificate(cert: &X509Ref, digest_algorithm: &str) -> Result<Self> {
        Ok(CertIdV2 {
            cert_digest: certificate_digest(cert, digest_algorithm)?,
            issuer_serial: issuer_serial_der(cert)?,
        })
    }

    pub fn cert_digest(&self) -> &CertDigest {
        &self.cert_digest
    }

    pub fn issuer_serial(&self) -> &[u8] {
        &self.issuer_serial
    }
}

impl XadesElement for CertIdV2 {
    fn name(&self) -> QName {
        QName::xades("Cert")
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        self.cert_digest.marshal(w, ds_prefix, ctx)?;
        w.write_text_element(
            ns_prefix,
            "IssuerSerialV2",
            crate::XADES_NS,
            &base64::encode(&self.issuer_serial),
        )
    }
}

/// `xades:SigningCertificate` (TS 101 903) or `xades:SigningCertificateV2` (EN 319 132).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningCertificate {
    V1(Vec<CertIdV1>),
    V2(Vec<CertIdV2>),
}

impl SigningCertificate {
    pub(crate) fn from_certificates(
        dialect: Dialect,
        certs: &[X509],
        digest_algorithm: &str,
    ) -> Result<Self> {
        if certs.is_empty() {
            return Err(Error::InvalidInput(
                "a signing certificate element needs at least one certificate".to_string(),
            ));
        }
        crate::dsig::digest_algorithm(digest_algorithm)?;

        Ok(match dialect {
            Dialect::Ts101903 => SigningCertificate::V1(
                certs
                    .iter()
                    .map(|c| CertIdV1::from_certificate(c, digest_algorithm))
                    .collect::<Result<_>>()?,
            ),
            Dialect::En319132 => SigningCertificate::V2(
                certs
                    .iter()
                    .map(|c| CertIdV2::from_certificate(c, digest_algorithm))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            SigningCertificate::V1(_) => Dialect::Ts101903,
            SigningCertificate::V2(_) => Dialect::En319132,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SigningCertificate::V1(certs) => certs.len(),
            SigningCertificate::V2(certs) => certs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl XadesElement for SigningCertificate {
    fn name(&self) -> QName {
        match self {
            SigningCertificate::V1(_) => QName::xades("SigningCertificate"),
            SigningCertificate::V2(_) => QName::xades("SigningCertificateV2"),
        }
    }

    fn write_content(
        &self,
        w: &mut dyn XmlWriter,
        _ns_prefix: &str,
        ds_prefix: &str,
        ctx: &MarshalContext,
    ) -> Result<()> {
        match self {
            SigningCertificate::V1(certs) => {
                for c in certs {
                    c.marshal(w, ds_prefix, ctx)?;
                }
            }
            SigningCertificate::V2(certs) => {
                for c in certs {
                    c.marshal(w, ds_prefix, ctx)?;
                }
            }
        }
        Ok(())
    }
}

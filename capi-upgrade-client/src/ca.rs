//! Decoding and validation of cluster CA material.
//!
//! CA material is stored as two entries, `cert` and `key`, each the base64
//! encoding of a PEM block. Both halves are decoded and structurally validated
//! before a [`CaMaterial`] exists; trust chains and validity periods are not checked.
//!
//! Accepted private keys are unencrypted `RSA PRIVATE KEY` (PKCS#1),
//! `EC PRIVATE KEY` (SEC1) and `PRIVATE KEY` (PKCS#8, any algorithm openssl parses,
//! e.g. RSA, EC or Ed25519) blocks.
use std::fmt;

use base64::Engine;
use openssl::{pkey::PKey, x509::X509};
use pem::{EncodeConfig, LineEnding, Pem};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const PRIVATE_KEY_TAGS: [&str; 3] = ["PRIVATE KEY", "RSA PRIVATE KEY", "EC PRIVATE KEY"];

/// Which half of the CA material an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaHalf {
    /// The CA certificate
    Certificate,
    /// The CA private key
    Key,
}

impl fmt::Display for CaHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaHalf::Certificate => f.write_str("certificate"),
            CaHalf::Key => f.write_str("private key"),
        }
    }
}

/// Possible errors when decoding CA material
#[derive(Error, Debug)]
pub enum CaError {
    /// The entry is not valid base64
    #[error("failed to decode base64 of CA {half}: {source}")]
    DecodeBase64 {
        /// The failing half
        half: CaHalf,
        /// Decoder failure
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded entry holds no PEM block
    #[error("failed to parse PEM of CA {half}: {source}")]
    ParsePem {
        /// The failing half
        half: CaHalf,
        /// Parser failure
        #[source]
        source: pem::PemError,
    },

    /// The PEM block has the wrong label
    #[error("unexpected PEM block {tag:?} for CA {half}")]
    UnexpectedPemTag {
        /// The failing half
        half: CaHalf,
        /// Label found on the block
        tag: String,
    },

    /// The certificate block is not a valid X.509 certificate
    #[error("invalid CA certificate: {0}")]
    InvalidCertificate(#[source] openssl::error::ErrorStack),

    /// The key block is not a valid private key
    #[error("invalid CA private key: {0}")]
    InvalidPrivateKey(#[source] openssl::error::ErrorStack),
}

impl CaError {
    /// The half of the material that failed.
    pub fn half(&self) -> CaHalf {
        match self {
            CaError::DecodeBase64 { half, .. }
            | CaError::ParsePem { half, .. }
            | CaError::UnexpectedPemTag { half, .. } => *half,
            CaError::InvalidCertificate(_) => CaHalf::Certificate,
            CaError::InvalidPrivateKey(_) => CaHalf::Key,
        }
    }
}

/// A validated CA certificate and private key.
///
/// Only constructed by [`CaMaterial::decode`], so holding one means both
/// halves parsed. The key is kept as a secret and redacted from `Debug`.
#[derive(Clone, Debug)]
pub struct CaMaterial {
    certificate: Pem,
    key: SecretString,
}

impl CaMaterial {
    /// Decode base64-transported PEM certificate and key entries.
    ///
    /// ASCII whitespace inside the base64 text (line wrapping, trailing
    /// newlines) is ignored.
    pub fn decode(cert: &[u8], key: &[u8]) -> Result<Self, CaError> {
        let cert_pem = decode_base64(cert, CaHalf::Certificate)?;
        let key_pem = decode_base64(key, CaHalf::Key)?;
        Self::from_pem(&cert_pem, &key_pem)
    }

    /// Validate PEM encoded certificate and key.
    pub fn from_pem(cert: &[u8], key: &[u8]) -> Result<Self, CaError> {
        let certificate = parse_block(cert, CaHalf::Certificate, &[CERTIFICATE_TAG])?;
        X509::from_der(certificate.contents()).map_err(CaError::InvalidCertificate)?;

        let key = parse_block(key, CaHalf::Key, &PRIVATE_KEY_TAGS)?;
        PKey::private_key_from_der(key.contents()).map_err(CaError::InvalidPrivateKey)?;

        Ok(Self {
            certificate,
            key: SecretString::from(encode(&key)),
        })
    }

    /// DER bytes of the certificate.
    pub fn certificate_der(&self) -> &[u8] {
        self.certificate.contents()
    }

    /// The certificate as a PEM block.
    pub fn certificate_pem(&self) -> String {
        encode(&self.certificate)
    }

    /// The private key as a PEM block.
    pub fn key_pem(&self) -> &SecretString {
        &self.key
    }
}

impl PartialEq for CaMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.certificate.contents() == other.certificate.contents()
            && self.key.expose_secret() == other.key.expose_secret()
    }
}

fn decode_base64(data: &[u8], half: CaHalf) -> Result<Vec<u8>, CaError> {
    let compact = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect::<Vec<_>>();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|source| CaError::DecodeBase64 { half, source })
}

fn parse_block(data: &[u8], half: CaHalf, tags: &[&str]) -> Result<Pem, CaError> {
    let block = pem::parse(data).map_err(|source| CaError::ParsePem { half, source })?;
    if !tags.contains(&block.tag()) {
        return Err(CaError::UnexpectedPemTag {
            half,
            tag: block.tag().to_owned(),
        });
    }
    Ok(block)
}

fn encode(block: &Pem) -> String {
    pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

//! RS256 key material for token signing and verification

use std::fs;
use std::path::{Path, PathBuf};

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::errors::ConfigError;

const PRIVATE: &str = "private";
const PUBLIC: &str = "public";

/// Loaded and cross-checked RSA key pair
///
/// Parsing happens once, here. The public key must belong to the private
/// key, so a signer can never mint tokens its own verifier rejects.
#[derive(Clone)]
pub struct RsaKeyPair {
    /// Private key for signing JWTs
    encoding_key: EncodingKey,
    /// Public key for verifying JWTs
    decoding_key: DecodingKey,
    /// Modulus size in bits
    key_bits: usize,
    /// Where the keys came from, for diagnostics
    private_key_path: Option<PathBuf>,
    public_key_path: Option<PathBuf>,
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("key_bits", &self.key_bits)
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .finish()
    }
}

impl RsaKeyPair {
    /// Loads a key pair from PEM files
    ///
    /// # Arguments
    ///
    /// * `private_key_path` - PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) PEM
    /// * `public_key_path` - PKIX (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM
    ///
    /// # Returns
    ///
    /// * `Ok(RsaKeyPair)` - Keys parsed and matching
    /// * `Err(ConfigError)` - Empty path, unreadable file, bad PEM or mismatched pair
    pub fn from_files<P: AsRef<Path>>(
        private_key_path: P,
        public_key_path: P,
    ) -> Result<Self, ConfigError> {
        let private_key_path = private_key_path.as_ref();
        let public_key_path = public_key_path.as_ref();

        let private_pem = read_pem(PRIVATE, private_key_path)?;
        let public_pem = read_pem(PUBLIC, public_key_path)?;

        let mut pair = Self::from_pem(&private_pem, &public_pem)?;
        pair.private_key_path = Some(private_key_path.to_path_buf());
        pair.public_key_path = Some(public_key_path.to_path_buf());
        Ok(pair)
    }

    /// Loads a key pair from PEM bytes already resolved by a secret provider
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, ConfigError> {
        let private_key = parse_private_key(private_pem)?;
        let public_key = parse_public_key(public_pem)?;

        if RsaPublicKey::from(&private_key) != public_key {
            return Err(ConfigError::KeyMismatch);
        }

        let encoding_key =
            EncodingKey::from_rsa_pem(private_pem).map_err(|e| parse_error(PRIVATE, e))?;
        let decoding_key =
            DecodingKey::from_rsa_pem(public_pem).map_err(|e| parse_error(PUBLIC, e))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            key_bits: public_key.n().bits(),
            private_key_path: None,
            public_key_path: None,
        })
    }

    /// Returns the encoding key for signing JWTs
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the decoding key for verifying JWTs
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Modulus size in bits
    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Fails with [`ConfigError::WeakKey`] below `min` bits
    pub fn ensure_strength(&self, min: usize) -> Result<(), ConfigError> {
        if self.key_bits < min {
            return Err(ConfigError::WeakKey {
                bits: self.key_bits,
                min,
            });
        }
        Ok(())
    }
}

fn read_pem(which: &str, path: &Path) -> Result<Vec<u8>, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::MissingKeyPath {
            which: which.to_string(),
        });
    }
    fs::read(path).map_err(|e| ConfigError::KeyRead {
        which: which.to_string(),
        message: format!("{}: {}", path.display(), e),
    })
}

fn pem_str<'a>(which: &str, pem: &'a [u8]) -> Result<&'a str, ConfigError> {
    std::str::from_utf8(pem).map_err(|e| parse_error(which, e))
}

fn parse_private_key(pem: &[u8]) -> Result<RsaPrivateKey, ConfigError> {
    let pem = pem_str(PRIVATE, pem)?;
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| parse_error(PRIVATE, e))
}

fn parse_public_key(pem: &[u8]) -> Result<RsaPublicKey, ConfigError> {
    let pem = pem_str(PUBLIC, pem)?;
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| parse_error(PUBLIC, e))
}

fn parse_error(which: &str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::KeyParse {
        which: which.to_string(),
        message: e.to_string(),
    }
}

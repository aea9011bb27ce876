use crate::error::{PwmError, Result};
use hmac::digest::{Digest, KeyInit};
use hmac::{Hmac, Mac};
#[cfg(feature = "legacy")]
use md4::Md4;
use md5::Md5;
#[cfg(feature = "legacy")]
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md5,
    HmacMd5,
    Sha1,
    HmacSha1,
    Sha256,
    HmacSha256,
    Md4,
    HmacMd4,
    Rmd160,
    HmacRmd160,
}

static AVAILABLE: OnceLock<Vec<Algorithm>> = OnceLock::new();

impl Algorithm {
    pub const ALL: [Algorithm; 10] = [
        Algorithm::Md5,
        Algorithm::HmacMd5,
        Algorithm::Sha1,
        Algorithm::HmacSha1,
        Algorithm::Sha256,
        Algorithm::HmacSha256,
        Algorithm::Md4,
        Algorithm::HmacMd4,
        Algorithm::Rmd160,
        Algorithm::HmacRmd160,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::HmacMd5 => "hmac-md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::HmacSha1 => "hmac-sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::HmacSha256 => "hmac-sha256",
            Algorithm::Md4 => "md4",
            Algorithm::HmacMd4 => "hmac-md4",
            Algorithm::Rmd160 => "rmd160",
            Algorithm::HmacRmd160 => "hmac-rmd160",
        }
    }

    pub const fn is_hmac(self) -> bool {
        matches!(
            self,
            Algorithm::HmacMd5
                | Algorithm::HmacSha1
                | Algorithm::HmacSha256
                | Algorithm::HmacMd4
                | Algorithm::HmacRmd160
        )
    }

    pub const fn digest_len(self) -> usize {
        match self {
            Algorithm::Md5 | Algorithm::HmacMd5 | Algorithm::Md4 | Algorithm::HmacMd4 => 16,
            Algorithm::Sha1 | Algorithm::HmacSha1 | Algorithm::Rmd160 | Algorithm::HmacRmd160 => 20,
            Algorithm::Sha256 | Algorithm::HmacSha256 => 32,
        }
    }

    const fn is_legacy(self) -> bool {
        matches!(
            self,
            Algorithm::Md4 | Algorithm::HmacMd4 | Algorithm::Rmd160 | Algorithm::HmacRmd160
        )
    }

    /// Whether the primitive behind this algorithm was compiled in.
    pub const fn is_available(self) -> bool {
        !self.is_legacy() || cfg!(feature = "legacy")
    }
}

pub fn available_algorithms() -> &'static [Algorithm] {
    AVAILABLE.get_or_init(|| {
        Algorithm::ALL
            .into_iter()
            .filter(|alg| alg.is_available())
            .collect()
    })
}

pub fn valid_algorithm_names() -> String {
    available_algorithms()
        .iter()
        .map(|alg| alg.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn unsupported(name: &str) -> PwmError {
    PwmError::UnsupportedAlgorithm {
        name: name.to_string(),
        valid: valid_algorithm_names(),
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = PwmError;

    fn from_str(s: &str) -> Result<Self> {
        available_algorithms()
            .iter()
            .copied()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| unsupported(s))
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Algorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

fn plain<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

fn keyed<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| PwmError::validation("HMAC key rejected by primitive"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Hashes `data` with `algorithm`. `key` is only used by the HMAC variants;
/// plain digests expect the caller to have folded the key into `data`.
pub fn hash(algorithm: Algorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        Algorithm::Md5 => Ok(plain::<Md5>(data)),
        Algorithm::HmacMd5 => keyed::<Hmac<Md5>>(key, data),
        Algorithm::Sha1 => Ok(plain::<Sha1>(data)),
        Algorithm::HmacSha1 => keyed::<Hmac<Sha1>>(key, data),
        Algorithm::Sha256 => Ok(plain::<Sha256>(data)),
        Algorithm::HmacSha256 => keyed::<Hmac<Sha256>>(key, data),
        #[cfg(feature = "legacy")]
        Algorithm::Md4 => Ok(plain::<Md4>(data)),
        #[cfg(feature = "legacy")]
        Algorithm::HmacMd4 => keyed::<Hmac<Md4>>(key, data),
        #[cfg(feature = "legacy")]
        Algorithm::Rmd160 => Ok(plain::<Ripemd160>(data)),
        #[cfg(feature = "legacy")]
        Algorithm::HmacRmd160 => keyed::<Hmac<Ripemd160>>(key, data),
        #[cfg(not(feature = "legacy"))]
        Algorithm::Md4 | Algorithm::HmacMd4 | Algorithm::Rmd160 | Algorithm::HmacRmd160 => {
            Err(unsupported(algorithm.name()))
        }
    }
}

use std::fmt;
use std::str::FromStr;

use digest::Digest;

use crate::error::Error;

/// Incremental digest over a byte stream.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// The enumerated set of supported checksum algorithms.
///
/// MD5 is the default for compatibility with external `md5sum` conventions;
/// its digests are trusted without byte comparison on store, an accepted
/// tradeoff callers opt out of by selecting a stronger algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn hasher(&self) -> Box<dyn Hasher> {
        match self {
            Self::Md5 => Box::new(Md5Hasher::new()),
            Self::Sha256 => Box::new(Sha256Hasher::new()),
            Self::Blake3 => Box::new(Blake3Hasher::new()),
        }
    }

    /// One-shot lowercase hex digest of a byte slice.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

pub struct Md5Hasher(md5::Md5);

impl Md5Hasher {
    pub fn new() -> Self {
        Self(md5::Md5::new())
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

pub struct Sha256Hasher(sha2::Sha256);

impl Sha256Hasher {
    pub fn new() -> Self {
        Self(sha2::Sha256::new())
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

pub struct Blake3Hasher(blake3::Hasher);

impl Blake3Hasher {
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_known_vector() {
        // md5sum of "hello"
        assert_eq!(
            HashAlgorithm::Md5.hex_digest(b"hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            HashAlgorithm::Sha256.hex_digest(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn blake3_digest_length() {
        assert_eq!(HashAlgorithm::Blake3.hex_digest(b"abc").len(), 64);
    }

    #[test]
    fn algorithm_round_trips_through_str() {
        for algo in [HashAlgorithm::Md5, HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            assert_eq!(algo.as_str().parse::<HashAlgorithm>().unwrap(), algo);
        }
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(matches!(
            "crc32".parse::<HashAlgorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut hasher = HashAlgorithm::Sha256.hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(
            hex::encode(hasher.finalize()),
            HashAlgorithm::Sha256.hex_digest(b"hello world")
        );
    }
}

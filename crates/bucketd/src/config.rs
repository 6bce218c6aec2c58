//! Environment-driven daemon configuration.
//!
//! The store core takes an explicit [`StoreConfig`]; this module is the only
//! place that reads the environment and maps it onto one. Malformed operator
//! configuration fails startup rather than being silently ignored.

use std::str::FromStr;

use anyhow::{Context, bail};
use bucket_store::{DEFAULT_MAX_CONTENT_LENGTH, ReplicaTemplate, StoreConfig};
use bucket_verify::HashAlgorithm;

/// Highest `REPLICATE_n` slot consulted.
const REPLICA_SLOTS: u32 = 10;

const DEFAULT_ROOT: &str = "/tmp/bucket";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone, Debug)]
pub struct DaemonConfig {
    pub bind_addr: String,
    pub store: StoreConfig,
}

impl DaemonConfig {
    /// Build from process environment:
    ///
    /// - `ARCHIVE_DIR` - storage root (default `/tmp/bucket`)
    /// - `CHECKSUM_TYPE` - `md5` (default), `sha256`, or `blake3`
    /// - `MAX_CONTENT_LENGTH` - byte count, optionally suffixed `kb`/`mb`/`gb`
    /// - `REPLICATE_0` .. `REPLICATE_9` - replica path templates
    /// - `BIND_ADDR` - listen address (default `0.0.0.0:8080`)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let root = lookup("ARCHIVE_DIR").unwrap_or_else(|| DEFAULT_ROOT.to_string());

        let algorithm = match lookup("CHECKSUM_TYPE") {
            Some(name) => HashAlgorithm::from_str(&name)
                .with_context(|| format!("CHECKSUM_TYPE '{name}' is not a known algorithm"))?,
            None => HashAlgorithm::default(),
        };

        let max_content_length = match lookup("MAX_CONTENT_LENGTH") {
            Some(raw) => {
                parse_size(&raw).with_context(|| format!("invalid MAX_CONTENT_LENGTH '{raw}'"))?
            }
            None => DEFAULT_MAX_CONTENT_LENGTH,
        };

        let mut replicas = Vec::new();
        for slot in 0..REPLICA_SLOTS {
            let key = format!("REPLICATE_{slot}");
            if let Some(raw) = lookup(&key) {
                let template = ReplicaTemplate::parse(&raw)
                    .with_context(|| format!("invalid replica template in {key}"))?;
                replicas.push(template);
            }
        }

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            bind_addr,
            store: StoreConfig::new(root)
                .algorithm(algorithm)
                .max_content_length(max_content_length)
                .replicas(replicas),
        })
    }
}

/// Parse a byte count with an optional `kb`/`mb`/`gb` suffix
/// (case-insensitive). A bare number is bytes.
pub fn parse_size(raw: &str) -> anyhow::Result<u64> {
    let lower = raw.trim().to_ascii_lowercase();
    let (digits, shift) = if let Some(d) = lower.strip_suffix("kb") {
        (d, 10)
    } else if let Some(d) = lower.strip_suffix("mb") {
        (d, 20)
    } else if let Some(d) = lower.strip_suffix("gb") {
        (d, 30)
    } else {
        (lower.as_str(), 0)
    };

    let digits = digits.trim();
    if digits.is_empty() {
        bail!("no digits in size '{raw}'");
    }
    let value: u64 = digits
        .parse()
        .with_context(|| format!("'{digits}' is not a number"))?;
    value
        .checked_shl(shift)
        .filter(|v| v >> shift == value)
        .with_context(|| format!("size '{raw}' overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_suffixes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("4kb").unwrap(), 4 << 10);
        assert_eq!(parse_size("32mb").unwrap(), 32 << 20);
        assert_eq!(parse_size("2GB").unwrap(), 2 << 30);
        assert_eq!(parse_size(" 8 mb ").unwrap(), 8 << 20);
    }

    #[test]
    fn bad_sizes_rejected() {
        assert!(parse_size("").is_err());
        assert!(parse_size("mb").is_err());
        assert!(parse_size("ten").is_err());
        assert!(parse_size("1tb").is_err());
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = DaemonConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.store.root, std::path::PathBuf::from("/tmp/bucket"));
        assert_eq!(config.store.algorithm, HashAlgorithm::Md5);
        assert_eq!(config.store.max_content_length, 32 << 20);
        assert!(config.store.replicas.is_empty());
    }

    #[test]
    fn replica_slots_collected_in_order() {
        let config = DaemonConfig::from_lookup(|key| match key {
            "REPLICATE_0" => Some("user/${User}".to_string()),
            "REPLICATE_2" => Some("team/${Team}/${Topic}".to_string()),
            _ => None,
        })
        .unwrap();
        let raw: Vec<_> = config.store.replicas.iter().map(|t| t.raw()).collect();
        assert_eq!(raw, vec!["user/${User}", "team/${Team}/${Topic}"]);
    }

    #[test]
    fn bad_template_fails_startup() {
        let result = DaemonConfig::from_lookup(|key| {
            (key == "REPLICATE_0").then(|| "no-tags-here".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn unknown_algorithm_fails_startup() {
        let result = DaemonConfig::from_lookup(|key| {
            (key == "CHECKSUM_TYPE").then(|| "crc32".to_string())
        });
        assert!(result.is_err());
    }
}

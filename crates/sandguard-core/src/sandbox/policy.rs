//! Hardening policy: tunable limits applied to docker sandbox fields

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lexical::MAX_PATH_LENGTH;

/// Mount flags that re-enable what a sandbox tmpfs must never allow.
/// A policy file cannot add these to the allow-list.
const FORBIDDEN_TMPFS_FLAGS: &[&str] = &["exec", "suid", "dev"];

/// Limits and deny-lists for the docker sandbox validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardeningPolicy {
    /// Bare tmpfs mount flags that may appear in a tmpfs options list.
    /// Keyed limits (`size=`, `mode=`, `nr_inodes=`, `uid=`, `gid=`) are
    /// always checked by shape and need no entry here.
    pub allowed_tmpfs_flags: Vec<String>,
    /// Addresses that may never be aliased through `extraHosts` or `dns`
    pub blocked_addresses: Vec<IpAddr>,
    /// Longest accepted path in path-valued docker fields
    pub max_path_length: usize,
}

impl Default for HardeningPolicy {
    fn default() -> Self {
        Self {
            allowed_tmpfs_flags: vec![
                "noexec".to_string(),
                "nosuid".to_string(),
                "nodev".to_string(),
                "ro".to_string(),
                "rw".to_string(),
                "noatime".to_string(),
                "nodiratime".to_string(),
                "relatime".to_string(),
            ],
            blocked_addresses: vec![
                // AWS, GCP, Azure, OpenStack and most other clouds
                IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254)),
                // AWS IMDS over IPv6
                IpAddr::V6(Ipv6Addr::new(0xfd00, 0xec2, 0, 0, 0, 0, 0, 0x254)),
                // Alibaba Cloud
                IpAddr::V4(Ipv4Addr::new(100, 100, 100, 200)),
            ],
            max_path_length: MAX_PATH_LENGTH,
        }
    }
}

impl HardeningPolicy {
    /// Parse a policy from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let policy: Self = toml::from_str(content).context("Failed to parse hardening policy")?;

        if let Some(flag) = policy
            .allowed_tmpfs_flags
            .iter()
            .find(|f| FORBIDDEN_TMPFS_FLAGS.contains(&f.as_str()))
        {
            bail!("Hardening policy may not allow tmpfs flag '{}'", flag);
        }
        if policy.max_path_length == 0 {
            bail!("Hardening policy max_path_length must be greater than zero");
        }

        Ok(policy)
    }

    /// Load a policy from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read hardening policy: {}", path.display()))?;
        let policy = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid hardening policy: {}", path.display()))?;
        info!(
            "Loaded hardening policy from {} ({} blocked addresses)",
            path.display(),
            policy.blocked_addresses.len()
        );
        Ok(policy)
    }

    /// Check if a bare tmpfs flag is allowed
    pub fn is_tmpfs_flag_allowed(&self, flag: &str) -> bool {
        !FORBIDDEN_TMPFS_FLAGS.contains(&flag) && self.allowed_tmpfs_flags.iter().any(|f| f == flag)
    }

    /// Check if an address is on the deny-list.
    ///
    /// IPv4-mapped IPv6 forms (`::ffff:a.b.c.d`) match their IPv4 entry.
    pub fn is_address_blocked(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.blocked_addresses
            .iter()
            .any(|blocked| blocked.to_canonical() == addr)
    }
}

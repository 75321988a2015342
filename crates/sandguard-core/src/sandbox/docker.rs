//! Docker sandbox fields: structured parsing and per-field safety rules

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::policy::HardeningPolicy;
use crate::error::Rejection;
use crate::exec_safety::check_path_value_with_limit;
use crate::lexical::{reject_over_length, screen_argument, screen_string};
use crate::schema::ValidationIssue;

static USER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("valid user-name pattern"));

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("valid hostname pattern")
});

/// Keyed tmpfs options: size and inode limits, root directory mode, owner
static TMPFS_KEYED_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:size|nr_inodes|nr_blocks)=[0-9]+[kKmMgG%]?|mode=[0-7]{3,4}|(?:uid|gid)=[0-9]+)$")
        .expect("valid tmpfs option pattern")
});

const MAX_HOSTNAME_LENGTH: usize = 253;

/// Bind mount modes accepted in `binds`; shared propagation is excluded
const BIND_MODES: &[&str] = &["ro", "rw", "z", "Z", "private", "rprivate", "slave", "rslave"];

/// Docker sandbox settings, as found under `sandbox.docker`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxDockerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seccomp_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparmor_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmpfs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_hosts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binds: Option<Vec<String>>,
}

impl SandboxDockerConfig {
    /// Validate every present field, reporting issues under `prefix`.
    pub fn validate(&self, policy: &HardeningPolicy, prefix: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (key, check) in SCALAR_FIELDS {
            if let Some(value) = self.scalar(key) {
                report(&mut issues, format!("{prefix}.{key}"), check(value, policy));
            }
        }
        for (key, check) in LIST_FIELDS {
            if let Some(entries) = self.list(key) {
                for (i, entry) in entries.iter().enumerate() {
                    report(&mut issues, format!("{prefix}.{key}.{i}"), check(entry.as_str(), policy));
                }
            }
        }

        issues
    }

    fn scalar(&self, key: &str) -> Option<&str> {
        match key {
            "image" => self.image.as_deref(),
            "containerPrefix" => self.container_prefix.as_deref(),
            "workdir" => self.workdir.as_deref(),
            "user" => self.user.as_deref(),
            "network" => self.network.as_deref(),
            "seccompProfile" => self.seccomp_profile.as_deref(),
            "apparmorProfile" => self.apparmor_profile.as_deref(),
            _ => None,
        }
    }

    fn list(&self, key: &str) -> Option<&[String]> {
        match key {
            "tmpfs" => self.tmpfs.as_deref(),
            "extraHosts" => self.extra_hosts.as_deref(),
            "dns" => self.dns.as_deref(),
            "binds" => self.binds.as_deref(),
            _ => None,
        }
    }
}

pub(crate) fn report(issues: &mut Vec<ValidationIssue>, path: String, outcome: Result<(), Rejection>) {
    if let Err(rejection) = outcome {
        debug!("Sandbox field {} rejected: {}", path, rejection);
        issues.push(ValidationIssue::new(path, &rejection));
    }
}

/// A rule applied to one string value of a docker field
pub(crate) type FieldCheck = fn(&str, &HardeningPolicy) -> Result<(), Rejection>;

/// Single-string docker fields, keyed by their config name
pub(crate) const SCALAR_FIELDS: &[(&str, FieldCheck)] = &[
    ("image", image_rule),
    ("containerPrefix", image_rule),
    ("workdir", workdir_rule),
    ("user", user_rule),
    ("network", network_rule),
    ("seccompProfile", profile_rule),
    ("apparmorProfile", profile_rule),
];

/// List-of-strings docker fields; the rule applies to each entry
pub(crate) const LIST_FIELDS: &[(&str, FieldCheck)] = &[
    ("tmpfs", tmpfs_rule),
    ("extraHosts", extra_host_rule),
    ("dns", dns_rule),
    ("binds", bind_rule),
];

fn image_rule(value: &str, _policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_image_value(Some(value)).map(drop)
}

fn workdir_rule(value: &str, policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_workdir_value(Some(value), policy).map(drop)
}

fn user_rule(value: &str, _policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_user_value(Some(value)).map(drop)
}

fn network_rule(value: &str, _policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_network_value(Some(value)).map(drop)
}

fn profile_rule(value: &str, _policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_profile_value(Some(value)).map(drop)
}

fn tmpfs_rule(value: &str, policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_tmpfs_entry(Some(value), policy).map(drop)
}

fn extra_host_rule(value: &str, policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_extra_host(Some(value), policy).map(drop)
}

fn dns_rule(value: &str, policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_dns_server(Some(value), policy).map(drop)
}

fn bind_rule(value: &str, policy: &HardeningPolicy) -> Result<(), Rejection> {
    check_bind_entry(Some(value), policy).map(drop)
}

/// Image references and other raw strings placed on the docker command line
pub fn check_image_value(value: Option<&str>) -> Result<&str, Rejection> {
    screen_string(value)
}

/// Working directory inside the container; path shape is not enforced
pub fn check_workdir_value<'a>(
    value: Option<&'a str>,
    policy: &HardeningPolicy,
) -> Result<&'a str, Rejection> {
    let trimmed = screen_string(value)?;
    reject_over_length(trimmed, policy.max_path_length)?;
    Ok(trimmed)
}

/// One side of a `user` spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Name(String),
    Id(u32),
}

impl Identity {
    fn parse(raw: &str, part: &str) -> Result<Self, Rejection> {
        if raw.is_empty() {
            return Err(Rejection::MalformedUser(format!("{part} is empty")));
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw
                .parse()
                .map(Identity::Id)
                .map_err(|_| Rejection::MalformedUser(format!("{part} id '{raw}' is out of range")));
        }
        if USER_NAME.is_match(raw) {
            return Ok(Identity::Name(raw.to_string()));
        }
        Err(Rejection::MalformedUser(format!(
            "{part} '{raw}' is neither a name nor a numeric id"
        )))
    }

    pub fn is_root(&self) -> bool {
        match self {
            Identity::Name(name) => name.eq_ignore_ascii_case("root"),
            Identity::Id(id) => *id == 0,
        }
    }
}

/// Container user: `<identity>` or `<identity>:<group>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerUser {
    pub identity: Identity,
    pub group: Option<Identity>,
}

impl ContainerUser {
    /// Parse the syntax only; privileged identities are accepted here.
    pub fn parse(value: &str) -> Result<Self, Rejection> {
        let trimmed = screen_argument(Some(value))?;
        let (identity, group) = match trimmed.split_once(':') {
            Some((identity, group)) => (identity, Some(group)),
            None => (trimmed, None),
        };
        Ok(Self {
            identity: Identity::parse(identity, "user")?,
            group: group.map(|g| Identity::parse(g, "group")).transpose()?,
        })
    }
}

/// Parse a `user` value and refuse root, by name or by uid 0.
/// Only the identity is checked; a root group is allowed.
pub fn check_user_value(value: Option<&str>) -> Result<ContainerUser, Rejection> {
    let raw = value.ok_or(Rejection::Empty)?;
    let user = ContainerUser::parse(raw)?;
    if user.identity.is_root() {
        return Err(Rejection::PrivilegedIdentity(raw.trim().to_string()));
    }
    Ok(user)
}

/// A tmpfs mount: `<absolute-path>[:<opt>,<opt>...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmpfsMount {
    pub path: String,
    pub options: Vec<String>,
}

impl TmpfsMount {
    pub fn parse(entry: &str) -> Result<Self, Rejection> {
        let trimmed = screen_argument(Some(entry))?;
        let (path, options) = match trimmed.split_once(':') {
            Some((path, options)) => (path, Some(options)),
            None => (trimmed, None),
        };
        if !path.starts_with('/') {
            return Err(Rejection::NonAbsolutePath(path.to_string()));
        }
        let options = match options {
            Some(options) => options
                .split(',')
                .map(|o| o.trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        Ok(Self {
            path: path.to_string(),
            options,
        })
    }
}

/// Parse a tmpfs entry and check every option against the policy.
pub fn check_tmpfs_entry(
    entry: Option<&str>,
    policy: &HardeningPolicy,
) -> Result<TmpfsMount, Rejection> {
    let mount = TmpfsMount::parse(entry.ok_or(Rejection::Empty)?)?;
    reject_over_length(&mount.path, policy.max_path_length)?;
    for option in &mount.options {
        if option.is_empty() {
            return Err(Rejection::DisallowedMountOption("<empty>".to_string()));
        }
        if !policy.is_tmpfs_flag_allowed(option) && !TMPFS_KEYED_OPTION.is_match(option) {
            return Err(Rejection::DisallowedMountOption(option.clone()));
        }
    }
    Ok(mount)
}

/// A host alias: `<hostname>:<ip>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub hostname: String,
    pub address: IpAddr,
}

impl HostEntry {
    /// The address is everything after the first colon, so IPv6 literals
    /// work with or without brackets.
    pub fn parse(entry: &str) -> Result<Self, Rejection> {
        let trimmed = screen_argument(Some(entry))?;
        let (hostname, address) = trimmed.split_once(':').ok_or_else(|| {
            Rejection::MalformedHostEntry("expected <hostname>:<ip>".to_string())
        })?;
        if hostname.len() > MAX_HOSTNAME_LENGTH || !HOSTNAME.is_match(hostname) {
            return Err(Rejection::MalformedHostEntry(format!(
                "'{hostname}' is not a valid hostname"
            )));
        }
        Ok(Self {
            hostname: hostname.to_string(),
            address: parse_address(address)?,
        })
    }
}

fn parse_address(raw: &str) -> Result<IpAddr, Rejection> {
    let unbracketed = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    unbracketed
        .parse()
        .map_err(|_| Rejection::InvalidAddress(raw.to_string()))
}

/// Parse an `extraHosts` entry and refuse metadata endpoints.
///
/// Only the literal address is compared; the hostname is never resolved.
pub fn check_extra_host(
    entry: Option<&str>,
    policy: &HardeningPolicy,
) -> Result<HostEntry, Rejection> {
    let host = HostEntry::parse(entry.ok_or(Rejection::Empty)?)?;
    if policy.is_address_blocked(host.address) {
        return Err(Rejection::MetadataAddress(host.address));
    }
    Ok(host)
}

/// A `dns` entry must be a literal address off the deny-list.
pub fn check_dns_server(entry: Option<&str>, policy: &HardeningPolicy) -> Result<IpAddr, Rejection> {
    let trimmed = screen_argument(entry)?;
    let address = parse_address(trimmed)?;
    if policy.is_address_blocked(address) {
        return Err(Rejection::MetadataAddress(address));
    }
    Ok(address)
}

/// A bind mount: `<host-path>:<container-path>[:<mode>,...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: String,
    pub target: String,
    pub modes: Vec<String>,
}

impl BindMount {
    pub fn parse(entry: &str) -> Result<Self, Rejection> {
        let trimmed = screen_argument(Some(entry))?;
        let mut parts = trimmed.splitn(3, ':');
        let source = parts.next().unwrap_or_default();
        let target = parts.next().ok_or_else(|| {
            Rejection::MalformedBind("expected <host-path>:<container-path>".to_string())
        })?;
        let modes = parts
            .next()
            .map(|m| m.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            modes,
        })
    }
}

/// Parse a bind entry: the host side must be a safe path, the container
/// side absolute, and every mode known.
pub fn check_bind_entry(
    entry: Option<&str>,
    policy: &HardeningPolicy,
) -> Result<BindMount, Rejection> {
    let bind = BindMount::parse(entry.ok_or(Rejection::Empty)?)?;
    check_path_value_with_limit(Some(&bind.source), policy.max_path_length)?;
    if !bind.target.starts_with('/') {
        return Err(Rejection::NonAbsolutePath(bind.target.clone()));
    }
    reject_over_length(&bind.target, policy.max_path_length)?;
    if let Some(mode) = bind.modes.iter().find(|m| !BIND_MODES.contains(&m.as_str())) {
        return Err(Rejection::MalformedBind(format!("unknown mode '{mode}'")));
    }
    Ok(bind)
}

/// `network` may not join the host's or another container's namespace.
pub fn check_network_value(value: Option<&str>) -> Result<&str, Rejection> {
    let trimmed = screen_argument(value)?;
    let lower = trimmed.to_ascii_lowercase();
    if lower == "host" || lower.starts_with("container:") {
        return Err(Rejection::WeakenedIsolation(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// seccomp and AppArmor profiles may not be switched off.
pub fn check_profile_value(value: Option<&str>) -> Result<&str, Rejection> {
    let trimmed = screen_argument(value)?;
    if trimmed.eq_ignore_ascii_case("unconfined") {
        return Err(Rejection::WeakenedIsolation(trimmed.to_string()));
    }
    Ok(trimmed)
}

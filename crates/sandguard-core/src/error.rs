//! Rejection reasons shared by the classifiers and the schema validator
//!
//! Each variant is one entry of the rejection taxonomy. The `Display` text is
//! what an operator sees next to the offending field path.

use std::net::IpAddr;

use thiserror::Error;

/// Why a candidate value was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("value is empty or missing")]
    Empty,

    #[error("value contains a null byte")]
    NullByte,

    #[error("value contains a line break (CR or LF)")]
    ControlCharacter,

    #[error("value contains shell metacharacter '{0}'")]
    ShellMetacharacter(char),

    #[error("value contains quote character {0}")]
    Quote(char),

    #[error("value starts with '-' and could be parsed as a command-line flag")]
    FlagInjection,

    #[error("value is not a valid executable name (allowed: letters, digits, '.', '_', '+', '-')")]
    MalformedBareName,

    #[error("value is {len} characters long (max: {max})")]
    TooLong { len: usize, max: usize },

    #[error("mount path '{0}' is not absolute")]
    NonAbsolutePath(String),

    #[error("mount option '{0}' is not allowed")]
    DisallowedMountOption(String),

    #[error("host entry is malformed: {0}")]
    MalformedHostEntry(String),

    #[error("'{0}' is not a valid IP address")]
    InvalidAddress(String),

    #[error("address {0} is a cloud metadata endpoint")]
    MetadataAddress(IpAddr),

    #[error("user is malformed: {0}")]
    MalformedUser(String),

    #[error("running as root (user '{0}') is not allowed")]
    PrivilegedIdentity(String),

    #[error("bind mount is malformed: {0}")]
    MalformedBind(String),

    #[error("'{0}' weakens container isolation")]
    WeakenedIsolation(String),

    #[error("expected {0}")]
    WrongType(&'static str),
}

impl Rejection {
    /// Stable kebab-case name of the rejection class
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty-or-absent",
            Rejection::NullByte => "contains-null-byte",
            Rejection::ControlCharacter => "contains-control-character",
            Rejection::ShellMetacharacter(_) => "contains-shell-metacharacter",
            Rejection::Quote(_) => "contains-quote",
            Rejection::FlagInjection => "flag-injection-shape",
            Rejection::MalformedBareName => "malformed-bare-name",
            Rejection::TooLong { .. } => "over-length",
            Rejection::NonAbsolutePath(_) => "non-absolute-path",
            Rejection::DisallowedMountOption(_) => "disallowed-mount-option",
            Rejection::MalformedHostEntry(_) | Rejection::InvalidAddress(_) => {
                "malformed-host-entry"
            }
            Rejection::MetadataAddress(_) => "disallowed-metadata-address",
            Rejection::MalformedUser(_) => "malformed-user",
            Rejection::PrivilegedIdentity(_) => "privileged-identity",
            Rejection::MalformedBind(_) => "malformed-bind",
            Rejection::WeakenedIsolation(_) => "weakened-isolation",
            Rejection::WrongType(_) => "wrong-type",
        }
    }
}

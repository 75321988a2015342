//! sandguard-core: input validation for sandboxed command execution
//!
//! Screens executable names, filesystem paths and docker sandbox settings
//! before a launcher uses them:
//! - [`is_safe_executable_value`] / [`is_safe_path_value`] classify a single
//!   value that is about to become a process argument
//! - [`validate_config_object`] walks a raw configuration object, checks every
//!   docker sandbox block it contains and reports each violation with its path
//!
//! All checks are pure functions of their input.

pub mod error;
pub mod exec_safety;
pub mod lexical;
pub mod sandbox;
pub mod schema;

pub use error::Rejection;
pub use exec_safety::{
    check_executable_value, check_path_value, is_safe_executable_value, is_safe_path_value,
};
pub use sandbox::{HardeningPolicy, SandboxDockerConfig};
pub use schema::{SandboxValidator, ValidationIssue, ValidationResult, validate_config_object};

//! Schema validator: locates docker sandbox blocks in a raw config object
//! and aggregates every violation into one result

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Rejection;
use crate::sandbox::HardeningPolicy;
use crate::sandbox::docker::{LIST_FIELDS, SCALAR_FIELDS, report};

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `agents.defaults.sandbox.docker.tmpfs.0`
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, rejection: &Rejection) -> Self {
        Self {
            path: path.into(),
            message: rejection.to_string(),
        }
    }
}

/// Outcome of validating a configuration object.
///
/// `ok` is true exactly when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    ok: bool,
    errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
        }
    }

    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationIssue> {
        self.errors
    }
}

/// Validates the docker sandbox sections of a configuration object
#[derive(Debug, Clone, Default)]
pub struct SandboxValidator {
    policy: HardeningPolicy,
}

impl SandboxValidator {
    pub fn new(policy: HardeningPolicy) -> Self {
        Self { policy }
    }

    /// Validate `agents.defaults.sandbox.docker` and every
    /// `agents.list[i].sandbox.docker` override present in `raw`.
    ///
    /// Anything outside those blocks is left to the config loader, but a
    /// node on the way to a docker block must have the right shape.
    pub fn validate_config_object(&self, raw: &Value) -> ValidationResult {
        let mut issues = Vec::new();

        if let Some(root) = raw.as_object()
            && let Some(agents) = child_object(root, "agents", "agents", &mut issues)
        {
            if let Some(defaults) = child_object(agents, "defaults", "agents.defaults", &mut issues) {
                self.validate_sandbox(defaults, "agents.defaults", &mut issues);
            }
            match present(agents, "list") {
                None => {}
                Some(Value::Array(list)) => {
                    for (i, agent) in list.iter().enumerate() {
                        let path = format!("agents.list.{i}");
                        match agent {
                            Value::Null => {}
                            Value::Object(agent) => self.validate_sandbox(agent, &path, &mut issues),
                            _ => issues.push(ValidationIssue::new(path, &Rejection::WrongType("an object"))),
                        }
                    }
                }
                Some(_) => issues.push(ValidationIssue::new(
                    "agents.list",
                    &Rejection::WrongType("an array"),
                )),
            }
        }

        if issues.is_empty() {
            debug!("Sandbox config validation passed");
            return ValidationResult::pass();
        }
        warn!(
            "Sandbox config validation failed: {} violation(s) found",
            issues.len()
        );
        ValidationResult::from_issues(issues)
    }

    /// Check `<prefix>.sandbox.docker` of one agent entry
    fn validate_sandbox(&self, agent: &Map<String, Value>, prefix: &str, issues: &mut Vec<ValidationIssue>) {
        let sandbox_path = format!("{prefix}.sandbox");
        if let Some(sandbox) = child_object(agent, "sandbox", &sandbox_path, issues)
            && let Some(docker) = present(sandbox, "docker")
        {
            self.validate_docker_block(docker, &format!("{sandbox_path}.docker"), issues);
        }
    }

    fn validate_docker_block(&self, docker: &Value, prefix: &str, issues: &mut Vec<ValidationIssue>) {
        debug!("Validating sandbox docker block at {}", prefix);

        let Some(fields) = docker.as_object() else {
            issues.push(ValidationIssue::new(prefix, &Rejection::WrongType("an object")));
            return;
        };

        for (key, check) in SCALAR_FIELDS {
            let path = format!("{prefix}.{key}");
            match present(fields, key) {
                None => {}
                Some(Value::String(value)) => report(issues, path, check(value.as_str(), &self.policy)),
                Some(_) => issues.push(ValidationIssue::new(path, &Rejection::WrongType("a string"))),
            }
        }

        for (key, check) in LIST_FIELDS {
            let path = format!("{prefix}.{key}");
            match present(fields, key) {
                None => {}
                Some(Value::Array(entries)) => {
                    for (i, entry) in entries.iter().enumerate() {
                        let entry_path = format!("{path}.{i}");
                        let outcome = match entry.as_str() {
                            Some(value) => check(value, &self.policy),
                            None => Err(Rejection::WrongType("a string")),
                        };
                        report(issues, entry_path, outcome);
                    }
                }
                Some(_) => issues.push(ValidationIssue::new(
                    path,
                    &Rejection::WrongType("an array of strings"),
                )),
            }
        }
    }
}

/// `parent.key` as an object; a present value of another type is reported
/// at `path`
fn child_object<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'a Map<String, Value>> {
    match present(parent, key)? {
        Value::Object(map) => Some(map),
        _ => {
            issues.push(ValidationIssue::new(path, &Rejection::WrongType("an object")));
            None
        }
    }
}

/// A field counts as present unless it is missing or null
fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|value| !value.is_null())
}

/// Validate a raw configuration object with the default hardening policy.
pub fn validate_config_object(raw: &Value) -> ValidationResult {
    SandboxValidator::default().validate_config_object(raw)
}

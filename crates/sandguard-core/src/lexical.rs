//! Lexical screens shared by every classifier

use crate::error::Rejection;

/// Characters that chain, pipe, substitute or redirect in a shell
pub const SHELL_METACHARS: &[char] = &[';', '&', '|', '`', '$', '<', '>'];

/// Line breaks; a single argument must stay on one line
pub const CONTROL_CHARS: &[char] = &['\r', '\n'];

pub const QUOTE_CHARS: &[char] = &['"', '\''];

/// Longest accepted path, in characters
pub const MAX_PATH_LENGTH: usize = 4096;

/// Whitespace stripped from both ends; a byte-order mark counts as blank
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

/// Trim the candidate and reject absence or blank input.
pub fn non_empty(value: Option<&str>) -> Result<&str, Rejection> {
    match value.map(|v| v.trim_matches(is_blank)) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed),
        _ => Err(Rejection::Empty),
    }
}

pub fn reject_null_byte(value: &str) -> Result<(), Rejection> {
    if value.contains('\0') {
        return Err(Rejection::NullByte);
    }
    Ok(())
}

pub fn reject_control_chars(value: &str) -> Result<(), Rejection> {
    if value.contains(CONTROL_CHARS) {
        return Err(Rejection::ControlCharacter);
    }
    Ok(())
}

pub fn reject_shell_metachars(value: &str) -> Result<(), Rejection> {
    match value.chars().find(|c| SHELL_METACHARS.contains(c)) {
        Some(c) => Err(Rejection::ShellMetacharacter(c)),
        None => Ok(()),
    }
}

pub fn reject_quotes(value: &str) -> Result<(), Rejection> {
    match value.chars().find(|c| QUOTE_CHARS.contains(c)) {
        Some(c) => Err(Rejection::Quote(c)),
        None => Ok(()),
    }
}

/// Length is counted in characters, not bytes.
pub fn reject_over_length(value: &str, max: usize) -> Result<(), Rejection> {
    let len = value.chars().count();
    if len > max {
        return Err(Rejection::TooLong { len, max });
    }
    Ok(())
}

/// Screen for raw strings embedded in docker fields (image, workdir, ...).
///
/// Quotes are tolerated here; everything that could end or extend a shell
/// command is not.
pub fn screen_string(value: Option<&str>) -> Result<&str, Rejection> {
    let trimmed = non_empty(value)?;
    reject_null_byte(trimmed)?;
    reject_control_chars(trimmed)?;
    reject_shell_metachars(trimmed)?;
    Ok(trimmed)
}

/// Full screen for values substituted into a process argument list.
pub fn screen_argument(value: Option<&str>) -> Result<&str, Rejection> {
    let trimmed = screen_string(value)?;
    reject_quotes(trimmed)?;
    Ok(trimmed)
}

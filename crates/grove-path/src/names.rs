//! Node name rules.
//!
//! Two separate checks apply to every name that becomes a path segment:
//!
//! - [`validate_name`] is *strict*: a name that fails it can never be
//!   stored (empty, contains the separator, `.`/`..`, NUL).
//! - [`is_natural_name`] is *advisory*: it tells whether the name could be
//!   used as an identifier-style member accessor. Callers emit a warning
//!   for non-natural names but still carry out the operation.

use crate::error::{PathError, PathResult};

/// The path separator.
pub const SEPARATOR: char = '/';

/// Prefixes reserved for the tree's own members and hidden groups.
pub const RESERVED_PREFIXES: &[&str] = &["_c_", "_f_", "_g_", "_i_", "_p_", "_v_"];

/// Validate a single node name, returning `Ok(())` if it can be stored.
///
/// # Examples
///
/// ```
/// use grove_path::names::validate_name;
///
/// assert!(validate_name("array").is_ok());
/// assert!(validate_name("array 2").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("a/b").is_err());
/// ```
pub fn validate_name(name: &str) -> PathResult<()> {
    if name.is_empty() {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".into(),
        });
    }

    if name.contains(SEPARATOR) {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: format!("must not contain the separator {SEPARATOR:?}"),
        });
    }

    if name == "." || name == ".." {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "'.' and '..' are not node names".into(),
        });
    }

    if name.contains('\0') {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "must not contain NUL".into(),
        });
    }

    Ok(())
}

/// Returns `true` if `name` is usable as an identifier-style accessor.
///
/// A natural name is an ASCII identifier (`[A-Za-z_][A-Za-z0-9_]*`) that
/// does not start with one of the [`RESERVED_PREFIXES`].
pub fn is_natural_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !has_reserved_prefix(name)
}

/// Returns `true` if `name` starts with a reserved prefix.
pub fn has_reserved_prefix(name: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|p| name.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("array").is_ok());
        assert!(validate_name("agroup3").is_ok());
        assert!(validate_name("with space").is_ok());
        assert!(validate_name("1leading_digit").is_ok());
        assert!(validate_name("v1.0").is_ok());
    }

    #[test]
    fn reject_empty_name() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn reject_separator() {
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("/").is_err());
    }

    #[test]
    fn reject_dot_names() {
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(".hidden").is_ok());
    }

    #[test]
    fn reject_nul() {
        assert!(validate_name("a\0b").is_err());
    }

    #[test]
    fn natural_names() {
        assert!(is_natural_name("array"));
        assert!(is_natural_name("_private"));
        assert!(is_natural_name("anarray1"));
        assert!(is_natural_name("CamelCase"));
    }

    #[test]
    fn unnatural_names() {
        assert!(!is_natural_name("array 2"));
        assert!(!is_natural_name("2array"));
        assert!(!is_natural_name("a-b"));
        assert!(!is_natural_name(""));
        assert!(!is_natural_name("caf\u{e9}"));
    }

    #[test]
    fn reserved_prefixes_are_unnatural() {
        assert!(!is_natural_name("_v_attrs"));
        assert!(!is_natural_name("_p_undo"));
        assert!(has_reserved_prefix("_f_close"));
        assert!(!has_reserved_prefix("_x_"));
    }
}

//! Name validity rule
//!
//! Client and group names share one rule, enforced identically on both
//! sides of the wire: non-empty, ASCII alphanumeric only, bounded length.

/// Maximum length of a client or group name in bytes
pub const MAX_NAME_LEN: usize = 30;

/// Check whether a string is a valid client or group name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

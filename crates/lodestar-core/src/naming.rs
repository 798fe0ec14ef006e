//! Deterministic remote job name derivation.
//!
//! The remote training API requires job names that are unique per account,
//! at most 63 characters, and limited to alphanumerics and hyphens. Names
//! are derived from the object's cluster-unique UID rather than only its
//! display name, so two objects that share a display name (e.g. recreated
//! after deletion) still map to distinct remote jobs.

use crate::ids::ResourceUid;

/// Maximum length the remote API accepts for a job name.
pub const MAX_REMOTE_NAME_LEN: usize = 63;

/// Derive a deterministic, collision-resistant remote job name from an
/// object's UID and display name, bounded to `max_len` characters.
///
/// The UID-derived suffix always survives truncation; only the
/// display-name prefix is shortened to fit.
#[must_use]
pub fn generated_job_name(uid: &ResourceUid, display_name: &str, max_len: usize) -> String {
    let suffix = uid.simple();
    if max_len <= suffix.len() {
        return suffix[..max_len].to_string();
    }

    // Reserve room for the suffix and the joining hyphen.
    let budget = max_len - suffix.len() - 1;
    let prefix = normalize_name(display_name, budget);
    if prefix.is_empty() {
        return suffix;
    }

    format!("{prefix}-{suffix}")
}

/// Normalize a user-supplied name into the remote API's character set:
/// lowercase alphanumerics with single hyphens, no leading or trailing
/// hyphen, truncated to `max_len`.
#[must_use]
pub fn normalize_name(raw: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(raw.len().min(max_len));
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for ch in raw.chars() {
        if out.len() >= max_len {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    out
}

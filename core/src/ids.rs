//! Identifier helpers for catalog entries

use uuid::Uuid;

/// Placeholder id clients send when the registry should assign one
pub const DEFAULT_ID: &str = "DO_NOT_SET_AT_CLIENTS";

/// Build a unique id from a human readable name.
///
/// Characters outside `[A-Za-z0-9_-]` become `_` and a random UUID is appended,
/// e.g. `"stampede.tacc.xsede.org"` becomes `"stampede_tacc_xsede_org_<uuid>"`.
pub fn generate_id(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", sanitized, Uuid::new_v4())
}

/// Whether an id still needs to be assigned by the registry
pub fn is_unset_id(id: &str) -> bool {
    let trimmed = id.trim();
    trimmed.is_empty() || trimmed == DEFAULT_ID
}

/// Return `id` unchanged when set, otherwise a fresh id derived from `name`
pub fn ensure_id(id: &str, name: &str) -> String {
    if is_unset_id(id) {
        generate_id(name)
    } else {
        id.to_string()
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_sanitizes_name() {
        let id = generate_id("stampede.tacc.xsede.org");
        assert!(id.starts_with("stampede_tacc_xsede_org_"));
        // name + '_' + 36 char uuid
        assert_eq!(id.len(), "stampede_tacc_xsede_org_".len() + 36);
    }

    #[test]
    fn test_generate_id_is_unique() {
        assert_ne!(generate_id("SSH"), generate_id("SSH"));
    }

    #[test]
    fn test_is_unset_id() {
        assert!(is_unset_id(""));
        assert!(is_unset_id("   "));
        assert!(is_unset_id(DEFAULT_ID));
        assert!(!is_unset_id("gateway-1"));
    }

    #[test]
    fn test_ensure_id_keeps_explicit_id() {
        assert_eq!(ensure_id("my-host", "ignored"), "my-host");
        assert!(ensure_id(DEFAULT_ID, "Amber").starts_with("Amber_"));
    }
}

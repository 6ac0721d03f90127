//! Identifier sanitization
//!
//! Storage APIs only parameterize values, never identifiers, so every
//! user-supplied table or column name passes through [`sanitize`] before it
//! reaches DDL or is interpolated into a query. This is the sole defense
//! against identifier-based injection.

/// Normalize arbitrary user text into a storage-safe identifier.
///
/// Whitespace runs become a single underscore (`"My Laptops"` →
/// `my_laptops`), every other character outside `[a-zA-Z0-9_]` is stripped,
/// and the result is lower-cased. Returns `None` when nothing survives.
pub fn sanitize(raw: &str) -> Option<String> {
    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.trim().chars() {
        if c.is_whitespace() {
            pending_sep = !cleaned.is_empty();
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_sep {
                cleaned.push('_');
                pending_sep = false;
            }
            cleaned.push(c.to_ascii_lowercase());
        }
    }

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Fully qualified name of an entity store in the reserved namespace.
/// `identifier` must already be sanitized.
pub(crate) fn item_table(identifier: &str) -> String {
    format!("inventory_items.\"{}\"", identifier)
}

/// Navigation path pointing at an entity store, as stored in menu entries.
pub(crate) fn table_path(identifier: &str) -> String {
    format!("/inventory/table/{}", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_and_lowercases() {
        assert_eq!(sanitize("My Laptops"), Some("my_laptops".to_string()));
        assert_eq!(sanitize("My_Laptops"), Some("my_laptops".to_string()));
        assert_eq!(sanitize("serial-no."), Some("serialno".to_string()));
        assert_eq!(
            sanitize("users; DROP TABLE x--"),
            Some("users_drop_table_x".to_string())
        );
    }

    #[test]
    fn test_sanitize_rejects_empty_results() {
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("!!!"), None);
        assert_eq!(sanitize("  --;  "), None);
    }

    #[test]
    fn test_sanitize_collapses_whitespace_runs() {
        assert_eq!(sanitize("office   monitors"), Some("office_monitors".to_string()));
        assert_eq!(sanitize(" spare  parts "), Some("spare_parts".to_string()));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in ["My Laptops", "office  monitors", "Déjà vu 2", "a1_B2", "x !y"] {
            let once = sanitize(raw).unwrap();
            assert_eq!(sanitize(&once), Some(once.clone()));
            assert!(once
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(item_table("laptops"), "inventory_items.\"laptops\"");
        assert_eq!(table_path("laptops"), "/inventory/table/laptops");
    }
}

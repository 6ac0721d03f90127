//! Audit events returned to the caller
//!
//! Every mutating operation composes one of these for the external
//! notification feed. The engine itself does not persist them; it only
//! attributes the change to the supplied actor.

use serde::Serialize;

/// Category of a mutating operation, as consumed by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Create,
    Update,
    Delete,
    Success,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Success => "success",
        }
    }
}

/// A human-readable audit record for one mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub message: String,
    pub kind: AuditKind,
    pub icon: String,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, icon: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            icon: icon.to_string(),
        }
    }
}

/// Human-readable fallback label for a table identifier, used when no
/// display name is registered: underscores become spaces, words are
/// title-cased.
pub fn display_fallback(identifier: &str) -> String {
    identifier
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_fallback_title_cases() {
        assert_eq!(display_fallback("my_laptops"), "My Laptops");
        assert_eq!(display_fallback("monitors"), "Monitors");
        assert_eq!(display_fallback("spare__parts"), "Spare Parts");
    }

    #[test]
    fn test_audit_kind_names() {
        assert_eq!(AuditKind::Create.as_str(), "create");
        assert_eq!(AuditKind::Delete.as_str(), "delete");
    }

    #[test]
    fn test_audit_event_serializes_kind_lowercase() {
        let event = AuditEvent::new(AuditKind::Update, "Edit3", "Updated \"Laptops\" by Alice");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "update");
        assert_eq!(json["icon"], "Edit3");
    }
}

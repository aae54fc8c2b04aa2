use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque entity identifier, unique within one [`Model`](crate::Model).
///
/// Generated identifiers take the `id-<32 hex>` form. Externally supplied
/// identifiers that parse as a UUID (with or without dashes, with or without
/// the `id-` prefix) are normalized to the same form; anything else passes
/// through unchanged so foreign tool identifiers survive a round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Mints a fresh random identifier.
    pub fn generate() -> Self {
        Id(format!("id-{}", Uuid::new_v4().simple()))
    }

    /// Normalizes an externally supplied identifier.
    pub fn normalize(raw: &str) -> Self {
        let bare = raw.strip_prefix("id-").unwrap_or(raw);
        match Uuid::parse_str(bare) {
            Ok(uuid) => Id(format!("id-{}", uuid.simple())),
            Err(_) => Id(raw.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Id::normalize(raw)
    }
}

impl From<String> for Id {
    fn from(raw: String) -> Self {
        Id::normalize(&raw)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_hex() {
        let id = Id::generate();
        let s = id.as_str();
        assert!(s.starts_with("id-"));
        assert_eq!(s.len(), 3 + 32);
        assert!(s[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(Id::generate(), Id::generate());
    }

    #[test]
    fn uuid_forms_collapse_to_canonical() {
        let canonical = "id-8c90d59a922c4a6f9d0efc04e3b2ba9c";
        for raw in [
            "8c90d59a-922c-4a6f-9d0e-fc04e3b2ba9c",
            "8c90d59a922c4a6f9d0efc04e3b2ba9c",
            "id-8c90d59a-922c-4a6f-9d0e-fc04e3b2ba9c",
            "id-8c90d59a922c4a6f9d0efc04e3b2ba9c",
        ] {
            assert_eq!(Id::normalize(raw).as_str(), canonical);
        }
    }

    #[test]
    fn foreign_ids_pass_through() {
        assert_eq!(Id::normalize("EA-4711").as_str(), "EA-4711");
        assert_eq!(Id::normalize("id-not-a-uuid").as_str(), "id-not-a-uuid");
    }
}

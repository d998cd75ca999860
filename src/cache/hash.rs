//! Content hashing utilities for cache keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::detection::PATTERN_LIBRARY_VERSION;
use crate::introspect::{DetectionAnalysisContext, SchemaFingerprint};

/// Compute SHA256 hash of a serializable value.
///
/// The value is serialized to JSON before hashing, ensuring deterministic output.
/// Returns a 64-character lowercase hexadecimal string.
///
/// # Errors
/// Returns an error if the value cannot be serialized to JSON.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Serialize)]
struct SchemaKey<'a> {
    pattern_library: &'static str,
    facts: SchemaFingerprint<'a>,
}

/// Hash of a context's schema facts and the pattern library version.
///
/// Hints, gaps and the reporter do not participate.
pub fn schema_hash(context: &DetectionAnalysisContext) -> Result<String, serde_json::Error> {
    compute_hash(&SchemaKey {
        pattern_library: PATTERN_LIBRARY_VERSION,
        facts: context.fingerprint(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{ContextHints, RelationshipInfo};
    use serde_json::json;

    #[test]
    fn test_compute_hash_deterministic() {
        let value = json!({"name": "test", "value": 42});
        let hash1 = compute_hash(&value).unwrap();
        let hash2 = compute_hash(&value).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_schema_hash_tracks_facts_only() {
        let context = DetectionAnalysisContext::builder()
            .tables(&["profiles", "posts"])
            .relationship(RelationshipInfo::new("posts", "user_id", "profiles", "id"))
            .build();
        let hinted = context.with_hints(ContextHints {
            framework: Some("makerkit".into()),
            business_logic: None,
        });
        let other = DetectionAnalysisContext::builder().table("profiles").build();

        let hash = schema_hash(&context).unwrap();
        assert_eq!(hash, schema_hash(&hinted).unwrap());
        assert_ne!(hash, schema_hash(&other).unwrap());
    }
}

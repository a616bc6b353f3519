//! File version entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Where a version's binary content lives.
///
/// The `object` key addresses the content within the storage service.
/// Duplicate detection compares only `object`: two uploads landing on the
/// same storage object are the same version even if the surrounding
/// descriptor differs. Dedup is by destination, not by content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionLocation {
    /// The storage service name (e.g. `"filesystem"`, `"s3"`).
    pub service: String,
    /// The bucket/container within the service, if the service has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// The object address within the service.
    pub object: String,
    /// Provider-specific extra descriptor fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VersionLocation {
    /// Create a location with no container and no extra fields.
    pub fn new(service: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            container: None,
            object: object.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether two locations address the same stored object.
    pub fn is_duplicate_of(&self, other: &VersionLocation) -> bool {
        self.object == other.object
    }
}

/// One immutable entry in a file's version history.
///
/// Versions are append-only and densely 1-indexed through `identifier`.
/// After creation the only permitted change is the single metadata
/// enrichment pass performed before the version is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileVersion {
    /// Unique version identifier.
    pub id: Uuid,
    /// The file this version belongs to.
    pub file_id: Uuid,
    /// Sequential 1-indexed version number within the file.
    pub identifier: i32,
    /// The user who created this version.
    pub creator_id: Uuid,
    /// Storage location descriptor.
    #[sqlx(json)]
    pub location: VersionLocation,
    /// Arbitrary metadata mapping (checksums, size, modified time, ...).
    pub metadata: serde_json::Value,
    /// Content size in bytes, lifted from metadata when present.
    pub size: Option<i64>,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

impl FileVersion {
    /// Whether this version stores the same object as `other`.
    pub fn is_duplicate(&self, other: &NewFileVersion) -> bool {
        self.location.is_duplicate_of(&other.location)
    }

    /// The `md5` checksum recorded in metadata, if any.
    pub fn md5(&self) -> Option<&str> {
        self.metadata.get("md5").and_then(|v| v.as_str())
    }

    /// The `sha256` checksum recorded in metadata, if any.
    pub fn sha256(&self) -> Option<&str> {
        self.metadata.get("sha256").and_then(|v| v.as_str())
    }
}

/// A version being assembled before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileVersion {
    /// The file the version belongs to.
    pub file_id: Uuid,
    /// Sequential 1-indexed version number.
    pub identifier: i32,
    /// The user creating the version.
    pub creator_id: Uuid,
    /// Storage location descriptor.
    pub location: VersionLocation,
    /// Metadata mapping; starts empty and is enriched exactly once.
    pub metadata: serde_json::Value,
    /// Content size in bytes, lifted from metadata when present.
    pub size: Option<i64>,
}

impl NewFileVersion {
    /// Start a new version record with empty metadata.
    pub fn new(file_id: Uuid, identifier: i32, creator_id: Uuid, location: VersionLocation) -> Self {
        Self {
            file_id,
            identifier,
            creator_id,
            location,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            size: None,
        }
    }

    /// Merge a metadata object into this version, lifting a numeric `size`
    /// key into the dedicated column.
    ///
    /// This is the single enrichment pass a version receives; it runs
    /// before the version is persisted and never again.
    pub fn update_metadata(&mut self, incoming: &serde_json::Value) {
        let Some(incoming) = incoming.as_object() else {
            return;
        };
        if let serde_json::Value::Object(existing) = &mut self.metadata {
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
        }
        if let Some(size) = incoming.get("size").and_then(|v| v.as_i64()) {
            self.size = Some(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_compares_object_only() {
        let a = VersionLocation::new("s3", "abc123");
        let mut b = VersionLocation::new("filesystem", "abc123");
        b.container = Some("uploads".to_string());
        assert!(a.is_duplicate_of(&b));

        let c = VersionLocation::new("s3", "def456");
        assert!(!a.is_duplicate_of(&c));
    }

    #[test]
    fn test_update_metadata_merges_and_lifts_size() {
        let mut version = NewFileVersion::new(
            Uuid::new_v4(),
            1,
            Uuid::new_v4(),
            VersionLocation::new("filesystem", "abc"),
        );
        version.update_metadata(&json!({"md5": "d41d8", "size": 42}));

        assert_eq!(version.size, Some(42));
        assert_eq!(version.metadata["md5"], "d41d8");
        assert_eq!(version.metadata["size"], 42);
    }

    #[test]
    fn test_update_metadata_ignores_non_object() {
        let mut version = NewFileVersion::new(
            Uuid::new_v4(),
            1,
            Uuid::new_v4(),
            VersionLocation::new("filesystem", "abc"),
        );
        version.update_metadata(&json!("not an object"));
        assert_eq!(version.metadata, json!({}));
        assert_eq!(version.size, None);
    }

    #[test]
    fn test_location_serde_round_trip() {
        let mut location = VersionLocation::new("s3", "abc123");
        location.container = Some("bucket-a".to_string());
        location
            .extra
            .insert("region".to_string(), json!("eu-west-1"));

        let value = serde_json::to_value(&location).expect("serialize");
        assert_eq!(value["region"], "eu-west-1");
        let parsed: VersionLocation = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, location);
    }
}

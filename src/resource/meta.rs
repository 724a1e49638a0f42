//! Resource metadata (`meta`) and content-derived versions.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// RFC 7643 §3.1 `meta` attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub resource_type: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Meta {
    /// Metadata for a resource created now.
    pub fn new(resource_type: impl Into<String>, location: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            resource_type: resource_type.into(),
            created: now,
            last_modified: now,
            location,
            version: None,
        }
    }

    /// Mark the resource modified and recompute its version from `content`.
    pub fn touch(&mut self, content: &[u8]) {
        self.last_modified = Utc::now();
        self.version = Some(weak_etag(content));
    }
}

/// Weak ETag of `content`: base64 of the first 8 bytes of its SHA-256.
pub fn weak_etag(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let hash = hasher.finalize();
    format!("W/\"{}\"", BASE64.encode(&hash[..8]))
}

//! Engine configuration.
//!
//! ```rust
//! use scim_protocol::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{"baseUrl": "https://scim.example.com", "maxResults": 50}"#)
//!     .unwrap()
//!     .with_supported_filter_count(1);
//! assert_eq!(config.max_results, 50);
//! assert_eq!(config.membership_attributes, vec!["members".to_string()]);
//! ```

use crate::error::ScimResult;
use crate::schema::identifiers::attributes;

use serde::{Deserialize, Serialize};

/// Settings shared by the dispatcher, adapters and discovery documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Prefix for `meta.location`, e.g. `https://scim.example.com`
    pub base_url: Option<String>,
    /// Upper bound on resources returned by one query
    pub max_results: usize,
    /// Top-level filters a query may carry
    pub supported_filter_count: usize,
    /// Multi-valued relationship attributes eligible for compact member removal
    pub membership_attributes: Vec<String>,
    pub patch_supported: bool,
    pub filter_supported: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_results: 200,
            supported_filter_count: 1,
            membership_attributes: vec![attributes::MEMBERS.to_string()],
            patch_supported: true,
            filter_supported: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> ScimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_supported_filter_count(mut self, count: usize) -> Self {
        self.supported_filter_count = count;
        self
    }

    pub fn with_membership_attribute(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        if !self
            .membership_attributes
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&attribute))
        {
            self.membership_attributes.push(attribute);
        }
        self
    }

    /// `meta.location` for a resource at `endpoint`/`id`.
    pub fn location(&self, endpoint: &str, id: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}{}/{}", base.trim_end_matches('/'), endpoint, id))
    }
}

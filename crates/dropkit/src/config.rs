//! Dropdown configuration
//!
//! [`DropdownOptions`] is what callers hand to the constructors. Every key is
//! optional; it can be built fluently, or loaded from JSON/TOML for the
//! serialisable part:
//!
//! ```toml
//! placeholder = "Pick a country"
//! allowClear = true
//! dataUrl = "https://example.com/countries.json"
//!
//! [fetchOptions.headers]
//! Authorization = "Bearer abc"
//! ```
//!
//! Construction resolves the options against the host element into an
//! immutable [`Settings`].

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::DataFetcher;

pub const DEFAULT_PLACEHOLDER: &str = "Select an option...";
pub const DEFAULT_SEARCH_PLACEHOLDER: &str = "Search options...";
pub const DEFAULT_ARROW_ICON: &str = "▼";
pub const DEFAULT_NO_RESULTS_TEXT: &str = "No results found";
pub const DEFAULT_DISABLED_SUFFIX: &str = "(disabled)";
pub const DEFAULT_LOADING_TEXT: &str = "Loading...";
pub const DEFAULT_ERROR_TEXT: &str = "Error loading data";

/// Transforms a raw remote payload into option data
pub type DataResolver = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Configuration decode failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Overrides for the outbound data request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// HTTP method, `GET` when unset
    pub method: Option<String>,
    /// Extra headers, merged over the defaults
    pub headers: IndexMap<String, String>,
    /// Request timeout; the transport default applies when unset
    pub timeout_ms: Option<u64>,
}

impl FetchOptions {
    /// Set the method
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Effective method
    pub fn effective_method(&self) -> String {
        self.method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("GET")
            .to_ascii_uppercase()
    }

    /// Default headers with the caller's overrides applied
    ///
    /// Names compare case-insensitively; an override replaces the default in
    /// place and keeps the caller's spelling.
    pub fn merged_headers(&self) -> IndexMap<String, String> {
        let mut merged = IndexMap::new();
        merged.insert("Content-Type".to_string(), "application/json".to_string());
        for (name, value) in &self.headers {
            let existing = merged
                .keys()
                .position(|k: &String| k.eq_ignore_ascii_case(name));
            match existing {
                Some(index) => {
                    merged.shift_remove_index(index);
                    merged.shift_insert(index, name.clone(), value.clone());
                }
                None => {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        merged
    }
}

/// Options accepted by the constructors
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropdownOptions {
    /// Trigger text while nothing is selected
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Search box placeholder
    #[serde(default)]
    pub search_placeholder: Option<String>,
    /// Form field name; also names the hidden input (`{name}Input`)
    #[serde(default)]
    pub name: Option<String>,
    /// Arrow glyph
    #[serde(default)]
    pub arrow_icon: Option<String>,
    #[serde(default)]
    pub no_results_text: Option<String>,
    /// Appended to the labels of disabled options
    #[serde(default)]
    pub disabled_suffix: Option<String>,
    /// Render a control that clears the selection
    #[serde(default)]
    pub allow_clear: bool,
    /// Render the search box
    #[serde(default = "default_enable_search")]
    pub enable_search: bool,
    /// Remote option source
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub loading_text: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
    #[serde(default)]
    pub fetch_options: FetchOptions,
    /// Payload transform applied before decoding
    #[serde(skip)]
    pub data_resolver: Option<DataResolver>,
    /// Replaces the HTTP transport
    #[serde(skip)]
    pub fetcher: Option<Arc<dyn DataFetcher>>,
}

fn default_enable_search() -> bool {
    true
}

impl Default for DropdownOptions {
    fn default() -> Self {
        Self {
            placeholder: None,
            search_placeholder: None,
            name: None,
            arrow_icon: None,
            no_results_text: None,
            disabled_suffix: None,
            allow_clear: false,
            enable_search: default_enable_search(),
            data_url: None,
            loading_text: None,
            error_text: None,
            fetch_options: FetchOptions::default(),
            data_resolver: None,
            fetcher: None,
        }
    }
}

impl std::fmt::Debug for DropdownOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropdownOptions")
            .field("placeholder", &self.placeholder)
            .field("search_placeholder", &self.search_placeholder)
            .field("name", &self.name)
            .field("arrow_icon", &self.arrow_icon)
            .field("no_results_text", &self.no_results_text)
            .field("disabled_suffix", &self.disabled_suffix)
            .field("allow_clear", &self.allow_clear)
            .field("enable_search", &self.enable_search)
            .field("data_url", &self.data_url)
            .field("loading_text", &self.loading_text)
            .field("error_text", &self.error_text)
            .field("fetch_options", &self.fetch_options)
            .field("data_resolver", &self.data_resolver.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl DropdownOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse options from TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn search_placeholder(mut self, text: impl Into<String>) -> Self {
        self.search_placeholder = Some(text.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn arrow_icon(mut self, icon: impl Into<String>) -> Self {
        self.arrow_icon = Some(icon.into());
        self
    }

    pub fn no_results_text(mut self, text: impl Into<String>) -> Self {
        self.no_results_text = Some(text.into());
        self
    }

    pub fn disabled_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.disabled_suffix = Some(suffix.into());
        self
    }

    pub fn allow_clear(mut self, allow: bool) -> Self {
        self.allow_clear = allow;
        self
    }

    pub fn enable_search(mut self, enable: bool) -> Self {
        self.enable_search = enable;
        self
    }

    pub fn data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = Some(url.into());
        self
    }

    pub fn loading_text(mut self, text: impl Into<String>) -> Self {
        self.loading_text = Some(text.into());
        self
    }

    pub fn error_text(mut self, text: impl Into<String>) -> Self {
        self.error_text = Some(text.into());
        self
    }

    pub fn fetch_options(mut self, fetch_options: FetchOptions) -> Self {
        self.fetch_options = fetch_options;
        self
    }

    /// Transform remote payloads before they are decoded
    pub fn data_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.data_resolver = Some(Arc::new(resolver));
        self
    }

    /// Load remote data through a custom fetcher instead of HTTP
    pub fn fetcher(mut self, fetcher: impl DataFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }
}

/// Defaults taken from a native host control
#[derive(Clone, Debug, Default)]
pub struct HostDefaults {
    pub placeholder: Option<String>,
    pub name: Option<String>,
}

/// Resolved, immutable configuration
#[derive(Clone)]
pub struct Settings {
    pub placeholder: String,
    pub search_placeholder: String,
    pub name: String,
    pub arrow_icon: String,
    pub no_results_text: String,
    pub disabled_suffix: String,
    pub allow_clear: bool,
    pub enable_search: bool,
    pub data_url: Option<String>,
    pub loading_text: String,
    pub error_text: String,
    pub fetch_options: FetchOptions,
    pub data_resolver: Option<DataResolver>,
    pub fetcher: Option<Arc<dyn DataFetcher>>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("placeholder", &self.placeholder)
            .field("name", &self.name)
            .field("allow_clear", &self.allow_clear)
            .field("enable_search", &self.enable_search)
            .field("data_url", &self.data_url)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl Settings {
    /// Resolve options for the host with the given id
    ///
    /// Empty strings count as unset.
    pub fn resolve(options: DropdownOptions, element_id: &str, host: HostDefaults) -> Self {
        let text = |value: Option<String>, default: &str| {
            non_empty(value).unwrap_or_else(|| default.to_string())
        };

        Self {
            placeholder: non_empty(options.placeholder)
                .or(non_empty(host.placeholder))
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string()),
            search_placeholder: text(options.search_placeholder, DEFAULT_SEARCH_PLACEHOLDER),
            name: non_empty(options.name)
                .or(non_empty(host.name))
                .unwrap_or_else(|| format!("{element_id}Value")),
            arrow_icon: text(options.arrow_icon, DEFAULT_ARROW_ICON),
            no_results_text: text(options.no_results_text, DEFAULT_NO_RESULTS_TEXT),
            disabled_suffix: text(options.disabled_suffix, DEFAULT_DISABLED_SUFFIX),
            allow_clear: options.allow_clear,
            enable_search: options.enable_search,
            data_url: non_empty(options.data_url),
            loading_text: text(options.loading_text, DEFAULT_LOADING_TEXT),
            error_text: text(options.error_text, DEFAULT_ERROR_TEXT),
            fetch_options: options.fetch_options,
            data_resolver: options.data_resolver,
            fetcher: options.fetcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(DropdownOptions::default(), "country", HostDefaults::default());
        assert_eq!(settings.placeholder, DEFAULT_PLACEHOLDER);
        assert_eq!(settings.name, "countryValue");
        assert_eq!(settings.arrow_icon, "▼");
        assert!(settings.enable_search);
        assert!(!settings.allow_clear);
        assert!(settings.data_url.is_none());
    }

    #[test]
    fn test_host_defaults_yield_to_explicit_options() {
        let host = HostDefaults {
            placeholder: Some("Choose".into()),
            name: Some("fruit".into()),
        };
        let settings = Settings::resolve(DropdownOptions::new(), "f", host.clone());
        assert_eq!(settings.placeholder, "Choose");
        assert_eq!(settings.name, "fruit");

        let settings = Settings::resolve(
            DropdownOptions::new().placeholder("Pick").name(""),
            "f",
            host,
        );
        assert_eq!(settings.placeholder, "Pick");
        assert_eq!(settings.name, "fruit");
    }

    #[test]
    fn test_from_json() {
        let options = DropdownOptions::from_json_str(
            r#"{"placeholder": "Pick", "enableSearch": false, "allowClear": true,
                "fetchOptions": {"headers": {"X-Token": "t"}, "timeoutMs": 500}}"#,
        )
        .unwrap();
        assert_eq!(options.placeholder.as_deref(), Some("Pick"));
        assert!(!options.enable_search);
        assert!(options.allow_clear);
        assert_eq!(options.fetch_options.timeout_ms, Some(500));
        assert_eq!(
            options.fetch_options.headers.get("X-Token").map(String::as_str),
            Some("t")
        );
    }

    #[test]
    fn test_from_toml() {
        let options = DropdownOptions::from_toml_str(
            r#"
            dataUrl = "https://example.com/data.json"
            loadingText = "Fetching"

            [fetchOptions]
            method = "post"

            [fetchOptions.headers]
            Authorization = "Bearer abc"
            "#,
        )
        .unwrap();
        assert!(options.enable_search);
        assert_eq!(options.loading_text.as_deref(), Some("Fetching"));
        assert_eq!(options.fetch_options.effective_method(), "POST");

        assert!(matches!(
            DropdownOptions::from_toml_str("allowClear = \"yes\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_header_merge_is_case_insensitive() {
        let fetch = FetchOptions::default()
            .header("content-type", "text/plain")
            .header("X-Token", "t");
        let headers = fetch.merged_headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("content-type").map(String::as_str), Some("text/plain"));
        assert!(headers.get("Content-Type").is_none());
        assert_eq!(headers.get_index(1).map(|(k, _)| k.as_str()), Some("X-Token"));

        assert_eq!(
            FetchOptions::default().merged_headers().get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }
}

//! Configuration types for a sheet enrichment run.
//!
//! All run behaviour is controlled through [`EnrichConfig`], built via its
//! [`EnrichConfigBuilder`]. The defaults reproduce the behaviour of the
//! production sheet: header names, page limits, fetch timeouts, the 15-page
//! pre-filter and the 70/150 character bounds on value statements.

use crate::error::EnrichError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Provider used when neither the config nor the CLI names one.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used when neither the config nor the CLI names one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Header names binding each semantic field to a sheet column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub source_url: String,
    pub page_count: String,
    pub org_name_text: String,
    pub org_name_image: String,
    pub org_name: String,
    pub value_text: String,
    pub value_image: String,
    pub value_final: String,
    pub securities_code: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            source_url: "URL".into(),
            page_count: "ページ数".into(),
            org_name_text: "組織名T".into(),
            org_name_image: "組織名G".into(),
            org_name: "組織名".into(),
            value_text: "バリューT".into(),
            value_image: "バリューG".into(),
            value_final: "バリュー".into(),
            securities_code: "証券番号".into(),
        }
    }
}

/// Per-field extraction limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSettings {
    /// Pages fed to the text extractor, counted from the first page.
    pub text_pages: usize,
    /// Pages rasterised for the image variant, counted from the first page.
    pub image_pages: usize,
    /// Timeout for the PDF download, in seconds.
    pub fetch_timeout_secs: u64,
}

impl FieldSettings {
    /// Organization names sit on the cover and the first spreads.
    pub const fn organization_name() -> Self {
        Self {
            text_pages: 3,
            image_pages: 3,
            fetch_timeout_secs: 15,
        }
    }

    /// Value statements usually appear within the first ten pages.
    pub const fn value_statement() -> Self {
        Self {
            text_pages: 10,
            image_pages: 10,
            fetch_timeout_secs: 20,
        }
    }
}

/// Configuration for an enrichment run.
///
/// Built via [`EnrichConfig::builder()`] or using [`EnrichConfig::default()`].
///
/// # Example
/// ```rust
/// use report_enrich::EnrichConfig;
///
/// let config = EnrichConfig::builder()
///     .dpi(150)
///     .model("gemini-2.0-flash")
///     .value_min_chars(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct EnrichConfig {
    /// Sheet header names.
    pub columns: ColumnNames,

    /// Limits for the organization-name pipeline.
    pub name: FieldSettings,

    /// Limits for the value-statement pipeline.
    pub value: FieldSettings,

    /// Rows whose page count is at or below this are excluded from name
    /// extraction without a download. Default: 15.
    pub min_page_count: f64,

    /// Rendering DPI for the image variant. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps memory for oversized pages independently of DPI.
    pub max_rendered_pixels: u32,

    /// A merged value statement shorter than this (in characters) is
    /// recorded as failed. Default: 70.
    pub value_min_chars: usize,

    /// Length the model is asked to stay within for value statements. Default: 150.
    pub value_max_chars: usize,

    /// `User-Agent` header sent with PDF downloads.
    pub user_agent: String,

    /// LLM provider name (e.g. "gemini", "openai"). If None, uses [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 1024.
    pub max_tokens: usize,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Receives per-pass and per-row events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            name: FieldSettings::organization_name(),
            value: FieldSettings::value_statement(),
            min_page_count: 15.0,
            dpi: 200,
            max_rendered_pixels: 2000,
            value_min_chars: 70,
            value_max_chars: 150,
            user_agent: "Mozilla/5.0".into(),
            provider_name: None,
            model: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1024,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EnrichConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichConfig")
            .field("columns", &self.columns)
            .field("name", &self.name)
            .field("value", &self.value)
            .field("min_page_count", &self.min_page_count)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("value_min_chars", &self.value_min_chars)
            .field("value_max_chars", &self.value_max_chars)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl EnrichConfig {
    /// Create a new builder for `EnrichConfig`.
    pub fn builder() -> EnrichConfigBuilder {
        EnrichConfigBuilder {
            config: Self::default(),
        }
    }

    /// The provider name in effect.
    pub fn provider_name(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// The model in effect.
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`EnrichConfig`].
pub struct EnrichConfigBuilder {
    config: EnrichConfig,
}

impl EnrichConfigBuilder {
    pub fn columns(mut self, columns: ColumnNames) -> Self {
        self.config.columns = columns;
        self
    }

    pub fn name_settings(mut self, settings: FieldSettings) -> Self {
        self.config.name = settings;
        self
    }

    pub fn value_settings(mut self, settings: FieldSettings) -> Self {
        self.config.value = settings;
        self
    }

    pub fn min_page_count(mut self, pages: f64) -> Self {
        self.config.min_page_count = pages;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn value_min_chars(mut self, n: usize) -> Self {
        self.config.value_min_chars = n;
        self
    }

    pub fn value_max_chars(mut self, n: usize) -> Self {
        self.config.value_max_chars = n;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EnrichConfig, EnrichError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(EnrichError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        for (label, s) in [("name", &c.name), ("value", &c.value)] {
            if s.text_pages == 0 || s.image_pages == 0 {
                return Err(EnrichError::InvalidConfig(format!(
                    "{label} page limits must be ≥ 1"
                )));
            }
            if s.fetch_timeout_secs == 0 {
                return Err(EnrichError::InvalidConfig(format!(
                    "{label} fetch timeout must be ≥ 1s"
                )));
            }
        }
        if c.value_min_chars > c.value_max_chars {
            return Err(EnrichError::InvalidConfig(format!(
                "value_min_chars ({}) exceeds value_max_chars ({})",
                c.value_min_chars, c.value_max_chars
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(EnrichError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_sheet() {
        let c = EnrichConfig::default();
        assert_eq!(c.columns.source_url, "URL");
        assert_eq!(c.columns.page_count, "ページ数");
        assert_eq!(c.name.text_pages, 3);
        assert_eq!(c.name.fetch_timeout_secs, 15);
        assert_eq!(c.value.text_pages, 10);
        assert_eq!(c.value.fetch_timeout_secs, 20);
        assert_eq!(c.value_min_chars, 70);
        assert_eq!(c.provider_name(), "gemini");
        assert_eq!(c.model(), "gemini-2.0-flash");
    }

    #[test]
    fn dpi_is_clamped() {
        let c = EnrichConfig::builder().dpi(1000).build().unwrap();
        assert_eq!(c.dpi, 400);
    }

    #[test]
    fn inverted_length_bounds_rejected() {
        let err = EnrichConfig::builder()
            .value_min_chars(200)
            .value_max_chars(150)
            .build()
            .unwrap_err();
        assert!(matches!(err, EnrichError::InvalidConfig(_)));
    }

    #[test]
    fn zero_page_limit_rejected() {
        let err = EnrichConfig::builder()
            .name_settings(FieldSettings {
                text_pages: 0,
                ..FieldSettings::organization_name()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }
}

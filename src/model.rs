//! Data models for the disguise service
//!
//! Request bodies arrive as loosely typed JSON and are decoded into typed
//! values (see [`TransformRequest::decode`]) before any dispatch logic runs.
//! Persisted records (styles, history) are stored as JSON in redb.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::MAX_TEXT_LENGTH;
use crate::error::ApiError;
use crate::language::Language;

/// Inline style definition sent with `mode = "custom_style"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
}

/// What the caller wants done to the text, keyed by `mode`
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Style(String),
    CustomStyle(StyleConfig),
}

impl Conversion {
    pub fn mode(&self) -> &'static str {
        match self {
            Conversion::Style(_) => "style",
            Conversion::CustomStyle(_) => "custom_style",
        }
    }
}

/// Requested output language; unsupported codes resolve to English
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLanguage {
    #[default]
    Auto,
    Fixed(Language),
}

impl OutputLanguage {
    pub fn parse(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            None | Some("") => OutputLanguage::Auto,
            Some(c) if c.eq_ignore_ascii_case("auto") => OutputLanguage::Auto,
            Some(c) => OutputLanguage::Fixed(Language::from_code(c).unwrap_or(Language::En)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputLanguage::Auto => "auto",
            OutputLanguage::Fixed(lang) => lang.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    #[default]
    Free,
    Custom,
}

/// A caller-supplied vendor key (base64 encoded) and optional model override
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomApiEntry {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub mode: ApiMode,
    #[serde(default)]
    pub active_provider: Option<String>,
    #[serde(default)]
    pub custom_apis: HashMap<String, CustomApiEntry>,
}

/// Body of `POST /api/disguise` as it comes off the wire
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransformRequest {
    pub text: Option<Value>,
    pub mode: Option<Value>,
    pub style: Option<Value>,
    pub style_config: Option<Value>,
    pub output_language: Option<Value>,
    pub api_config: Option<Value>,
}

/// A validated transformation request
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub text: String,
    pub conversion: Conversion,
    pub output_language: OutputLanguage,
    pub api_config: ApiConfig,
}

impl TransformRequest {
    /// Validates a raw body in a fixed order: text, mode, the mode's
    /// parameter, text length, then the optional api configuration
    pub fn decode(raw: RawTransformRequest) -> Result<Self, ApiError> {
        let text = match raw.text {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => {
                return Err(ApiError::InvalidInput(
                    "Text is required and must be a string".to_string(),
                ))
            }
        };

        let mode = raw.mode.as_ref().and_then(Value::as_str);
        let conversion = match mode {
            Some("style") => match raw.style {
                Some(Value::String(s)) if !s.trim().is_empty() => Conversion::Style(s),
                _ => {
                    return Err(ApiError::InvalidInput(
                        "Style is required when mode is 'style'".to_string(),
                    ))
                }
            },
            Some("custom_style") => {
                let config = raw
                    .style_config
                    .and_then(|v| serde_json::from_value::<StyleConfig>(v).ok())
                    .filter(|c| !c.display_name.trim().is_empty())
                    .ok_or_else(|| {
                        ApiError::InvalidInput(
                            "A styleConfig with a displayName is required when mode is 'custom_style'"
                                .to_string(),
                        )
                    })?;
                Conversion::CustomStyle(config)
            }
            _ => {
                return Err(ApiError::InvalidInput(
                    "Mode must be either 'style' or 'custom_style'".to_string(),
                ))
            }
        };

        if text.chars().count() > MAX_TEXT_LENGTH {
            return Err(ApiError::InvalidInput(format!(
                "Text must be {} characters or fewer",
                MAX_TEXT_LENGTH
            )));
        }

        let output_language =
            OutputLanguage::parse(raw.output_language.as_ref().and_then(Value::as_str));

        let api_config = match raw.api_config {
            None | Some(Value::Null) => ApiConfig::default(),
            Some(v) => serde_json::from_value(v).map_err(|_| {
                ApiError::UnsupportedProvider("Invalid API configuration".to_string())
            })?,
        };

        Ok(Self {
            text,
            conversion,
            output_language,
            api_config,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformMetadata {
    pub input_length: usize,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_config_name: Option<String>,
    pub output_language: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl TransformMetadata {
    pub fn for_request(request: &TransformRequest) -> Self {
        let (style, style_config_name) = match &request.conversion {
            Conversion::Style(key) => (Some(key.clone()), None),
            Conversion::CustomStyle(config) => (None, Some(config.display_name.clone())),
        };

        Self {
            input_length: request.text.chars().count(),
            mode: request.conversion.mode(),
            style,
            style_config_name,
            output_language: request.output_language.as_str(),
            timestamp: Utc::now(),
        }
    }
}

/// Successful response of `POST /api/disguise`
#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub success: bool,
    pub result: String,
    pub metadata: TransformMetadata,
}

/// Body of `POST /api/test-api-key`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestKeyRequest {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestKeyResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A style published to the marketplace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRecord {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub prompt_template: Option<String>,
    pub is_public: bool,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/styles`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStyleRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub author_id: Option<String>,
}

/// One stored transformation, as consumed by the analytics aggregator
///
/// Every field has a neutral default so partially filled records still
/// deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryRecord {
    pub id: String,
    pub original: String,
    pub disguised: String,
    pub style: String,
    pub variant: Option<String>,
    pub purpose: Option<String>,
    pub recipient: Option<String>,
    pub conversion_mode: String,
    pub detected_language: String,
    pub output_language: String,
    pub is_favorited: bool,
    pub usage_count: u32,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Body of `POST /api/history`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoryRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub record: HistoryRecord,
}

/// Query parameters for listing history with pagination
///
/// # Example
/// Query string: `?user_id=user_123&page=2&limit=20`
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: Option<String>,

    /// Page number, starts from 1 (default 1)
    pub page: Option<usize>,

    /// Items per page (default 10, maximum 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub user_id: Option<String>,
    /// Number of reused transformations to include (default 10)
    pub top: Option<usize>,
}

/// Accepts RFC 3339 strings or epoch milliseconds; anything else becomes `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawTransformRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_style_request() {
        let req = TransformRequest::decode(raw(json!({
            "text": "Hello",
            "mode": "style",
            "style": "poem",
            "outputLanguage": "ja"
        })))
        .unwrap();

        assert_eq!(req.conversion, Conversion::Style("poem".to_string()));
        assert_eq!(req.output_language, OutputLanguage::Fixed(Language::Ja));
        assert_eq!(req.api_config.mode, ApiMode::Free);
    }

    #[test]
    fn validation_order_reports_text_before_mode() {
        let err = TransformRequest::decode(raw(json!({ "text": 42, "mode": "bogus" }))).unwrap_err();
        assert!(err.to_string().contains("Text is required"));

        let err = TransformRequest::decode(raw(json!({ "text": "hi", "mode": "bogus" }))).unwrap_err();
        assert!(err.to_string().contains("Mode must be"));
    }

    #[test]
    fn mode_parameter_checked_before_length() {
        let long = "a".repeat(MAX_TEXT_LENGTH + 1);
        let err = TransformRequest::decode(raw(json!({ "text": long, "mode": "style" }))).unwrap_err();
        assert!(err.to_string().contains("Style is required"));

        let err = TransformRequest::decode(raw(json!({
            "text": "a".repeat(MAX_TEXT_LENGTH + 1),
            "mode": "style",
            "style": "chat"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("300 characters"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let text = "你".repeat(MAX_TEXT_LENGTH);
        assert!(TransformRequest::decode(raw(json!({
            "text": text,
            "mode": "style",
            "style": "chat"
        })))
        .is_ok());
    }

    #[test]
    fn custom_style_requires_display_name() {
        let err = TransformRequest::decode(raw(json!({
            "text": "hi",
            "mode": "custom_style",
            "styleConfig": { "id": "x", "displayName": "  " }
        })))
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let ok = TransformRequest::decode(raw(json!({
            "text": "hi",
            "mode": "custom_style",
            "styleConfig": { "id": "x", "displayName": "Pirate", "promptTemplate": "Arr" }
        })))
        .unwrap();
        assert_eq!(ok.conversion.mode(), "custom_style");
    }

    #[test]
    fn unknown_output_language_falls_back_to_english() {
        assert_eq!(OutputLanguage::parse(Some("fr")), OutputLanguage::Fixed(Language::En));
        assert_eq!(OutputLanguage::parse(Some("AUTO")), OutputLanguage::Auto);
        assert_eq!(OutputLanguage::parse(None), OutputLanguage::Auto);
    }

    #[test]
    fn malformed_api_config_is_rejected() {
        let err = TransformRequest::decode(raw(json!({
            "text": "hi",
            "mode": "style",
            "style": "chat",
            "apiConfig": { "mode": "enterprise" }
        })))
        .unwrap_err();
        assert_eq!(err.kind(), "Invalid API configuration");
    }

    #[test]
    fn history_record_tolerates_missing_and_malformed_fields() {
        let record: HistoryRecord = serde_json::from_value(json!({
            "original": "hello",
            "createdAt": "not a date"
        }))
        .unwrap();
        assert_eq!(record.original, "hello");
        assert_eq!(record.usage_count, 0);
        assert!(record.created_at.is_none());

        let record: HistoryRecord =
            serde_json::from_value(json!({ "createdAt": 1_700_000_000_000i64 })).unwrap();
        assert!(record.created_at.is_some());
    }
}

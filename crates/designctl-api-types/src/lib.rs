//! Wire types for the design-automation REST API.
//!
//! Field names follow the API's camelCase JSON. Resource types keep unknown
//! fields in `extra` so that JSON output round-trips whatever the server sent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Output formats accepted by the render endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Png,
    Jpg,
    Jpeg,
    Pdf,
    Svg,
}

impl RenderFormat {
    pub const ALL: [RenderFormat; 5] = [
        RenderFormat::Png,
        RenderFormat::Jpg,
        RenderFormat::Jpeg,
        RenderFormat::Pdf,
        RenderFormat::Svg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RenderFormat::Png => "png",
            RenderFormat::Jpg => "jpg",
            RenderFormat::Jpeg => "jpeg",
            RenderFormat::Pdf => "pdf",
            RenderFormat::Svg => "svg",
        }
    }

    /// File extension used for outputs written in this format.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported format `{}` (expected png, jpg, jpeg, pdf or svg)",
            self.0
        )
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for RenderFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(RenderFormat::Png),
            "jpg" => Ok(RenderFormat::Jpg),
            "jpeg" => Ok(RenderFormat::Jpeg),
            "pdf" => Ok(RenderFormat::Pdf),
            "svg" => Ok(RenderFormat::Svg),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Body of `POST render`.
///
/// `width`/`height`/`quality` are omitted unless set; the server applies its
/// own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub format: RenderFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_data: Option<Value>,
    #[serde(rename = "async", default, skip_serializing_if = "is_false")]
    pub is_async: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RenderJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RenderJobStatus::Completed | RenderJobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RenderJobStatus::Pending => "pending",
            RenderJobStatus::Processing => "processing",
            RenderJobStatus::Completed => "completed",
            RenderJobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RenderJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `POST render` with `async: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncRenderAccepted {
    pub job_id: String,
    pub status: RenderJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
}

/// Response of `GET render/{jobId}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub job_id: String,
    pub status: RenderJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
}

/// Paged list envelope used by every collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Design {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Only present in the response that created the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_used_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCreateRequest {
    pub name: String,
}

/// Response of `GET auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Error envelope. Servers send either `{"error": "..."}`,
/// `{"error": {"message": "..."}}` or `{"message": "..."}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<ApiErrorField>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorField {
    Text(String),
    Detailed { message: String },
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        let nested = match self.error {
            Some(ApiErrorField::Text(text)) => Some(text),
            Some(ApiErrorField::Detailed { message }) => Some(message),
            None => None,
        };
        nested
            .or(self.message)
            .filter(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_body_omits_unset_dimensions() {
        let body = RenderRequestBody {
            design_id: Some("d1".into()),
            template_id: None,
            format: RenderFormat::Png,
            quality: None,
            width: None,
            height: None,
            dynamic_data: None,
            is_async: false,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json, serde_json::json!({"designId": "d1", "format": "png"}));
    }

    #[test]
    fn async_flag_serialized_only_when_set() {
        let body = RenderRequestBody {
            design_id: None,
            template_id: Some("t1".into()),
            format: RenderFormat::Pdf,
            quality: Some(150),
            width: Some(0),
            height: None,
            dynamic_data: None,
            is_async: true,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["async"], true);
        assert_eq!(json["quality"], 150);
        assert_eq!(json["width"], 0);
        assert!(json.get("height").is_none());
    }

    #[test]
    fn error_body_prefers_nested_error() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error":{"message":"quota exceeded"},"message":"x"}"#)
                .expect("parse");
        assert_eq!(body.into_message().as_deref(), Some("quota exceeded"));

        let body: ApiErrorBody = serde_json::from_str(r#"{"message":"bad id"}"#).expect("parse");
        assert_eq!(body.into_message().as_deref(), Some("bad id"));

        let body: ApiErrorBody = serde_json::from_str(r#"{"error":""}"#).expect("parse");
        assert_eq!(body.into_message(), None);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("PNG".parse::<RenderFormat>(), Ok(RenderFormat::Png));
        assert!("gif".parse::<RenderFormat>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(RenderJobStatus::Completed.is_terminal());
        assert!(RenderJobStatus::Failed.is_terminal());
        assert!(!RenderJobStatus::Pending.is_terminal());
        assert!(!RenderJobStatus::Processing.is_terminal());
    }
}

//! Render requests as the client builds them, before they hit the wire.

use std::fmt;

use designctl_api_types::{RenderFormat, RenderRequestBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::DomainError;

pub const DEFAULT_QUALITY: u32 = 90;

/// What a render is produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Design(String),
    Template(String),
}

impl RenderTarget {
    pub fn id(&self) -> &str {
        match self {
            Self::Design(id) | Self::Template(id) => id,
        }
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Design(id) => write!(f, "design {id}"),
            Self::Template(id) => write!(f, "template {id}"),
        }
    }
}

/// A render as described by flags, batch entries or watch options.
///
/// The design/template pair is kept loose here so that callers can assemble a
/// request from partial input; [`RenderRequest::target`] enforces that exactly
/// one is present. Quality is not range-checked: the server decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub design_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    pub format: RenderFormat,
    #[serde(default)]
    pub quality: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub dynamic_data: Option<Value>,
}

impl RenderRequest {
    pub fn for_design(design_id: impl Into<String>, format: RenderFormat) -> Self {
        Self {
            design_id: Some(design_id.into()),
            template_id: None,
            format,
            quality: None,
            width: None,
            height: None,
            dynamic_data: None,
        }
    }

    pub fn for_template(template_id: impl Into<String>, format: RenderFormat) -> Self {
        Self {
            design_id: None,
            template_id: Some(template_id.into()),
            format,
            quality: None,
            width: None,
            height: None,
            dynamic_data: None,
        }
    }

    #[must_use]
    pub fn with_dynamic_data(mut self, data: Option<Value>) -> Self {
        self.dynamic_data = data;
        self
    }

    pub fn target(&self) -> Result<RenderTarget, DomainError> {
        let design = non_blank(self.design_id.as_deref());
        let template = non_blank(self.template_id.as_deref());
        match (design, template) {
            (Some(id), None) => Ok(RenderTarget::Design(id.to_string())),
            (None, Some(id)) => Ok(RenderTarget::Template(id.to_string())),
            (None, None) => Err(DomainError::MissingRenderTarget),
            (Some(_), Some(_)) => Err(DomainError::ConflictingRenderTarget),
        }
    }

    /// Build the request body, validating the target first.
    pub fn to_body(&self, is_async: bool) -> Result<RenderRequestBody, DomainError> {
        let target = self.target()?;
        let (design_id, template_id) = match target {
            RenderTarget::Design(id) => (Some(id), None),
            RenderTarget::Template(id) => (None, Some(id)),
        };
        Ok(RenderRequestBody {
            design_id,
            template_id,
            format: self.format,
            quality: self.quality,
            width: self.width,
            height: self.height,
            dynamic_data: self.dynamic_data.clone(),
            is_async,
        })
    }

    /// `<id>.<ext>`, the file name used when no output path is given.
    pub fn default_file_name(&self) -> Result<String, DomainError> {
        let target = self.target()?;
        Ok(format!(
            "{}.{}",
            safe_file_stem(target.id()),
            self.format.extension()
        ))
    }
}

/// Reduce a resource id to `[A-Za-z0-9_-]` so it names a single file
/// inside the output directory.
pub fn safe_file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

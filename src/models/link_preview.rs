use serde::{Deserialize, Serialize};

// ============================================================================
// Open Graph Models
// ============================================================================

/// Open Graph metadata for a page, as extracted by the unfurler.
///
/// Every field is optional: a page may declare any subset of the protocol.
/// Absent fields are left out of the JSON response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenGraphData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub determiner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locale_alternate: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<OgMedia>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<OgMedia>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audio: Vec<OgMedia>,
}

/// One `og:image`, `og:video` or `og:audio` entry with its structured properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OgMedia {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Everything the unfurler learned about a page. `open_graph` is `None` when
/// the page carries no `og:` tags at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub open_graph: Option<OpenGraphData>,
}

// ============================================================================
// Preview Result
// ============================================================================

/// Outcome of resolving one URL. Failure carries no payload; the cause only
/// shows up in logs.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewResult {
    Success { open_graph: OpenGraphData },
    Failure,
}

/// Body of `GET /api/og/get`. Serializes to `{ "result": {...} }` on success
/// and `{ "result": "error" }` on failure, always with HTTP 200.
#[derive(Debug, Serialize)]
pub struct PreviewResponseDto {
    pub result: PreviewPayload,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PreviewPayload {
    OpenGraph(OpenGraphData),
    Error(&'static str),
}

pub const ERROR_SENTINEL: &str = "error";

impl From<PreviewResult> for PreviewResponseDto {
    fn from(result: PreviewResult) -> Self {
        let result = match result {
            PreviewResult::Success { open_graph } => PreviewPayload::OpenGraph(open_graph),
            PreviewResult::Failure => PreviewPayload::Error(ERROR_SENTINEL),
        };
        PreviewResponseDto { result }
    }
}

use serde::{Deserialize, Serialize};

/// One result item produced by a scrape, crawl, or batch-scrape job.
///
/// Every field is optional: the server only returns the formats the job
/// asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// URL of the rendered screenshot, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,

    pub metadata: DocumentMetadata,
}

/// Page-level metadata attached to every [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// HTTP status the target page answered with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

use serde::{Deserialize, Serialize};

/// A block referenced from a shared document's content.
///
/// Serialized as a JSON list into `shares.references`. `ref_count` is carried
/// through untouched; nothing on the server reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReference {
    pub block_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_count: Option<i64>,
}

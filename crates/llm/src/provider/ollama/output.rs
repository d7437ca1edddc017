use serde::Deserialize;

use crate::messages::now_epoch;

/// Response body of the Ollama `/api/chat` endpoint (non-streaming).
#[derive(Debug, Default, Deserialize)]
pub(super) struct OllamaChatResponse {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OllamaMessage {
    #[serde(default)]
    pub content: String,
}

/// Response body of `GET /api/tags`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OllamaTag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl OllamaTag {
    pub fn timestamp(&self) -> Option<&str> {
        self.modified_at.as_deref().or(self.created_at.as_deref())
    }
}

/// Response body of `POST /api/embeddings`. Newer upstreams report a bare
/// `embedding` vector; the indexed `data` form is also accepted.
#[derive(Debug, Default, Deserialize)]
pub(super) struct OllamaEmbeddingsResponse {
    #[serde(default)]
    pub data: Vec<OllamaEmbeddingRow>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OllamaEmbeddingRow {
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl OllamaEmbeddingsResponse {
    pub fn into_vector(self) -> Option<Vec<f32>> {
        if let Some(embedding) = self.embedding {
            return Some(embedding);
        }
        self.data.into_iter().next().map(|row| row.embedding)
    }
}

/// ISO-8601 timestamp to epoch seconds, falling back to "now" when the
/// upstream value is absent or unparseable.
pub(super) fn epoch_from_iso(timestamp: Option<&str>) -> i64 {
    timestamp
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| chrono::DateTime::parse_from_rfc3339(value).ok())
        .map(|parsed| parsed.timestamp())
        .unwrap_or_else(now_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_timestamps_convert_to_epoch() {
        assert_eq!(epoch_from_iso(Some("1970-01-01T00:01:40Z")), 100);
        assert_eq!(
            epoch_from_iso(Some("2023-11-04T14:56:49.277302595-07:00")),
            1_699_135_009
        );
    }

    #[test]
    fn bad_timestamps_fall_back_to_now() {
        let before = now_epoch();
        assert!(epoch_from_iso(Some("not-a-date")) >= before);
        assert!(epoch_from_iso(None) >= before);
        assert!(epoch_from_iso(Some("  ")) >= before);
    }

    #[test]
    fn embeddings_accept_both_wire_shapes() {
        let bare: OllamaEmbeddingsResponse =
            serde_json::from_str(r#"{"embedding":[0.1,0.2]}"#).unwrap();
        assert_eq!(bare.into_vector().unwrap().len(), 2);

        let indexed: OllamaEmbeddingsResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1],"index":0}]}"#).unwrap();
        assert_eq!(indexed.into_vector().unwrap(), vec![0.1]);

        let empty: OllamaEmbeddingsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_vector().is_none());
    }
}

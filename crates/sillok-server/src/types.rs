//! Request/response types for the sillok chat API (§6.1).

use serde::{Deserialize, Serialize};

/// `POST /api/chat` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The raw user query (may embed filter tokens and meta-only markers, §6.4).
    pub query: String,
    /// Opaque session correlator; sillok keeps no conversational memory
    /// keyed on it beyond the single streaming session (§1 Non-goals).
    #[serde(default)]
    pub conversation_id: String,
    /// Whether the answer step may cite beyond the retrieved context (§4.8).
    #[serde(default)]
    pub relax_context: bool,
}

/// One document in a `docs` SSE event payload.
#[derive(Debug, Clone, Serialize)]
pub struct DocPayload {
    /// Stable 1-based display/citation index.
    pub index: usize,
    /// Document title.
    pub title: String,
    /// Document link.
    pub link: String,
    /// Document body, truncated to `DOC_CHAR_LIMIT`.
    pub text: String,
    /// Formatted metadata line.
    pub meta: String,
    /// Best-known fused RRF score for this doc.
    pub rrf_score: Option<f32>,
    /// Best-known dense similarity for this doc.
    pub sim_score: Option<f32>,
}

/// One SSE event payload, tagged by `type` (§6.1).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Cumulative accumulated-context snapshot, emitted once per agent-loop round.
    Docs {
        /// The accumulated doc set, in stable display order.
        documents: Vec<DocPayload>,
    },
    /// One cosmetic chunk of the final answer, paced on the server side.
    Token {
        /// The chunk text, at most `TOKEN_CHUNK_SIZE` characters.
        content: String,
    },
    /// Terminal event: the full concatenation of every emitted token chunk.
    Done {
        /// The complete final answer.
        full_answer: String,
    },
}

/// `GET /api/health` response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` once the process has reached serving state.
    pub status: &'static str,
    /// Unix timestamp (seconds) at the time of the request.
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_event_serializes_with_type_tag() {
        let event = ChatEvent::Docs {
            documents: vec![DocPayload {
                index: 1,
                title: "T".into(),
                link: "L".into(),
                text: "body".into(),
                meta: String::new(),
                rrf_score: Some(0.5),
                sim_score: None,
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"docs\""));
        assert!(json.contains("\"documents\""));
    }

    #[test]
    fn token_event_serializes_with_type_tag() {
        let event = ChatEvent::Token { content: "abc".into() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"token\""));
        assert!(json.contains("\"content\":\"abc\""));
    }

    #[test]
    fn done_event_serializes_full_answer() {
        let event = ChatEvent::Done { full_answer: "hello".into() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"done\""));
        assert!(json.contains("\"full_answer\":\"hello\""));
    }
}

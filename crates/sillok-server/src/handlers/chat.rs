//! Streaming chat handler (§6.1).
//!
//! Drives one [`sillok_core::agent::run`] call per request, forwarding its
//! `on_docs` callback and final answer into an SSE response: a `docs`
//! event per agent-loop round, the answer cosmetically chunked into
//! `token` events, then a terminal `done` event.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, HeaderValue};
use axum::http::HeaderName;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::StreamExt;
use sillok_core::agent::{self, AgentRequest, DocSnapshot};
use sillok_core::constants::{TOKEN_CHUNK_DELAY_MS, TOKEN_CHUNK_SIZE};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::types::{ChatEvent, ChatRequest, DocPayload};
use crate::SharedState;

fn to_payload(docs: &[DocSnapshot]) -> Vec<DocPayload> {
    docs.iter()
        .map(|d| DocPayload {
            index: d.index,
            title: d.title.clone(),
            link: d.link.clone(),
            text: d.text.clone(),
            meta: d.meta.clone(),
            rrf_score: d.rrf_score,
            sim_score: d.sim_score,
        })
        .collect()
}

fn send_event(tx: &mpsc::UnboundedSender<Event>, event: &ChatEvent) {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    let _ = tx.send(Event::default().data(data));
}

/// `POST /api/chat` - streams one agent-loop run as Server-Sent Events.
pub async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();

    tokio::spawn(async move {
        let agent_req = AgentRequest {
            query: req.query,
            relax_context: req.relax_context,
            rerank_enabled: state.rerank_enabled,
        };

        let docs_tx = tx.clone();
        let on_docs = move |docs: &[DocSnapshot]| {
            send_event(
                &docs_tx,
                &ChatEvent::Docs {
                    documents: to_payload(docs),
                },
            );
        };

        let outcome = agent::run(
            &state.store,
            &state.cache,
            state.embedder.as_ref(),
            state.llm.as_ref(),
            &agent_req,
            state.top_k_retrieve,
            state.pre_rerank_top_k,
            on_docs,
        )
        .await;

        let answer = match outcome {
            Ok(o) => o.final_answer,
            Err(e) => {
                tracing::error!(error = %e, "agent run failed");
                sillok_core::constants::NOT_FOUND_MSG.to_string()
            }
        };

        let chars: Vec<char> = answer.chars().collect();
        for chunk in chars.chunks(TOKEN_CHUNK_SIZE) {
            let content: String = chunk.iter().collect();
            send_event(&tx, &ChatEvent::Token { content });
            tokio::time::sleep(Duration::from_millis(TOKEN_CHUNK_DELAY_MS)).await;
        }

        send_event(
            &tx,
            &ChatEvent::Done {
                full_answer: answer,
            },
        );
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    let sse = Sse::new(stream).keep_alive(KeepAlive::default());

    let mut response = sse.into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response.headers_mut().insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

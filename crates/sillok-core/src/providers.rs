//! Embedding and LLM provider capability traits (§4.12, §6.5).
//!
//! The planner, reranker, and agent loop are generic over these traits
//! rather than over any concrete provider SDK, so the core crate never
//! depends on an HTTP client or a specific model vendor. Production
//! binaries supply a concrete implementation; tests supply a deterministic
//! stub.

use async_trait::async_trait;

use crate::error::Result;

/// Produces dense embeddings for one or more query strings.
///
/// Implementations should normalize vectors (e.g. L2) if the dense index
/// they are paired with assumes normalized inputs; this trait does not
/// mandate a convention, since [`crate::index::dense::DenseIndex::search`]
/// computes cosine similarity directly.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of strings, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Embedder`] if the provider call fails.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A single-turn text completion call, the unit of interaction the agent
/// loop and query planner build on.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Completes `prompt`, returning the raw model output text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Llm`] if the provider call fails.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod stub {
    //! Deterministic test doubles for [`super::Embedder`] and [`super::Llm`].

    use super::{Embedder, Llm};
    use crate::error::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Embeds every string to a fixed-length vector derived from a simple
    /// character hash, so that identical strings always embed identically
    /// and distinct strings are very unlikely to collide.
    pub struct StubEmbedder {
        dim: usize,
    }

    impl StubEmbedder {
        /// Creates a stub embedder producing `dim`-dimensional vectors.
        #[must_use]
        pub fn new(dim: usize) -> Self {
            Self { dim }
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| hash_embed(t, self.dim)).collect())
        }
    }

    fn hash_embed(text: &str, dim: usize) -> Vec<f32> {
        let mut vec = vec![0.0f32; dim];
        for (i, b) in text.bytes().enumerate() {
            vec[i % dim] += f32::from(b);
        }
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vec {
                *x /= norm;
            }
        }
        vec
    }

    /// Returns a fixed, queued sequence of responses, one per call, cycling
    /// the last response once the queue is exhausted.
    pub struct ScriptedLlm {
        responses: Mutex<std::collections::VecDeque<String>>,
    }

    impl ScriptedLlm {
        /// Creates a scripted LLM that returns each of `responses` in order.
        #[must_use]
        pub fn new(responses: Vec<String>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl Llm for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let mut q = self.responses.lock();
            if q.len() > 1 {
                Ok(q.pop_front().unwrap_or_default())
            } else {
                Ok(q.front().cloned().unwrap_or_default())
            }
        }
    }

}

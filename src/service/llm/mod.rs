pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{ConversationTurn, Res};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM providers to be used with the gatekeeper-bot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Generate a reply to `prompt`, given the prior turns of the conversation.
    ///
    /// The history always alternates user and model turns, oldest first.  Any
    /// failure (quota, content filtering, network) is reported as an error.
    async fn generate(&self, prompt: &str, history: &[ConversationTurn]) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}

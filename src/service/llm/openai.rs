//! OpenAI implementation of the LLM service.
//!
//! Uses the responses API: prior conversation turns become alternating
//! user/assistant input messages, followed by the new prompt.

use std::sync::Arc;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{Content, CreateResponseArgs, Input, InputItem, InputMessageArgs, OutputContent, Response, Role, TextConfig, TextResponseFormat},
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{ConversationTurn, GovernorError, Res, Role as TurnRole},
};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::generate", skip_all)]
    async fn generate(&self, prompt: &str, history: &[ConversationTurn]) -> Res<String> {
        let input = build_input(prompt, history)?;

        let mut request = CreateResponseArgs::default();
        request
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_model)
            .text(TextConfig { format: TextResponseFormat::Text })
            .input(input);

        // Add the temperature for the non-reasoning models.
        if self.config.openai_model.starts_with("gpt") {
            request.temperature(self.config.openai_temperature);
        }

        let response = self
            .client
            .responses()
            .create(request.build()?)
            .await
            .map_err(|e| GovernorError::CollaboratorFailure(e.to_string()))?;

        let text = parse_openai_response(&response);

        if text.trim().is_empty() {
            return Err(GovernorError::CollaboratorFailure("The model returned an empty reply.".to_string()).into());
        }

        info!("Generated a reply of {} characters.", text.chars().count());

        Ok(text)
    }
}

/// Build the responses API input from the history and the new prompt.
fn build_input(prompt: &str, history: &[ConversationTurn]) -> Res<Input> {
    let mut items = Vec::with_capacity(history.len() + 1);

    for turn in history {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Model => Role::Assistant,
        };

        items.push(InputItem::Message(InputMessageArgs::default().role(role).content(turn.text.clone()).build()?));
    }

    items.push(InputItem::Message(InputMessageArgs::default().role(Role::User).content(prompt.to_string()).build()?));

    Ok(Input::Items(items))
}

/// Concatenate every output text of the response.
#[instrument(skip_all)]
fn parse_openai_response(response: &Response) -> String {
    let mut texts = Vec::new();

    debug!("LLM response has {} outputs.", response.output.len());
    for output in &response.output {
        if let OutputContent::Message(message) = output {
            for content in &message.content {
                if let Content::OutputText(text) = content {
                    texts.push(text.text.clone());
                }
            }
        }
    }

    texts.join("\n")
}

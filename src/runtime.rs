//! Runtime services and shared state for the gatekeeper-bot.

use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::dispatch::Dispatcher,
    service::{chat::ChatClient, llm::LlmClient, lookup::LookupClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the service clients and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The lookup client instance.
    pub lookup: LookupClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Initialize the lookup client.
        let lookup = LookupClient::web();

        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        Ok(Self { config, llm, chat, lookup })
    }

    /// Build the dispatcher that handles inbound events.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.config.clone(), self.chat.clone(), self.llm.clone(), self.lookup.clone())
    }

    /// Listen for events until the chat client shuts down or a shutdown signal arrives.
    ///
    /// Stopping only ends the listener; events already being handled are not interrupted here.
    pub async fn start(&self) -> Void {
        tokio::select! {
            result = self.chat.start(self.dispatcher()) => result,
            _ = shutdown_signal() => {
                info!("Shutdown signal received; no longer accepting events.");
                Ok(())
            }
        }
    }
}

/// Resolves on SIGTERM (unix only); Ctrl-C is handled by the chat listener itself.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!("Could not install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    std::future::pending::<()>().await;
}

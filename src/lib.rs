//! Library root for `gatekeeper-bot`.
//!
//! Gatekeeper-bot is a chat bot that governs how each user interacts with it:
//! - Classifies every inbound message (command, mention, reply, or noise)
//! - Throttles abusive senders with a sliding-window spam detector and cooldowns
//! - Keeps bounded per-user conversation memory for LLM-backed chat
//! - Delivers replies resiliently, with paced retries and chunking
//!
//! The bot integrates with Slack for chat, OpenAI for replies, and a handful of
//! public web APIs for its commands.  The architecture is built around
//! extensible traits that allow for different implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the gatekeeper-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with LLM, lookup, and chat clients
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting gatekeeper-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    info!("Listener stopped; gatekeeper-bot is shutting down.");

    Ok(())
}

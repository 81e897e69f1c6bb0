//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for various services used by the gatekeeper-bot:
//! - Chat services (e.g., Slack)
//! - LLM services (e.g., OpenAI)
//! - Lookup services behind the bot's commands (cat images, anime, Pokémon)
//! - Per-user state storage
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod llm;
pub mod lookup;
pub mod store;

//! Event handling and user interactions for gatekeeper-bot.
//!
//! This module turns inbound chat events into bot behavior:
//! - Classifying events into intents
//! - Throttling abusive senders
//! - Keeping bounded per-user conversation memory
//! - Delivering replies resiliently
//! - Coordinating the above per event

pub mod abuse;
pub mod chat;
pub mod classify;
pub mod commands;
pub mod conversation;
pub mod delivery;
pub mod dispatch;

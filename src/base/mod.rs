//! Core components, types, and utilities for the gatekeeper-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System prompts and user-facing notices.
//! - Common types and result handling.

pub mod config;
pub mod prompts;
pub mod types;

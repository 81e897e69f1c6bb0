//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default OpenAI model to use for chat.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default sampling temperature for the chat model.
fn default_openai_temperature() -> f32 {
    0.7
}

/// Default max output tokens for the chat model.
fn default_openai_max_tokens() -> u32 {
    2048
}

/// Default system directive for the chat model.
fn default_system_directive() -> String {
    prompts::CHAT_SYSTEM_DIRECTIVE.to_string()
}

/// Default command prefix.
fn default_command_prefix() -> String {
    "y!".to_string()
}

/// Default name of the command that routes to the chat handler.
fn default_chat_command() -> String {
    "chat".to_string()
}

/// Default sliding window for the spam detector, in milliseconds.
fn default_abuse_window_ms() -> u64 {
    5_000
}

/// Default number of requests inside the window that counts as spam.
fn default_spam_threshold() -> usize {
    3
}

/// Default cooldown imposed on a spammer, in milliseconds.
fn default_spam_cooldown_ms() -> u64 {
    10_000
}

/// Default cooldown imposed after every allowed request, in milliseconds.
fn default_cooldown_ms() -> u64 {
    5_000
}

/// Default number of user/model pairs kept per user.
fn default_history_pair_limit() -> usize {
    10
}

/// Default maximum number of visible lines in a chat reply.
fn default_max_visible_lines() -> usize {
    20
}

/// Default maximum characters per outbound message.
fn default_chunk_size() -> usize {
    2000
}

/// Default pacing delay inserted before every send attempt, in milliseconds.
fn default_send_pacing_ms() -> u64 {
    3_000
}

/// Default total number of send attempts.
fn default_send_attempts() -> u32 {
    3
}

/// Default delay before the restricted-channel notice is deleted, in milliseconds.
fn default_restricted_notice_ttl_ms() -> u64 {
    5_000
}

/// Default emoji used to acknowledge a chat request.
fn default_ack_reaction() -> String {
    "smile_cat".to_string()
}

/// Configuration for the gatekeeper-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model used for chat (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature for the chat model (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for the chat model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// System directive prepended to every chat prompt (`SYSTEM_DIRECTIVE`).
    #[serde(default = "default_system_directive")]
    pub system_directive: String,

    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,

    /// The only guild (Slack team) the bot answers in (`ALLOWED_GUILD_ID`).
    pub allowed_guild_id: String,
    /// The only non-DM channel the bot answers in (`ALLOWED_CHANNEL_ID`).
    pub allowed_channel_id: String,
    /// Channel where the bot posts a short-lived refusal instead (`RESTRICTED_CHANNEL_ID`).
    pub restricted_channel_id: String,
    /// Command prefix (`COMMAND_PREFIX`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Command name that routes to the chat handler (`CHAT_COMMAND`).
    #[serde(default = "default_chat_command")]
    pub chat_command: String,

    /// Sliding window of the spam detector (`ABUSE_WINDOW_MS`).
    #[serde(default = "default_abuse_window_ms")]
    pub abuse_window_ms: u64,
    /// Requests inside the window that trip the spam detector (`SPAM_THRESHOLD`).
    #[serde(default = "default_spam_threshold")]
    pub spam_threshold: usize,
    /// Cooldown after spam is detected (`SPAM_COOLDOWN_MS`).
    #[serde(default = "default_spam_cooldown_ms")]
    pub spam_cooldown_ms: u64,
    /// Cooldown after every allowed request (`COOLDOWN_MS`).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// User/model pairs kept per user (`HISTORY_PAIR_LIMIT`).
    #[serde(default = "default_history_pair_limit")]
    pub history_pair_limit: usize,
    /// Non-blank lines shown before a reply is elided (`MAX_VISIBLE_LINES`).
    #[serde(default = "default_max_visible_lines")]
    pub max_visible_lines: usize,
    /// Maximum characters per outbound message (`CHUNK_SIZE`).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Delay before every send attempt (`SEND_PACING_MS`).
    #[serde(default = "default_send_pacing_ms")]
    pub send_pacing_ms: u64,
    /// Total send attempts before giving up (`SEND_ATTEMPTS`).
    #[serde(default = "default_send_attempts")]
    pub send_attempts: u32,
    /// Lifetime of the restricted-channel notice (`RESTRICTED_NOTICE_TTL_MS`).
    #[serde(default = "default_restricted_notice_ttl_ms")]
    pub restricted_notice_ttl_ms: u64,
    /// Reaction added to acknowledge a chat request (`ACK_REACTION`).
    #[serde(default = "default_ack_reaction")]
    pub ack_reaction: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            openai_temperature: default_openai_temperature(),
            openai_max_tokens: default_openai_max_tokens(),
            system_directive: default_system_directive(),
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            allowed_guild_id: String::new(),
            allowed_channel_id: String::new(),
            restricted_channel_id: String::new(),
            command_prefix: default_command_prefix(),
            chat_command: default_chat_command(),
            abuse_window_ms: default_abuse_window_ms(),
            spam_threshold: default_spam_threshold(),
            spam_cooldown_ms: default_spam_cooldown_ms(),
            cooldown_ms: default_cooldown_ms(),
            history_pair_limit: default_history_pair_limit(),
            max_visible_lines: default_max_visible_lines(),
            chunk_size: default_chunk_size(),
            send_pacing_ms: default_send_pacing_ms(),
            send_attempts: default_send_attempts(),
            restricted_notice_ttl_ms: default_restricted_notice_ttl_ms(),
            ack_reaction: default_ack_reaction(),
        }
    }
}

impl ConfigInner {
    pub fn abuse_window(&self) -> Duration {
        Duration::from_millis(self.abuse_window_ms)
    }

    pub fn spam_cooldown(&self) -> Duration {
        Duration::from_millis(self.spam_cooldown_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn send_pacing(&self) -> Duration {
        Duration::from_millis(self.send_pacing_ms)
    }

    pub fn restricted_notice_ttl(&self) -> Duration {
        Duration::from_millis(self.restricted_notice_ttl_ms)
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("GATEKEEPER_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Reject values the interaction layer cannot operate with.
    pub fn validate(&self) -> Res<()> {
        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.command_prefix.is_empty() {
            return Err(anyhow::anyhow!("Command prefix must not be empty."));
        }

        if self.spam_threshold < 1 {
            return Err(anyhow::anyhow!("Spam threshold must be at least 1."));
        }

        if self.history_pair_limit < 1 {
            return Err(anyhow::anyhow!("History pair limit must be at least 1."));
        }

        if self.max_visible_lines < 2 {
            return Err(anyhow::anyhow!("Max visible lines must be at least 2."));
        }

        if self.chunk_size < 1 || self.chunk_size > 2000 {
            return Err(anyhow::anyhow!("Chunk size must be between 1 and 2000."));
        }

        if self.send_attempts < 1 {
            return Err(anyhow::anyhow!("Send attempts must be at least 1."));
        }

        Ok(())
    }
}

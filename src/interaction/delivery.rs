//! Resilient outbound delivery.
//!
//! Every message the bot posts goes through [`DeliveryManager`], which checks
//! send permission, paces each attempt to stay clear of platform rate limits,
//! retries a fixed number of times, splits oversized content, and manages the
//! transient "processing" indicator.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{ChannelRef, GovernorError},
    },
    service::chat::ChatClient,
};

/// Characters of content included in delivery logs.
const LOG_PREVIEW_CHARS: usize = 200;

/// Handle to a transient "processing" message.
///
/// Deliberately not `Clone`: [`DeliveryManager::delete_indicator`] consumes it,
/// so it is deleted at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending indicator must be deleted before the event's handling returns"]
pub struct PendingIndicator {
    channel: ChannelRef,
    message_id: String,
}

impl PendingIndicator {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

/// Outcome of a paced, retried send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered; carries the platform ID of the (last) posted message.
    Sent(String),
    /// Every attempt failed.
    Failed,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent(_))
    }
}

/// Outbound message sender with permission checks, pacing, retries and chunking.
///
/// This is trivially cloneable.
#[derive(Clone)]
pub struct DeliveryManager {
    chat: ChatClient,
    pacing: Duration,
    attempts: u32,
    chunk_size: usize,
}

impl DeliveryManager {
    pub fn new(config: &Config, chat: ChatClient) -> Self {
        Self {
            chat,
            pacing: config.send_pacing(),
            attempts: config.send_attempts,
            chunk_size: config.chunk_size,
        }
    }

    /// Post a "processing" indicator.
    ///
    /// Best effort: a single unpaced attempt; failures are logged and yield `None`.
    #[instrument(skip(self, text), fields(channel = %channel.id))]
    pub async fn send_processing_indicator(&self, channel: &ChannelRef, text: &str) -> Option<PendingIndicator> {
        let result = match self.ensure_can_send(channel).await {
            Ok(()) => self.chat.send_message(channel, text).await.map_err(|e| GovernorError::TransportFailure(e.to_string())),
            Err(err) => Err(err),
        };

        match result {
            Ok(message_id) => {
                info!(sent_at = %Utc::now().to_rfc3339(), channel = %channel.id, "Sent processing indicator: {}", preview(text));
                Some(PendingIndicator {
                    channel: channel.clone(),
                    message_id,
                })
            }
            Err(err) => {
                warn!(channel = %channel.id, "Could not send processing indicator: {}", err);
                None
            }
        }
    }

    /// Delete a processing indicator.  Failures are logged and swallowed.
    pub async fn delete_indicator(&self, indicator: PendingIndicator) {
        self.delete_message(&indicator.channel, &indicator.message_id).await;
    }

    /// Delete a message the bot posted.  Failures are logged and swallowed.
    #[instrument(skip(self), fields(channel = %channel.id))]
    pub async fn delete_message(&self, channel: &ChannelRef, message_id: &str) {
        match self.chat.delete_message(channel, message_id).await {
            Ok(()) => info!(deleted_at = %Utc::now().to_rfc3339(), channel = %channel.id, "Deleted message {}.", message_id),
            Err(err) => warn!(channel = %channel.id, "Could not delete message {}: {}", message_id, err),
        }
    }

    /// Send `content` as a single message.
    ///
    /// Each attempt checks permission and waits the pacing delay first.  A
    /// permission failure is retried like a transport failure.
    #[instrument(skip(self, content), fields(channel = %channel.id))]
    pub async fn send(&self, channel: &ChannelRef, content: &str) -> Delivery {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            match self.try_send(channel, content).await {
                Ok(message_id) => {
                    info!(sent_at = %Utc::now().to_rfc3339(), channel = %channel.id, attempt, "Sent: {}", preview(content));
                    return Delivery::Sent(message_id);
                }
                Err(err) => {
                    warn!(channel = %channel.id, attempt, "Send attempt {}/{} failed: {}", attempt, self.attempts, err);
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = last_error {
            error!(channel = %channel.id, "Giving up after {} attempts ({}): {}", self.attempts, err, preview(content));
        }

        Delivery::Failed
    }

    /// Split `content` to the chunk size and send the pieces in order.
    ///
    /// Stops at the first piece that cannot be delivered.
    pub async fn send_chunked(&self, channel: &ChannelRef, content: &str) -> Delivery {
        let mut delivery = Delivery::Failed;

        for piece in chunk(content, self.chunk_size) {
            delivery = self.send(channel, &piece).await;

            if !delivery.is_sent() {
                return Delivery::Failed;
            }
        }

        delivery
    }

    /// React to a message if the bot may; skipped (and logged) otherwise.
    pub async fn react(&self, channel: &ChannelRef, message_id: &str, emoji: &str) {
        let allowed = channel.is_direct || self.chat.can_react(channel).await.unwrap_or(false);

        if !allowed {
            let err = GovernorError::PermissionDenied { channel_id: channel.id.clone() };
            debug!("Skipping reaction: {}", err);
            return;
        }

        if let Err(err) = self.chat.react_to_message(channel, message_id, emoji).await {
            warn!(channel = %channel.id, "Could not react to message {}: {}", message_id, err);
        }
    }

    /// Show a typing indicator; failures are logged and swallowed.
    pub async fn typing(&self, channel: &ChannelRef) {
        if let Err(err) = self.chat.send_typing(channel).await {
            debug!(channel = %channel.id, "Could not send typing indicator: {}", err);
        }
    }

    async fn try_send(&self, channel: &ChannelRef, content: &str) -> Result<String, GovernorError> {
        self.ensure_can_send(channel).await?;

        tokio::time::sleep(self.pacing).await;

        self.chat.send_message(channel, content).await.map_err(|e| GovernorError::TransportFailure(e.to_string()))
    }

    async fn ensure_can_send(&self, channel: &ChannelRef) -> Result<(), GovernorError> {
        if channel.is_direct {
            return Ok(());
        }

        match self.chat.can_send(channel).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GovernorError::PermissionDenied { channel_id: channel.id.clone() }),
            Err(err) => Err(GovernorError::TransportFailure(err.to_string())),
        }
    }
}

/// Split `content` into pieces of at most `max_len` characters.
///
/// Lossless and order-preserving; never splits inside a character.  Empty
/// content yields a single empty piece.
pub fn chunk(content: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let chars = content.chars().collect::<Vec<_>>();

    if chars.is_empty() {
        return vec![String::new()];
    }

    chars.chunks(max_len).map(|piece| piece.iter().collect()).collect()
}

/// Truncate content for log lines.
fn preview(content: &str) -> String {
    content.chars().take(LOG_PREVIEW_CHARS).collect()
}

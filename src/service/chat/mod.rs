pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    base::types::{ChannelRef, FetchedMessage, Res, Void},
    interaction::dispatch::Dispatcher,
};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Slack. Implementing this trait allows different chat services to be used
/// with the gatekeeper-bot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to detect mentions and replies addressed to the bot.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Every inbound message event is translated into an `InboundEvent` and
    /// handed to the dispatcher.  Returns once the listener shuts down.
    async fn start(&self, dispatcher: Dispatcher) -> Void;

    /// Whether the bot may post messages in the channel.
    async fn can_send(&self, channel: &ChannelRef) -> Res<bool>;

    /// Whether the bot may add reactions in the channel.
    async fn can_react(&self, channel: &ChannelRef) -> Res<bool>;

    /// Send a message to a channel.
    ///
    /// Returns the platform ID of the posted message.
    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Res<String>;

    /// Delete a message previously posted by the bot.
    async fn delete_message(&self, channel: &ChannelRef, message_id: &str) -> Void;

    /// Fetch a single message, e.g. the one an event replies to.
    async fn fetch_message(&self, channel: &ChannelRef, message_id: &str) -> Res<FetchedMessage>;

    /// React to a message with an emoji.
    async fn react_to_message(&self, channel: &ChannelRef, message_id: &str, emoji: &str) -> Void;

    /// Show a typing indicator in the channel, where the platform supports one.
    async fn send_typing(&self, channel: &ChannelRef) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}

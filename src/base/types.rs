use std::time::Duration;

use thiserror::Error;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Opaque identifier of a message sender on the chat platform.
pub type UserId = String;

/// The channel an event arrived in (or a message is sent to).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRef {
    /// Platform channel ID.
    pub id: String,
    /// Whether this is a direct-message channel with a single user.
    pub is_direct: bool,
}

impl ChannelRef {
    pub fn new(id: impl Into<String>, is_direct: bool) -> Self {
        Self { id: id.into(), is_direct }
    }
}

/// A platform-neutral inbound message event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    /// The author of the message.
    pub author_id: UserId,
    /// Whether the author is a bot account.
    pub author_is_bot: bool,
    /// The guild (workspace / team) the message was posted in, if any.
    pub guild_id: Option<String>,
    /// The channel the message was posted in.
    pub channel: ChannelRef,
    /// The platform ID of the message itself.
    pub message_id: String,
    /// Raw message text.
    pub text: String,
    /// Users explicitly mentioned in the message.
    pub mentions: Vec<UserId>,
    /// The message this one replies to, if any.
    pub referenced_message_id: Option<String>,
}

/// A message fetched back from the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedMessage {
    pub id: String,
    /// Author of the message; `None` when the platform does not report one.
    pub author_id: Option<UserId>,
}

/// The classified purpose of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Noise: not addressed to the bot, or outside the allowed scope.
    Ignore,
    /// Posted in the channel where the bot refuses to operate.
    RestrictedChannel,
    /// A prefixed command other than the chat command.
    Command { name: String, args: Vec<String> },
    /// Free-form chat addressed to the bot.
    Chat { text: String, trigger: ChatTrigger },
}

/// How a chat intent addressed the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTrigger {
    /// The prefixed chat command.
    Command,
    /// A mention of the bot, or a reply to one of its messages.
    Mention,
}

/// Result of running a user through the abuse guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    CooldownActive { remaining: Duration },
    SpamDetected,
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A single turn of a user's conversation with the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// Terminal state of handling one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Ignored,
}

/// Failures the interaction layer distinguishes between.
///
/// None of these are fatal to the dispatch loop; each one ends up as a log line
/// and, where appropriate, a short notice in the chat.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// The bot lacks the capability (send, react) in the target channel.
    #[error("missing permission in channel {channel_id}")]
    PermissionDenied { channel_id: String },

    /// The platform rejected or failed to carry an outbound call.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The generative model (or another external collaborator) failed.
    #[error("{0}")]
    CollaboratorFailure(String),

    /// A referenced message could not be fetched.
    #[error("lookup failure: {0}")]
    LookupFailure(String),
}

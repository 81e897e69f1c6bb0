//! Slack implementation of the chat service.
//!
//! Slack concepts map onto the platform-neutral event model as follows:
//! - the workspace (team) plays the role of the guild,
//! - `im` channels are direct messages,
//! - a message posted in a thread references the thread's parent message.

use crate::{
    base::{
        config::Config,
        types::{ChannelRef, FetchedMessage, InboundEvent, Res, Void},
    },
    interaction::{self, dispatch::Dispatcher},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use regex::Regex;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::{
    ops::Deref,
    sync::{Arc, OnceLock},
};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    dispatcher: Dispatcher,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub bot_user_id: String,
    pub client: Arc<FullClient>,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }

    /// Whether the bot is a member of the channel; Slack only lets members post and react.
    async fn is_member(&self, channel: &ChannelRef) -> Res<bool> {
        if channel.is_direct {
            return Ok(true);
        }

        let request = SlackApiConversationsInfoRequest::new(SlackChannelId(channel.id.clone()));
        let session = self.client.open_session(&self.bot_token);

        let response = session.conversations_info(&request).await.map_err(|e| anyhow::anyhow!("Failed to get channel info: {}", e))?;

        Ok(response.channel.flags.is_member.unwrap_or(false))
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, dispatcher: Dispatcher) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { dispatcher }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Serve until Ctrl-C; handlers already in flight keep running on their own tasks.
        socket_mode_listener.serve().await;

        Ok(())
    }

    async fn can_send(&self, channel: &ChannelRef) -> Res<bool> {
        self.is_member(channel).await
    }

    async fn can_react(&self, channel: &ChannelRef) -> Res<bool> {
        self.is_member(channel).await
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Res<String> {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel.id.clone()), message).with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let response = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(response.ts.0)
    }

    #[instrument(skip(self))]
    async fn delete_message(&self, channel: &ChannelRef, message_id: &str) -> Void {
        let request = SlackApiChatDeleteRequest::new(SlackChannelId(channel.id.clone()), SlackTs(message_id.to_string()));

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_delete(&request).await.map_err(|e| anyhow::anyhow!("Failed to delete message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_message(&self, channel: &ChannelRef, message_id: &str) -> Res<FetchedMessage> {
        let request = SlackApiConversationsRepliesRequest::new(SlackChannelId(channel.id.clone()), SlackTs(message_id.to_string())).with_limit(1);
        let session = self.client.open_session(&self.bot_token);

        let response = session.conversations_replies(&request).await.map_err(|e| anyhow::anyhow!("Failed to fetch message: {}", e))?;

        let message = response
            .messages
            .into_iter()
            .find(|m| m.origin.ts.0 == message_id)
            .ok_or_else(|| anyhow::anyhow!("Message `{message_id}` not found."))?;

        Ok(FetchedMessage {
            id: message.origin.ts.0,
            author_id: message.sender.user.map(|u| u.0),
        })
    }

    #[instrument(skip(self))]
    async fn react_to_message(&self, channel: &ChannelRef, message_id: &str, emoji: &str) -> Void {
        let request = SlackApiReactionsAddRequest {
            channel: SlackChannelId(channel.id.clone()),
            name: SlackReactionName(emoji.to_string()),
            timestamp: SlackTs(message_id.to_string()),
        };

        let session = self.client.open_session(&self.bot_token);

        let _ = session.reactions_add(&request).await.map_err(|e| anyhow::anyhow!("Failed to react to message: {}", e))?;

        Ok(())
    }

    async fn send_typing(&self, channel: &ChannelRef) -> Void {
        // The Web API has no typing indicator for bots.
        debug!("Typing indicator is not supported on Slack (channel {}).", channel.id);
        Ok(())
    }
}

// Event translation.

/// Extract the user IDs of every `<@U…>` mention in a Slack message.
fn extract_mentions(text: &str) -> Vec<String> {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    let mention = MENTION.get_or_init(|| Regex::new(r"<@([A-Z0-9]+)(?:\|[^>]*)?>").expect("mention pattern is valid"));

    mention.captures_iter(text).map(|c| c[1].to_string()).collect()
}

/// Convert a Slack message event into a platform-neutral event.
///
/// Returns `None` for message subtypes (edits, deletions, joins, ...) and events
/// without a channel or author, none of which are user messages.
fn to_inbound_event(team_id: &SlackTeamId, event: SlackMessageEvent) -> Option<InboundEvent> {
    if event.subtype.is_some() {
        return None;
    }

    let channel_id = event.origin.channel?.0;
    let is_direct = event.origin.channel_type.as_ref().is_some_and(|t| t.0 == "im");
    let author_is_bot = event.sender.bot_id.is_some();
    let author_id = event.sender.user.map(|u| u.0).or_else(|| event.sender.bot_id.map(|b| b.0))?;
    let text = event.content.and_then(|c| c.text).unwrap_or_default();
    let message_id = event.origin.ts.0;

    // A reply in a thread references the thread's parent.
    let referenced_message_id = event.origin.thread_ts.map(|ts| ts.0).filter(|ts| *ts != message_id);

    Some(InboundEvent {
        author_id,
        author_is_bot,
        guild_id: if is_direct { None } else { Some(team_id.0.clone()) },
        channel: ChannelRef::new(channel_id, is_direct),
        message_id,
        mentions: extract_mentions(&text),
        text,
        referenced_message_id,
    })
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("Slash commands are not supported; use the command prefix instead.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let team_id = event_callback.team_id;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event_callback.event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            debug!("Received message event ...");

            match to_inbound_event(&team_id, slack_message_event) {
                Some(event) => interaction::dispatch::handle_event(event, user_state.dispatcher.clone()),
                None => debug!("Skipping message event without a user message."),
            }
        }
        SlackEventCallbackBody::AppMention(_) => {
            // Mentions also arrive as message events, which carry the channel type.
            debug!("Skipping app mention event in favor of the message event.");
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.

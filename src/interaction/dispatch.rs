//! Per-event orchestration: classify, gate, route, deliver.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{
        config::Config,
        prompts,
        types::{ChatTrigger, InboundEvent, Intent, Outcome, Verdict},
    },
    service::{chat::ChatClient, llm::LlmClient, lookup::LookupClient},
};

use super::{
    abuse::{AbuseGuard, AbusePolicy},
    chat, classify, commands,
    conversation::ConversationStore,
    delivery::{Delivery, DeliveryManager},
};

/// Handles an inbound event on its own task.
///
/// Failures (including panics) are logged; they never reach the listener
/// that delivered the event.
#[instrument(skip_all)]
pub fn handle_event(event: InboundEvent, dispatcher: Dispatcher) {
    tokio::spawn(
        async move {
            // Process the event.
            let result = AssertUnwindSafe(dispatcher.dispatch(event)).catch_unwind().await;

            // Log any errors.
            match result {
                Ok(outcome) => debug!("Event finished: {:?}", outcome),
                Err(_) => error!("Panic while handling event."),
            }
        }
        .in_current_span(),
    );
}

/// Orchestrates the handling of inbound events.
///
/// This is trivially cloneable; clones share the abuse and conversation state.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) config: Config,
    pub(crate) chat: ChatClient,
    pub(crate) llm: LlmClient,
    pub(crate) lookup: LookupClient,
    pub(crate) guard: AbuseGuard,
    pub(crate) conversations: ConversationStore,
    pub(crate) delivery: DeliveryManager,
}

impl Dispatcher {
    pub fn new(config: Config, chat: ChatClient, llm: LlmClient, lookup: LookupClient) -> Self {
        let guard = AbuseGuard::in_memory(AbusePolicy::from(&*config));
        let conversations = ConversationStore::in_memory(config.history_pair_limit);
        let delivery = DeliveryManager::new(&config, chat.clone());

        Self {
            config,
            chat,
            llm,
            lookup,
            guard,
            conversations,
            delivery,
        }
    }

    /// The per-user conversation store.
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Handle one inbound event to completion.
    #[instrument(skip_all, fields(author = %event.author_id, channel = %event.channel.id))]
    pub async fn dispatch(&self, event: InboundEvent) -> Outcome {
        let intent = classify::classify(&event, self.chat.bot_user_id(), &self.config, &self.chat).await;

        match intent {
            Intent::Ignore => Outcome::Ignored,
            Intent::RestrictedChannel => {
                self.handle_restricted(&event).await;
                Outcome::Handled
            }
            // A bare mention or reply is answered without touching abuse state.
            Intent::Chat { ref text, trigger: ChatTrigger::Mention } if text.is_empty() => {
                self.delivery.send(&event.channel, prompts::EMPTY_CHAT_PROMPT).await;
                Outcome::Handled
            }
            Intent::Command { .. } | Intent::Chat { .. } => {
                if !self.admit(&event).await {
                    return Outcome::Handled;
                }

                match intent {
                    Intent::Chat { text, .. } => chat::handle_chat(self, &event, &text).await,
                    Intent::Command { name, args } => commands::handle_command(self, &event, &name, &args).await,
                    Intent::Ignore | Intent::RestrictedChannel => {}
                }

                Outcome::Handled
            }
        }
    }

    /// Run the user through the abuse guard, warning them if they are turned away.
    async fn admit(&self, event: &InboundEvent) -> bool {
        let verdict = self.guard.check(&event.author_id, Instant::now());

        match verdict {
            Verdict::Allowed => true,
            Verdict::SpamDetected => {
                self.delivery.send(&event.channel, &prompts::spam_notice(&event.author_id)).await;
                false
            }
            Verdict::CooldownActive { remaining } => {
                info!("User {} is cooling down ({:?} left).", event.author_id, remaining);
                self.delivery.send(&event.channel, &prompts::cooldown_notice(remaining.as_secs_f64())).await;
                false
            }
        }
    }

    /// Post the restricted-channel notice and schedule its removal.
    async fn handle_restricted(&self, event: &InboundEvent) {
        let Delivery::Sent(message_id) = self.delivery.send(&event.channel, prompts::RESTRICTED_CHANNEL_NOTICE).await else {
            return;
        };

        let delivery = self.delivery.clone();
        let channel = event.channel.clone();
        let ttl = self.config.restricted_notice_ttl();

        tokio::spawn(
            async move {
                tokio::time::sleep(ttl).await;
                delivery.delete_message(&channel, &message_id).await;
            }
            .in_current_span(),
        );
    }
}

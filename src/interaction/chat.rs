//! Free-form chat with the generative model.

use tracing::{error, info, instrument};

use crate::base::{
    prompts,
    types::{GovernorError, InboundEvent},
};

use super::{delivery::Delivery, dispatch::Dispatcher};

/// Handle a chat intent that already passed the abuse guard.
///
/// The user's history is only extended after the reply was generated and
/// delivered.
#[instrument(skip_all, fields(user = %event.author_id))]
pub async fn handle_chat(dispatcher: &Dispatcher, event: &InboundEvent, text: &str) {
    let channel = &event.channel;
    let delivery = &dispatcher.delivery;

    if text.is_empty() {
        delivery.send(channel, prompts::EMPTY_CHAT_PROMPT).await;
        return;
    }

    // One exchange at a time per user, so history reads and appends do not interleave.
    let _exchange = dispatcher.conversations.lock_user(&event.author_id).await;

    let indicator = delivery.send_processing_indicator(channel, prompts::CHAT_PROCESSING).await;
    delivery.react(channel, &event.message_id, &dispatcher.config.ack_reaction).await;
    delivery.typing(channel).await;

    let history = dispatcher.conversations.history(&event.author_id);
    let prompt = prompts::chat_prompt(&dispatcher.config.system_directive, text);

    let reply = match dispatcher.llm.generate(&prompt, &history).await {
        Ok(reply) => cap_visible_lines(&reply, dispatcher.config.max_visible_lines),
        Err(err) => {
            let err = GovernorError::CollaboratorFailure(err.to_string());
            error!("Chat generation failed: {}", err);

            if let Some(indicator) = indicator {
                delivery.delete_indicator(indicator).await;
            }

            delivery.send(channel, &format!("{} {}", prompts::CHAT_FAILURE_NOTICE, err)).await;
            return;
        }
    };

    match delivery.send_chunked(channel, &reply).await {
        // A reply the user never saw is not remembered.
        Delivery::Sent(_) => {
            dispatcher.conversations.append_turn(&event.author_id, text, &reply);
            info!("Chat exchange recorded.");

            if let Some(indicator) = indicator {
                delivery.delete_indicator(indicator).await;
            }
        }
        Delivery::Failed => {
            if let Some(indicator) = indicator {
                delivery.delete_indicator(indicator).await;
            }

            delivery.send(channel, prompts::DELIVERY_FAILURE_NOTICE).await;
        }
    }
}

/// Cap a reply to `max_lines` visible (non-blank) lines.
///
/// Replies within the limit are returned unchanged.  Longer replies keep the
/// first `max_lines - 1` visible lines followed by the elision marker.
pub fn cap_visible_lines(reply: &str, max_lines: usize) -> String {
    let lines = reply.split('\n').filter(|line| !line.trim().is_empty()).collect::<Vec<_>>();

    if lines.len() <= max_lines {
        return reply.to_string();
    }

    let mut capped = lines[..max_lines.saturating_sub(1)].join("\n");
    capped.push('\n');
    capped.push_str(prompts::ELISION_MARKER);
    capped
}

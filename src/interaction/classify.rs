//! Classification of inbound events into intents.
//!
//! Precedence matters: scope checks (author, guild, channel) run before the
//! restricted-channel check, which runs before command and mention detection.

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{ChatTrigger, GovernorError, InboundEvent, Intent},
    },
    service::chat::ChatClient,
};

/// Classify an inbound event.
///
/// The only external call is the lookup of the referenced message, made only
/// when the event is a reply that does not already mention the bot.
#[instrument(skip_all, fields(author = %event.author_id, channel = %event.channel.id))]
pub async fn classify(event: &InboundEvent, bot_user_id: &str, config: &Config, chat: &ChatClient) -> Intent {
    // Scope checks.

    if event.author_is_bot || event.author_id == bot_user_id {
        return Intent::Ignore;
    }

    if let Some(guild_id) = &event.guild_id
        && *guild_id != config.allowed_guild_id
    {
        debug!("Guild `{}` is not allowed; ignoring.", guild_id);
        return Intent::Ignore;
    }

    if event.channel.id != config.allowed_channel_id && !event.channel.is_direct {
        debug!("Channel `{}` is not allowed; ignoring.", event.channel.id);
        return Intent::Ignore;
    }

    if event.channel.id == config.restricted_channel_id {
        return Intent::RestrictedChannel;
    }

    // Prefixed commands.

    if let Some(rest) = strip_prefix_ignore_case(&event.text, &config.command_prefix) {
        let mut tokens = rest.trim().split(' ').filter(|t| !t.is_empty());

        let Some(name) = tokens.next().map(str::to_lowercase) else {
            return Intent::Ignore;
        };

        let args = tokens.map(str::to_string).collect::<Vec<_>>();

        if name == config.chat_command.to_lowercase() {
            return Intent::Chat {
                text: args.join(" ").trim().to_string(),
                trigger: ChatTrigger::Command,
            };
        }

        return Intent::Command { name, args };
    }

    // Mentions and replies.

    let mentioned = event.mentions.iter().any(|m| m == bot_user_id);

    if mentioned || is_reply_to_bot(event, bot_user_id, chat).await {
        return Intent::Chat {
            text: strip_bot_mentions(&event.text, bot_user_id),
            trigger: ChatTrigger::Mention,
        };
    }

    Intent::Ignore
}

/// Whether the event replies to a message authored by the bot.
///
/// A failed lookup counts as "not a reply".
async fn is_reply_to_bot(event: &InboundEvent, bot_user_id: &str, chat: &ChatClient) -> bool {
    let Some(referenced_id) = &event.referenced_message_id else {
        return false;
    };

    match chat.fetch_message(&event.channel, referenced_id).await {
        Ok(message) => message.author_id.as_deref() == Some(bot_user_id),
        Err(err) => {
            let err = GovernorError::LookupFailure(err.to_string());
            warn!("Treating event as a non-reply: {}", err);
            false
        }
    }
}

/// Strip `prefix` from the start of `text`, ignoring ASCII case.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;

    if head.eq_ignore_ascii_case(prefix) { Some(&text[prefix.len()..]) } else { None }
}

/// Remove every mention of the bot (`<@BOT>`, `<@!BOT>`, `<@BOT|name>`) and trim.
pub fn strip_bot_mentions(text: &str, bot_user_id: &str) -> String {
    let pattern = format!(r"<@!?{}(?:\|[^>]*)?>", regex::escape(bot_user_id));

    match Regex::new(&pattern) {
        Ok(mention) => mention.replace_all(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

//! Prompt templates and user-facing notices.

/// System directive for the chat model.
pub const CHAT_SYSTEM_DIRECTIVE: &str = r#####"
# Prime Directive

You are a friendly companion bot living in a chat app like Slack or Discord.  People talk to you by mentioning you, replying to one of your messages, or using the chat command.  Keep the tone light and warm, and answer in the language the user writes in.

Follow these rules:
  (1) keep every answer within 15 lines,
  (2) do not use math formatting; chat apps do not render it,
  (3) if you do not know something, say so plainly rather than guessing.
"#####;

/// Header placed between the system directive and the user's message.
pub const USER_INPUT_HEADER: &str = "User input:";

/// Text of the transient indicator shown while a chat reply is generated.
pub const CHAT_PROCESSING: &str = "💬 Generating a reply... 💬";

/// Marker appended when a reply is cut to the visible line limit.
pub const ELISION_MARKER: &str = "…the rest has been omitted";

/// Sent when the user addressed the bot without saying anything.
pub const EMPTY_CHAT_PROMPT: &str = "Say something and I'll answer!";

/// Notice posted (and then removed) in the restricted channel.
pub const RESTRICTED_CHANNEL_NOTICE: &str = "⚠️ Restricted channel ⚠️\nCommands cannot be used in this channel! 😔";

/// Generic failure notice for a chat exchange; the collaborator's message is appended.
pub const CHAT_FAILURE_NOTICE: &str = "😿 Error 😿\nFailed to generate a reply:";

/// Sent when a generated reply could not be delivered.
pub const DELIVERY_FAILURE_NOTICE: &str = "😿 Error 😿\nThe reply could not be delivered. Please try again later.";

/// Indicator shown while a cat image is fetched.
pub const CAT_PROCESSING: &str = "🐾 Fetching a cat picture... 🐾";

/// Sent when no cat image could be fetched.
pub const CAT_FAILURE_NOTICE: &str = "😿 Error 😿\nCould not fetch a cat picture!";

/// Sent when the anime command has no title.
pub const ANIME_USAGE: &str = "🎬 Anime search error 🎬\nPlease give a title! (e.g. y!anime Demon Slayer)";

/// Indicator shown while anime details are fetched.
pub const ANIME_PROCESSING: &str = "🎬 Fetching anime details... 🎬";

/// Sent when the anime lookup failed.
pub const ANIME_FAILURE_NOTICE: &str = "🎬 Error 🎬\nCould not fetch anime details!";

/// Sent when the pokemon command has no name.
pub const POKEMON_USAGE: &str = "⚡ Pokémon search error ⚡\nPlease give a name! (e.g. y!pokemon Pikachu)";

/// Indicator shown while Pokémon details are fetched.
pub const POKEMON_PROCESSING: &str = "⚡ Fetching Pokémon details... ⚡";

/// Build the notice sent when no Pokémon matched.
pub fn pokemon_failure_notice(name: &str) -> String {
    format!("⚡ Error ⚡\nNo Pokémon named \"{name}\" was found!")
}

/// Build the spam warning addressed to a user.
pub fn spam_notice(user_id: &str) -> String {
    format!("<@{user_id}>, please stop spamming~ 💦")
}

/// Build the cooldown notice with the remaining time in seconds.
pub fn cooldown_notice(remaining_secs: f64) -> String {
    format!("⏰ Cooldown ⏰\nPlease wait {remaining_secs:.1} more seconds!")
}

/// Build the full prompt sent to the model for one user message.
pub fn chat_prompt(system_directive: &str, user_text: &str) -> String {
    format!("{}\n\n{USER_INPUT_HEADER} {user_text}", system_directive.trim())
}

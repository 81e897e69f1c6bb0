//! Prefixed commands backed by external lookups.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, info, instrument};

use crate::{
    base::{
        prompts,
        types::{ChannelRef, InboundEvent, Res},
    },
    service::lookup::{AnimeInfo, PokemonInfo},
};

use super::dispatch::Dispatcher;

/// Characters of an anime description shown in the reply.
const DESCRIPTION_CHARS: usize = 200;

/// Handle a command intent that already passed the abuse guard.
///
/// Unknown commands are ignored without a reply.
#[instrument(skip(dispatcher, event, args), fields(user = %event.author_id))]
pub async fn handle_command(dispatcher: &Dispatcher, event: &InboundEvent, name: &str, args: &[String]) {
    let channel = &event.channel;

    match name {
        "cat" => {
            let lookup = async { dispatcher.lookup.random_cat_image().await.map(|url| format_cat(&url)) };
            run_lookup(dispatcher, channel, prompts::CAT_PROCESSING, prompts::CAT_FAILURE_NOTICE, lookup).await;
        }
        "anime" => {
            let title = args.join(" ").trim().to_string();
            if title.is_empty() {
                dispatcher.delivery.send(channel, prompts::ANIME_USAGE).await;
                return;
            }

            let lookup = async { dispatcher.lookup.search_anime(&title).await.map(|anime| format_anime(&anime)) };
            run_lookup(dispatcher, channel, prompts::ANIME_PROCESSING, prompts::ANIME_FAILURE_NOTICE, lookup).await;
        }
        "pokemon" => {
            let pokemon_name = normalize_pokemon_name(args);
            if pokemon_name.is_empty() {
                dispatcher.delivery.send(channel, prompts::POKEMON_USAGE).await;
                return;
            }

            let failure = prompts::pokemon_failure_notice(&pokemon_name);
            let lookup = async { dispatcher.lookup.search_pokemon(&pokemon_name).await.map(|pokemon| format_pokemon(&pokemon)) };
            run_lookup(dispatcher, channel, prompts::POKEMON_PROCESSING, &failure, lookup).await;
        }
        other => info!("Ignoring unknown command `{}`.", other),
    }
}

/// Run a lookup behind a processing indicator and deliver its result (or the failure notice).
async fn run_lookup(dispatcher: &Dispatcher, channel: &ChannelRef, processing: &str, failure: &str, lookup: impl Future<Output = Res<String>>) {
    let delivery = &dispatcher.delivery;

    let indicator = delivery.send_processing_indicator(channel, processing).await;
    let result = lookup.await;

    if let Some(indicator) = indicator {
        delivery.delete_indicator(indicator).await;
    }

    match result {
        Ok(content) => {
            delivery.send(channel, &content).await;
        }
        Err(err) => {
            error!("Lookup failed: {:#}", err);
            delivery.send(channel, failure).await;
        }
    }
}

fn format_cat(url: &str) -> String {
    format!("🐾 Random cat picture 😺\n{url}")
}

fn format_anime(anime: &AnimeInfo) -> String {
    let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());

    let title = non_empty(&anime.title.english)
        .or_else(|| non_empty(&anime.title.romaji))
        .unwrap_or_else(|| "Unknown".to_string());
    let romaji = non_empty(&anime.title.romaji).unwrap_or_else(|| "N/A".to_string());
    let description = match non_empty(&anime.description) {
        Some(d) => format!("{}...", strip_html(&d).chars().take(DESCRIPTION_CHARS).collect::<String>()),
        None => "None".to_string(),
    };
    let score = anime.average_score.map_or_else(|| "N/A".to_string(), |s| s.to_string());
    let episodes = anime.episodes.map_or_else(|| "N/A".to_string(), |e| e.to_string());
    let image = non_empty(&anime.cover_image.large).unwrap_or_else(|| "None".to_string());

    [
        format!("🎬 Anime: {title} 🎬"),
        format!("Romaji: {romaji}"),
        format!("Description: {description}"),
        format!("Score: {score}/100"),
        format!("Episodes: {episodes}"),
        format!("Image: {image}"),
    ]
    .join("\n")
}

fn format_pokemon(pokemon: &PokemonInfo) -> String {
    let mut name = pokemon.name.chars();
    let display_name = match name.next() {
        Some(first) => first.to_uppercase().chain(name).collect::<String>(),
        None => String::new(),
    };
    let types = pokemon.types.iter().map(|t| t.kind.name.as_str()).collect::<Vec<_>>().join(", ");
    let sprite = pokemon.sprites.front_default.clone().unwrap_or_else(|| "None".to_string());

    [
        format!("⚡ Pokémon: {display_name} #{} ⚡", pokemon.id),
        format!("Types: {types}"),
        format!("Height: {} m", f64::from(pokemon.height) / 10.0),
        format!("Weight: {} kg", f64::from(pokemon.weight) / 10.0),
        format!("Sprite: {sprite}"),
    ]
    .join("\n")
}

/// Normalize command arguments into a PokéAPI name: lower-case `[a-z0-9-]`, single dashes.
fn normalize_pokemon_name(args: &[String]) -> String {
    let joined = args.join("-").to_lowercase();

    let mut name = String::with_capacity(joined.len());
    for c in joined.trim().chars() {
        match c {
            'a'..='z' | '0'..='9' => name.push(c),
            '-' if !name.ends_with('-') => name.push(c),
            _ => {}
        }
    }

    name.trim_matches('-').to_string()
}

/// Remove HTML tags from AniList descriptions.
fn strip_html(text: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

    tag.replace_all(text, "").to_string()
}

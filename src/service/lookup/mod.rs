pub mod web;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;

use crate::base::types::Res;

// Types.

/// Titles of an anime as reported by AniList.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnimeTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

/// Cover art of an anime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnimeCover {
    pub large: Option<String>,
}

/// A single anime search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeInfo {
    pub title: AnimeTitle,
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: AnimeCover,
    pub average_score: Option<u32>,
    pub episodes: Option<u32>,
}

/// A Pokémon type slot, e.g. `{"type": {"name": "electric"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PokemonTypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

/// A named API resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

/// Sprites of a Pokémon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PokemonSprites {
    pub front_default: Option<String>,
}

/// A single Pokémon.  Height is in decimetres, weight in hectograms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PokemonInfo {
    pub id: u32,
    pub name: String,
    pub types: Vec<PokemonTypeSlot>,
    pub height: u32,
    pub weight: u32,
    #[serde(default)]
    pub sprites: PokemonSprites,
}

// Traits.

/// Generic lookup trait for the external data sources behind the bot's commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericLookupClient: Send + Sync + 'static {
    /// Get the URL of a random cat image, verified to be reachable.
    async fn random_cat_image(&self) -> Res<String>;

    /// Search for an anime by title.
    async fn search_anime(&self, title: &str) -> Res<AnimeInfo>;

    /// Look up a Pokémon by its normalized name.
    async fn search_pokemon(&self, name: &str) -> Res<PokemonInfo>;
}

// Structs.

/// Lookup client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LookupClient {
    inner: Arc<dyn GenericLookupClient>,
}

impl Deref for LookupClient {
    type Target = dyn GenericLookupClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LookupClient {
    pub fn new(inner: Arc<dyn GenericLookupClient>) -> Self {
        Self { inner }
    }
}

//! HTTP implementation of the lookup service (TheCatAPI, AniList, PokéAPI).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::base::types::Res;

use super::{AnimeInfo, GenericLookupClient, LookupClient, PokemonInfo};

const CAT_API_URL: &str = "https://api.thecatapi.com/v1/images/search";
const ANILIST_URL: &str = "https://graphql.anilist.co";
const POKEAPI_URL: &str = "https://pokeapi.co/api/v2/pokemon";

const ANILIST_QUERY: &str = r#"
  query ($search: String) {
    Media (search: $search, type: ANIME) {
      title { romaji, english }
      description
      coverImage { large }
      averageScore
      episodes
    }
  }
"#;

// Extra methods on `LookupClient` applied by the web implementation.

impl LookupClient {
    pub fn web() -> Self {
        Self {
            inner: Arc::new(WebLookupClient::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AniListResponse {
    data: AniListData,
}

#[derive(Debug, Deserialize)]
struct AniListData {
    #[serde(rename = "Media")]
    media: Option<AnimeInfo>,
}

/// Lookup client backed by public web APIs.
#[derive(Clone, Default)]
pub struct WebLookupClient {
    http: reqwest::Client,
}

impl WebLookupClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a URL we are about to hand out actually resolves.
    async fn verify_url(&self, url: &str) -> Res<()> {
        self.http.head(url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl GenericLookupClient for WebLookupClient {
    #[instrument(skip(self))]
    async fn random_cat_image(&self) -> Res<String> {
        let images: Vec<CatImage> = self.http.get(CAT_API_URL).send().await?.error_for_status()?.json().await?;

        let url = images
            .into_iter()
            .next()
            .and_then(|i| i.url)
            .ok_or_else(|| anyhow::anyhow!("No valid image URL."))?;

        self.verify_url(&url).await?;

        Ok(url)
    }

    #[instrument(skip(self))]
    async fn search_anime(&self, title: &str) -> Res<AnimeInfo> {
        let body = json!({
            "query": ANILIST_QUERY,
            "variables": { "search": title },
        });

        let response: AniListResponse = self.http.post(ANILIST_URL).json(&body).send().await?.error_for_status()?.json().await?;

        response.data.media.ok_or_else(|| anyhow::anyhow!("No anime found for `{title}`."))
    }

    #[instrument(skip(self))]
    async fn search_pokemon(&self, name: &str) -> Res<PokemonInfo> {
        let url = format!("{POKEAPI_URL}/{name}");
        let pokemon: PokemonInfo = self.http.get(&url).send().await?.error_for_status()?.json().await?;

        if let Some(sprite) = &pokemon.sprites.front_default {
            self.verify_url(sprite).await?;
        }

        Ok(pokemon)
    }
}

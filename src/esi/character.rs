//! Character public information and portraits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CachedResponse, EsiClient, Resource};
use crate::error::EsiError;
use crate::retry::RequestContext;

pub const CHARACTER: Resource<Character> = Resource::public("/characters/{}/");
pub const CHARACTER_PORTRAIT: Resource<CharacterPortrait> =
    Resource::public("/characters/{}/portrait/");

/// Concurrent requests used by [`EsiClient::get_characters`]
const BULK_CONCURRENCY: usize = 8;

/// Public character sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub corporation_id: i64,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    pub birthday: DateTime<Utc>,
    pub gender: String,
    pub race_id: i64,
    pub bloodline_id: i64,
    #[serde(default)]
    pub ancestry_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub faction_id: Option<i64>,
    #[serde(default)]
    pub security_status: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Portrait image URLs by size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPortrait {
    pub px64x64: Option<String>,
    pub px128x128: Option<String>,
    pub px256x256: Option<String>,
    pub px512x512: Option<String>,
}

impl EsiClient {
    pub async fn get_character(
        &self,
        ctx: &RequestContext,
        character_id: i64,
    ) -> Result<Character, EsiError> {
        Ok(self.get_character_with_cache(ctx, character_id).await?.data)
    }

    pub async fn get_character_with_cache(
        &self,
        ctx: &RequestContext,
        character_id: i64,
    ) -> Result<CachedResponse<Character>, EsiError> {
        self.fetch(ctx, &CHARACTER, &[&character_id], None).await
    }

    pub async fn get_character_portrait(
        &self,
        ctx: &RequestContext,
        character_id: i64,
    ) -> Result<CharacterPortrait, EsiError> {
        Ok(self
            .get_character_portrait_with_cache(ctx, character_id)
            .await?
            .data)
    }

    pub async fn get_character_portrait_with_cache(
        &self,
        ctx: &RequestContext,
        character_id: i64,
    ) -> Result<CachedResponse<CharacterPortrait>, EsiError> {
        self.fetch(ctx, &CHARACTER_PORTRAIT, &[&character_id], None)
            .await
    }

    /// Fetches many characters, pausing the batch if the error budget runs low
    pub async fn get_characters(
        &self,
        ctx: &RequestContext,
        character_ids: &[i64],
    ) -> Result<Vec<Character>, EsiError> {
        self.fetch_many(character_ids.iter().copied(), BULK_CONCURRENCY, |id| {
            self.get_character(ctx, id)
        })
        .await
    }
}

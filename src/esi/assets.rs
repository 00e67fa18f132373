//! Authenticated character assets and structure lookups

use serde::{Deserialize, Serialize};

use super::{CachedResponse, EsiClient, Position, Resource};
use crate::error::EsiError;
use crate::retry::RequestContext;

pub const CHARACTER_ASSETS: Resource<Vec<Asset>> =
    Resource::authenticated("/characters/{}/assets/");
pub const STRUCTURE: Resource<Structure> = Resource::authenticated("/universe/structures/{}/");

/// One stack or singleton item owned by a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub item_id: i64,
    pub type_id: i64,
    pub location_id: i64,
    pub location_flag: String,
    pub location_type: String,
    pub quantity: i64,
    pub is_singleton: bool,
    #[serde(default)]
    pub is_blueprint_copy: Option<bool>,
}

/// Player-owned structure visible to the token's character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    pub owner_id: i64,
    pub solar_system_id: i64,
    #[serde(default)]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl EsiClient {
    /// All asset pages for a character; only the first page is cached
    pub async fn get_character_assets(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        token: &str,
    ) -> Result<Vec<Asset>, EsiError> {
        Ok(self
            .get_character_assets_with_cache(ctx, character_id, token)
            .await?
            .data)
    }

    pub async fn get_character_assets_with_cache(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        token: &str,
    ) -> Result<CachedResponse<Vec<Asset>>, EsiError> {
        self.fetch_paged(ctx, &CHARACTER_ASSETS, &[&character_id], Some(token))
            .await
    }

    pub async fn get_structure(
        &self,
        ctx: &RequestContext,
        structure_id: i64,
        token: &str,
    ) -> Result<Structure, EsiError> {
        Ok(self
            .get_structure_with_cache(ctx, structure_id, token)
            .await?
            .data)
    }

    pub async fn get_structure_with_cache(
        &self,
        ctx: &RequestContext,
        structure_id: i64,
        token: &str,
    ) -> Result<CachedResponse<Structure>, EsiError> {
        self.fetch(ctx, &STRUCTURE, &[&structure_id], Some(token))
            .await
    }
}

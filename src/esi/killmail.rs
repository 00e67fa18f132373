//! Killmail lookups by ID and hash

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CachedResponse, EsiClient, Position, Resource};
use crate::error::EsiError;
use crate::retry::RequestContext;

pub const KILLMAIL: Resource<Killmail> = Resource::public("/killmails/{}/{}/");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Killmail {
    pub killmail_id: i64,
    pub killmail_time: DateTime<Utc>,
    pub solar_system_id: i64,
    #[serde(default)]
    pub moon_id: Option<i64>,
    #[serde(default)]
    pub war_id: Option<i64>,
    pub victim: Victim,
    #[serde(default)]
    pub attackers: Vec<Attacker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Victim {
    #[serde(default)]
    pub character_id: Option<i64>,
    #[serde(default)]
    pub corporation_id: Option<i64>,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    #[serde(default)]
    pub faction_id: Option<i64>,
    pub ship_type_id: i64,
    pub damage_taken: i64,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub items: Vec<KillmailItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attacker {
    #[serde(default)]
    pub character_id: Option<i64>,
    #[serde(default)]
    pub corporation_id: Option<i64>,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    #[serde(default)]
    pub faction_id: Option<i64>,
    #[serde(default)]
    pub ship_type_id: Option<i64>,
    #[serde(default)]
    pub weapon_type_id: Option<i64>,
    pub damage_done: i64,
    pub final_blow: bool,
    pub security_status: f64,
}

/// Item fitted to or carried by the victim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillmailItem {
    pub item_type_id: i64,
    pub flag: i64,
    pub singleton: i64,
    #[serde(default)]
    pub quantity_destroyed: Option<i64>,
    #[serde(default)]
    pub quantity_dropped: Option<i64>,
}

impl Killmail {
    /// The attacker credited with the final blow
    pub fn final_blow(&self) -> Option<&Attacker> {
        self.attackers.iter().find(|a| a.final_blow)
    }
}

impl EsiClient {
    pub async fn get_killmail(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
        killmail_hash: &str,
    ) -> Result<Killmail, EsiError> {
        Ok(self
            .get_killmail_with_cache(ctx, killmail_id, killmail_hash)
            .await?
            .data)
    }

    /// Killmails never change once published, so hits are common
    pub async fn get_killmail_with_cache(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
        killmail_hash: &str,
    ) -> Result<CachedResponse<Killmail>, EsiError> {
        self.fetch(ctx, &KILLMAIL, &[&killmail_id, &killmail_hash], None)
            .await
    }
}

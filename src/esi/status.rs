//! Server status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CachedResponse, EsiClient, Resource};
use crate::error::EsiError;
use crate::retry::RequestContext;

pub const STATUS: Resource<ServerStatus> = Resource::public("/status/");

/// Tranquility server status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Players currently online
    pub players: i64,
    /// Running server build
    pub server_version: String,
    /// When the server came up after downtime
    pub start_time: DateTime<Utc>,
    /// Whether the server is in VIP mode
    #[serde(default)]
    pub vip: Option<bool>,
}

impl EsiClient {
    pub async fn get_status(&self, ctx: &RequestContext) -> Result<ServerStatus, EsiError> {
        Ok(self.get_status_with_cache(ctx).await?.data)
    }

    pub async fn get_status_with_cache(
        &self,
        ctx: &RequestContext,
    ) -> Result<CachedResponse<ServerStatus>, EsiError> {
        self.fetch(ctx, &STATUS, &[], None).await
    }
}

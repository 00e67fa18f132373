//! Corporation and alliance lookups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CachedResponse, EsiClient, Resource};
use crate::error::EsiError;
use crate::retry::RequestContext;

pub const CORPORATION: Resource<Corporation> = Resource::public("/corporations/{}/");
pub const ALLIANCE: Resource<Alliance> = Resource::public("/alliances/{}/");
pub const ALLIANCE_CORPORATIONS: Resource<Vec<i64>> =
    Resource::public("/alliances/{}/corporations/");

/// Public corporation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corporation {
    pub name: String,
    pub ticker: String,
    pub member_count: i64,
    pub ceo_id: i64,
    pub creator_id: i64,
    /// Fraction in `0.0..=1.0`
    pub tax_rate: f64,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    #[serde(default)]
    pub date_founded: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub faction_id: Option<i64>,
    #[serde(default)]
    pub home_station_id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub war_eligible: Option<bool>,
}

/// Public alliance information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alliance {
    pub name: String,
    pub ticker: String,
    pub creator_id: i64,
    pub creator_corporation_id: i64,
    pub date_founded: DateTime<Utc>,
    #[serde(default)]
    pub executor_corporation_id: Option<i64>,
    #[serde(default)]
    pub faction_id: Option<i64>,
}

impl EsiClient {
    pub async fn get_corporation(
        &self,
        ctx: &RequestContext,
        corporation_id: i64,
    ) -> Result<Corporation, EsiError> {
        Ok(self
            .get_corporation_with_cache(ctx, corporation_id)
            .await?
            .data)
    }

    pub async fn get_corporation_with_cache(
        &self,
        ctx: &RequestContext,
        corporation_id: i64,
    ) -> Result<CachedResponse<Corporation>, EsiError> {
        self.fetch(ctx, &CORPORATION, &[&corporation_id], None).await
    }

    pub async fn get_alliance(
        &self,
        ctx: &RequestContext,
        alliance_id: i64,
    ) -> Result<Alliance, EsiError> {
        Ok(self.get_alliance_with_cache(ctx, alliance_id).await?.data)
    }

    pub async fn get_alliance_with_cache(
        &self,
        ctx: &RequestContext,
        alliance_id: i64,
    ) -> Result<CachedResponse<Alliance>, EsiError> {
        self.fetch(ctx, &ALLIANCE, &[&alliance_id], None).await
    }

    /// IDs of the corporations currently in an alliance
    pub async fn get_alliance_corporations(
        &self,
        ctx: &RequestContext,
        alliance_id: i64,
    ) -> Result<Vec<i64>, EsiError> {
        Ok(self
            .get_alliance_corporations_with_cache(ctx, alliance_id)
            .await?
            .data)
    }

    pub async fn get_alliance_corporations_with_cache(
        &self,
        ctx: &RequestContext,
        alliance_id: i64,
    ) -> Result<CachedResponse<Vec<i64>>, EsiError> {
        self.fetch(ctx, &ALLIANCE_CORPORATIONS, &[&alliance_id], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corporation_decodes() {
        let json = r#"{
            "name": "C C P",
            "ticker": "-CCP-",
            "member_count": 3,
            "ceo_id": 180548812,
            "creator_id": 180548812,
            "tax_rate": 0.1,
            "alliance_id": 434243723,
            "date_founded": "2004-11-28T16:42:51Z"
        }"#;

        let corp: Corporation = serde_json::from_str(json).unwrap();

        assert_eq!(corp.ticker, "-CCP-");
        assert_eq!(corp.alliance_id, Some(434_243_723));
        assert!((corp.tax_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(corp.war_eligible, None);
    }

    #[test]
    fn test_alliance_decodes() {
        let json = r#"{
            "name": "C C P Alliance",
            "ticker": "<C C P>",
            "creator_id": 12345,
            "creator_corporation_id": 45678,
            "executor_corporation_id": 98356193,
            "date_founded": "2016-06-26T21:00:00Z"
        }"#;

        let alliance: Alliance = serde_json::from_str(json).unwrap();

        assert_eq!(alliance.ticker, "<C C P>");
        assert_eq!(alliance.executor_corporation_id, Some(98_356_193));
    }

    #[test]
    fn test_alliance_corporations_path() {
        assert_eq!(
            ALLIANCE_CORPORATIONS.path(&[&99_000_001]).unwrap(),
            "/alliances/99000001/corporations/"
        );
    }
}

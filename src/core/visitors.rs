//! Active-visitor queries and wire summaries

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::core::time;
use crate::state::{Visitor, VisitorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilter {
    All,
    /// Sessions with an associated username
    Registered,
    /// Sessions without one
    Guests,
}

/// Sessions seen within the last `window` seconds, most recently active
/// first. Re-queries the store on every call; nothing is cached.
pub fn active(store: &VisitorStore, window: u64, filter: ActiveFilter) -> Vec<Visitor> {
    let horizon = Utc::now() - Duration::seconds(window as i64);

    let mut out: Vec<Visitor> = store
        .snapshot()
        .into_iter()
        .filter(|v| v.last_update >= horizon)
        .filter(|v| match filter {
            ActiveFilter::All => true,
            ActiveFilter::Registered => v.user.is_some(),
            ActiveFilter::Guests => v.user.is_none(),
        })
        .collect();
    out.sort_by(|a, b| {
        b.last_update
            .cmp(&a.last_update)
            .then_with(|| b.id.cmp(&a.id))
    });
    out
}

/// Why a visitor summary could not be assembled. The polling endpoint logs
/// these and falls back to an empty body instead of failing the request.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("visitor {id} was last seen {skew}s in the future")]
    ClockSkew { id: i64, skew: i64 },
    #[error("geoip payload for visitor {id} is not valid JSON: {source}")]
    Geoip {
        id: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire shape of one active visitor. The session key and IP address are
/// deliberately absent.
#[derive(Debug, Serialize)]
pub struct VisitorSummary {
    pub id: i64,
    pub user_agent: String,
    pub referrer: String,
    pub url: String,
    pub page_views: u64,
    pub geoip: serde_json::Value,
    /// Whole seconds since the session was last seen
    pub last_update: i64,
    pub friendly_time: String,
}

pub fn summarize(v: &Visitor, now: DateTime<Utc>) -> Result<VisitorSummary, SummaryError> {
    let elapsed = (now - v.last_update).num_seconds();
    if elapsed < 0 {
        return Err(SummaryError::ClockSkew {
            id: v.id,
            skew: -elapsed,
        });
    }

    let geoip = match &v.geoip_data {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|source| SummaryError::Geoip { id: v.id, source })?,
        None => serde_json::Value::Null,
    };

    Ok(VisitorSummary {
        id: v.id,
        user_agent: v.user_agent.clone(),
        referrer: v.referrer.clone(),
        url: v.url.clone(),
        page_views: v.page_views,
        geoip,
        last_update: elapsed,
        friendly_time: time::friendly_time_string(elapsed as u64),
    })
}

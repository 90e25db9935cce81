//! Seven-day availability figures computed from recorded downtime.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgConnection;

use crate::{
    db::{errors::Result, handlers::RouterDowntimes},
    types::RouterId,
};

/// Length of the availability window in seconds (7 days)
pub const WINDOW_SECONDS: i64 = 604_800;

/// Shown instead of 100 when there was some downtime that rounds away
const NEAR_PERFECT: f64 = 99.999;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Availability {
    /// Seconds offline inside the window
    pub downtime_seconds: i64,
    /// Percentage online, rounded to 3 decimals
    pub percent: f64,
}

impl Availability {
    pub fn from_downtime(downtime_seconds: i64) -> Self {
        Self {
            downtime_seconds,
            percent: availability_percent(downtime_seconds),
        }
    }
}

/// Start of the window ending at `now`
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(WINDOW_SECONDS)
}

/// `round((WINDOW - downtime) / WINDOW * 100, 3)`, never exactly 100 when downtime is positive
/// and never below 0.
pub fn availability_percent(downtime_seconds: i64) -> f64 {
    let raw = (WINDOW_SECONDS - downtime_seconds) as f64 / WINDOW_SECONDS as f64 * 100.0;
    let rounded = round_to_thousandths(raw);

    if downtime_seconds > 0 && rounded >= 100.0 {
        return NEAR_PERFECT;
    }
    rounded.clamp(0.0, 100.0)
}

/// Round the exact binary value to 3 decimals, ties to even
fn round_to_thousandths(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}

/// Availability of one router over the window ending at `now`
pub async fn for_router(conn: &mut PgConnection, router_id: RouterId, now: DateTime<Utc>) -> Result<Availability> {
    let downtime = RouterDowntimes::new(conn).total_since(router_id, window_start(now)).await?;
    Ok(Availability::from_downtime(downtime))
}

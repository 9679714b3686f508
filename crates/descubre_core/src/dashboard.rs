//! crates/descubre_core/src/dashboard.rs
//!
//! Aggregates for the back-office landing page.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{BackOfficeCounts, Rating, UserSummary};

/// Weeks shown in the itineraries-per-week chart.
pub const DASHBOARD_WEEKS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyCount {
    pub week: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub users: i64,
    pub places: i64,
    pub itineraries: i64,
    pub avg_rating: f64,
    pub support_pending: i64,
    pub offers: i64,
    pub events: i64,
    pub itineraries_per_week: Vec<WeeklyCount>,
    pub recent_users: Vec<UserSummary>,
}

/// Mean rating rounded to one decimal, or 0 with no ratings.
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(r.value())).sum();
    let mean = f64::from(sum) / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Buckets creation times into the last `DASHBOARD_WEEKS` weeks, oldest first.
/// The current week (the last 7 days) is the final bucket; older or future
/// timestamps are ignored.
pub fn weekly_counts(timestamps: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<WeeklyCount> {
    let mut counts = [0u32; DASHBOARD_WEEKS];
    for ts in timestamps {
        let age_days = (now - *ts).num_days();
        if age_days < 0 {
            continue;
        }
        let weeks_ago = (age_days / 7) as usize;
        if weeks_ago < DASHBOARD_WEEKS {
            counts[DASHBOARD_WEEKS - 1 - weeks_ago] += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .map(|(i, count)| WeeklyCount {
            week: format!("Sem {}", i + 1),
            count: *count,
        })
        .collect()
}

pub fn build_dashboard(
    counts: BackOfficeCounts,
    ratings: &[Rating],
    itinerary_times: &[DateTime<Utc>],
    recent_users: Vec<UserSummary>,
    now: DateTime<Utc>,
) -> DashboardStats {
    DashboardStats {
        users: counts.users,
        places: counts.active_places,
        itineraries: counts.itineraries,
        avg_rating: average_rating(ratings),
        support_pending: counts.pending_support,
        offers: counts.active_offers,
        events: counts.events,
        itineraries_per_week: weekly_counts(itinerary_times, now),
        recent_users,
    }
}

// src/contest/countdown.rs

use chrono::{DateTime, Duration, Utc};

use crate::models::contest::{Contest, ContestStatus};

/// Source of "now" for countdowns.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whole seconds left until `started_at + timer_minutes`, never negative.
pub fn remaining_seconds(started_at: DateTime<Utc>, timer_minutes: u32, now: DateTime<Utc>) -> u64 {
    let deadline = started_at + Duration::minutes(i64::from(timer_minutes));
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 { 0 } else { (millis / 1000) as u64 }
}

/// `mm:ss`. Minutes are not wrapped at 60.
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Badge text for the admin contest list, recomputed on every tick.
pub fn time_remaining_label(contest: &Contest, now: DateTime<Utc>) -> String {
    match contest.status {
        ContestStatus::Upcoming => "Not started".to_string(),
        ContestStatus::Completed => "Ended".to_string(),
        ContestStatus::Ongoing => match contest.closes_at() {
            Some(closes_at) => {
                let millis = (closes_at - now).num_milliseconds().max(0);
                let left = (millis / 1000) as u64;
                if left == 0 {
                    "Ending…".to_string()
                } else {
                    format!("{} left", format_time(left))
                }
            }
            None => "Live".to_string(),
        },
    }
}

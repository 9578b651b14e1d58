// src/dashboard.rs

use chrono::{DateTime, Utc};

use crate::{
    api::{announcements, auth, contests, events, notifications, students},
    error::AppError,
    models::{
        announcement::Announcement,
        contest::{Contest, ContestStatus},
        event::Event,
        user::User,
    },
    state::AppState,
    utils::html::{clean_html, preview},
};

const RECENT_ANNOUNCEMENTS: usize = 5;
const PREVIEW_CHARS: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedStudent {
    /// Competition ranking: equal points share a rank (1, 1, 3).
    pub rank: usize,
    pub student_id: String,
    pub name: String,
    pub points: i64,
    pub badge_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementCard {
    pub id: String,
    pub title: String,
    /// Sanitized HTML.
    pub body: String,
    pub preview: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Announcement> for AnnouncementCard {
    fn from(a: &Announcement) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            body: clean_html(&a.description),
            preview: preview(&a.description, PREVIEW_CHARS),
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub user: User,
    pub points: i64,
    pub rank: Option<usize>,
    pub total_students: usize,
    pub live_contests: Vec<Contest>,
    pub upcoming_contests: Vec<Contest>,
    pub upcoming_events: Vec<Event>,
    pub announcements: Vec<AnnouncementCard>,
    pub unread_notifications: usize,
}

/// Orders students by total badge points, ties broken by name. Admins are not ranked.
pub fn rank_students(users: &[User]) -> Vec<RankedStudent> {
    let mut rows: Vec<RankedStudent> = users
        .iter()
        .filter(|u| !u.is_admin())
        .map(|u| RankedStudent {
            rank: 0,
            student_id: u.id.clone(),
            name: u.name.clone(),
            points: u.badge_points(),
            badge_count: u.badges.len(),
        })
        .collect();

    rows.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));

    let mut previous: Option<i64> = None;
    let mut rank = 0;
    for (index, row) in rows.iter_mut().enumerate() {
        if previous != Some(row.points) {
            rank = index + 1;
            previous = Some(row.points);
        }
        row.rank = rank;
    }
    rows
}

/// Loads everything the student dashboard shows.
pub async fn load_dashboard(state: &AppState, now: DateTime<Utc>) -> Result<Dashboard, AppError> {
    let user = match auth::refresh_user(state).await {
        Ok(user) => user,
        Err(AppError::AuthError(msg)) => return Err(AppError::AuthError(msg)),
        Err(e) => {
            tracing::warn!("Using cached profile, refresh failed: {}", e);
            state
                .session
                .current_user()
                .ok_or_else(|| AppError::AuthError("Not signed in".to_string()))?
        }
    };

    let (all_students, all_contests, all_events, all_announcements, unread) = tokio::try_join!(
        students::list_students(state),
        contests::list_contests(state),
        events::list_events(state),
        announcements::list_announcements(state),
        notifications::unread_count(state),
    )?;

    let ranking = rank_students(&all_students);
    let rank = ranking
        .iter()
        .find(|r| r.student_id == user.id)
        .map(|r| r.rank);

    let (live_contests, upcoming_contests): (Vec<Contest>, Vec<Contest>) = all_contests
        .into_iter()
        .filter(|c| c.status != ContestStatus::Completed)
        .partition(|c| c.status == ContestStatus::Ongoing);

    let mut upcoming_events: Vec<Event> = all_events
        .into_iter()
        .filter(|e| e.date >= now)
        .collect();
    upcoming_events.sort_by_key(|e| e.date);

    let mut recent = all_announcements;
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let announcements = recent
        .iter()
        .take(RECENT_ANNOUNCEMENTS)
        .map(AnnouncementCard::from)
        .collect();

    Ok(Dashboard {
        points: user.badge_points(),
        rank,
        total_students: ranking.len(),
        user,
        live_contests,
        upcoming_contests,
        upcoming_events,
        announcements,
        unread_notifications: unread,
    })
}

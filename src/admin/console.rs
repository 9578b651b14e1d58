// src/admin/console.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    admin::generator::{QuestionGenerator, accept_into_form},
    api::{announcements, badges, contests, events, logs, projects, students},
    config::TICK_INTERVAL_MS,
    contest::countdown::{Clock, time_remaining_label},
    error::AppError,
    models::{
        activity_log::{ActivityLog, LogQuery},
        announcement::{Announcement, AnnouncementRequest},
        badge::{Badge, BadgeRequest},
        contest::{Contest, ContestRequest, ContestStatus},
        event::{Event, EventRequest},
        project::{Project, ProjectStatus},
        user::{UpdateStudentRequest, User},
    },
    state::AppState,
};

/// Create/edit dialog target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(String),
}

/// A row of the admin contest table.
#[derive(Debug, Clone, PartialEq)]
pub struct ContestRow {
    pub contest: Contest,
    pub question_count: usize,
    /// Recomputed every second while the page is open.
    pub time_label: String,
}

/// The admin contest table while it is on screen.
///
/// Labels are recomputed every tick and published to [`ContestTable::rows`]. The
/// ticking task stops when the table is dropped.
pub struct ContestTable {
    source: watch::Sender<Vec<Contest>>,
    rows: watch::Receiver<Vec<ContestRow>>,
    task: JoinHandle<()>,
}

impl ContestTable {
    pub fn spawn(list: Vec<Contest>, clock: Arc<dyn Clock>) -> Self {
        let (source, mut source_rx) = watch::channel(list);
        let initial = contest_rows(source_rx.borrow_and_update().clone(), clock.now());
        let (rows_tx, rows) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(TICK_INTERVAL_MS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = source_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = rows_tx.closed() => break,
                }
                let list = source_rx.borrow_and_update().clone();
                if rows_tx.send(contest_rows(list, clock.now())).is_err() {
                    break;
                }
            }
            tracing::debug!("Contest table closed");
        });

        Self { source, rows, task }
    }

    pub fn rows(&self) -> watch::Receiver<Vec<ContestRow>> {
        self.rows.clone()
    }

    pub fn current(&self) -> Vec<ContestRow> {
        self.rows.borrow().clone()
    }

    /// Swaps in a refetched list; labels are recomputed right away.
    pub fn replace(&self, list: Vec<Contest>) {
        self.source.send_replace(list);
    }
}

impl Drop for ContestTable {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Admin pages. Every mutation is followed by a full refetch of its list;
/// nothing is updated optimistically.
pub struct AdminConsole {
    state: AppState,
}

impl AdminConsole {
    /// Opens the console. Non-admin sessions are refused.
    pub fn open(state: &AppState) -> Result<Self, AppError> {
        if !state.session.is_admin() {
            return Err(AppError::Forbidden("Admin access required.".to_string()));
        }
        Ok(Self {
            state: state.clone(),
        })
    }

    // Announcements

    pub async fn announcements(&self) -> Result<Vec<Announcement>, AppError> {
        announcements::list_announcements(&self.state).await
    }

    pub async fn save_announcement(
        &self,
        mode: &FormMode,
        form: &AnnouncementRequest,
    ) -> Result<Vec<Announcement>, AppError> {
        match mode {
            FormMode::Create => announcements::create_announcement(&self.state, form).await?,
            FormMode::Edit(id) => announcements::update_announcement(&self.state, id, form).await?,
        };
        announcements::refetch_announcements(&self.state).await
    }

    pub async fn delete_announcement(&self, id: &str) -> Result<Vec<Announcement>, AppError> {
        announcements::delete_announcement(&self.state, id).await?;
        announcements::refetch_announcements(&self.state).await
    }

    // Events

    pub async fn events(&self) -> Result<Vec<Event>, AppError> {
        events::list_events(&self.state).await
    }

    pub async fn save_event(&self, mode: &FormMode, form: &EventRequest) -> Result<Vec<Event>, AppError> {
        match mode {
            FormMode::Create => events::create_event(&self.state, form).await?,
            FormMode::Edit(id) => events::update_event(&self.state, id, form).await?,
        };
        events::refetch_events(&self.state).await
    }

    pub async fn delete_event(&self, id: &str) -> Result<Vec<Event>, AppError> {
        events::delete_event(&self.state, id).await?;
        events::refetch_events(&self.state).await
    }

    // Badges

    pub async fn badges(&self) -> Result<Vec<Badge>, AppError> {
        badges::list_badges(&self.state).await
    }

    pub async fn save_badge(&self, mode: &FormMode, form: &BadgeRequest) -> Result<Vec<Badge>, AppError> {
        match mode {
            FormMode::Create => badges::create_badge(&self.state, form).await?,
            FormMode::Edit(id) => badges::update_badge(&self.state, id, form).await?,
        };
        badges::refetch_badges(&self.state).await
    }

    pub async fn delete_badge(&self, id: &str) -> Result<Vec<Badge>, AppError> {
        badges::delete_badge(&self.state, id).await?;
        badges::refetch_badges(&self.state).await
    }

    /// Gives a badge to a student and returns the refreshed student list.
    pub async fn assign_badge(&self, badge_id: &str, student_id: &str) -> Result<Vec<User>, AppError> {
        badges::assign_badge(&self.state, badge_id, student_id).await?;
        students::refetch_students(&self.state).await
    }

    pub async fn remove_badge(&self, badge_id: &str, student_id: &str) -> Result<Vec<User>, AppError> {
        badges::remove_badge(&self.state, badge_id, student_id).await?;
        students::refetch_students(&self.state).await
    }

    // Contests

    pub async fn contests(&self, now: DateTime<Utc>) -> Result<Vec<ContestRow>, AppError> {
        let list = contests::list_contests(&self.state).await?;
        Ok(contest_rows(list, now))
    }

    /// Opens the live contest table.
    pub async fn watch_contests(&self, clock: Arc<dyn Clock>) -> Result<ContestTable, AppError> {
        let list = contests::list_contests(&self.state).await?;
        Ok(ContestTable::spawn(list, clock))
    }

    /// Drafts questions with the model and appends them to the contest form.
    ///
    /// A set with any malformed question is rejected whole and the form is left
    /// untouched. Returns how many questions were added.
    pub async fn generate_questions(
        &self,
        generator: &QuestionGenerator,
        topic: &str,
        count: usize,
        form: &mut ContestRequest,
    ) -> Result<usize, AppError> {
        match generator.generate(topic, count).await {
            Ok(questions) => {
                let added = questions.len();
                accept_into_form(form, questions);
                self.state
                    .notifier
                    .success(&format!("Added {added} generated questions."));
                Ok(added)
            }
            Err(e) => {
                tracing::warn!("Question generation failed: {}", e);
                self.state.notifier.error(&e.user_message());
                Err(e)
            }
        }
    }

    pub async fn save_contest(
        &self,
        mode: &FormMode,
        form: &ContestRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContestRow>, AppError> {
        match mode {
            FormMode::Create => contests::create_contest(&self.state, form).await?,
            FormMode::Edit(id) => contests::update_contest(&self.state, id, form).await?,
        };
        Ok(contest_rows(contests::refetch_contests(&self.state).await?, now))
    }

    pub async fn set_contest_status(
        &self,
        id: &str,
        status: ContestStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContestRow>, AppError> {
        contests::set_contest_status(&self.state, id, status).await?;
        Ok(contest_rows(contests::refetch_contests(&self.state).await?, now))
    }

    pub async fn delete_contest(&self, id: &str, now: DateTime<Utc>) -> Result<Vec<ContestRow>, AppError> {
        contests::delete_contest(&self.state, id).await?;
        Ok(contest_rows(contests::refetch_contests(&self.state).await?, now))
    }

    // Students

    pub async fn students(&self) -> Result<Vec<User>, AppError> {
        students::list_students(&self.state).await
    }

    pub async fn update_student(
        &self,
        id: &str,
        form: &UpdateStudentRequest,
    ) -> Result<Vec<User>, AppError> {
        students::update_student(&self.state, id, form).await?;
        students::refetch_students(&self.state).await
    }

    pub async fn delete_student(&self, id: &str) -> Result<Vec<User>, AppError> {
        students::delete_student(&self.state, id).await?;
        students::refetch_students(&self.state).await
    }

    // Projects

    /// Pending projects first, newest first within a status.
    pub async fn projects(&self) -> Result<Vec<Project>, AppError> {
        let mut list = projects::list_projects(&self.state).await?;
        sort_for_review(&mut list);
        Ok(list)
    }

    pub async fn approve_project(&self, id: &str) -> Result<Vec<Project>, AppError> {
        projects::approve_project(&self.state, id).await?;
        let mut list = projects::refetch_projects(&self.state).await?;
        sort_for_review(&mut list);
        Ok(list)
    }

    pub async fn delete_project(&self, project: &Project) -> Result<Vec<Project>, AppError> {
        projects::delete_project(&self.state, project).await?;
        let mut list = projects::refetch_projects(&self.state).await?;
        sort_for_review(&mut list);
        Ok(list)
    }

    // Logs

    pub async fn logs(&self, query: &LogQuery) -> Result<Vec<ActivityLog>, AppError> {
        logs::list_logs(&self.state, query).await
    }

    pub async fn refresh_logs(&self, query: &LogQuery) -> Result<Vec<ActivityLog>, AppError> {
        logs::refetch_logs(&self.state, query).await
    }
}

/// Builds table rows; ongoing contests first, then upcoming, then completed.
pub fn contest_rows(mut list: Vec<Contest>, now: DateTime<Utc>) -> Vec<ContestRow> {
    list.sort_by_key(|c| match c.status {
        ContestStatus::Ongoing => 0,
        ContestStatus::Upcoming => 1,
        ContestStatus::Completed => 2,
    });
    list.into_iter()
        .map(|contest| ContestRow {
            question_count: contest.questions.len(),
            time_label: time_remaining_label(&contest, now),
            contest,
        })
        .collect()
}

fn sort_for_review(list: &mut [Project]) {
    list.sort_by(|a, b| {
        let pending = |p: &Project| p.status != ProjectStatus::Pending;
        pending(a)
            .cmp(&pending(b))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

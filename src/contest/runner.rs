// src/contest/runner.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    api::contests,
    config::TICK_INTERVAL_MS,
    contest::{
        anticheat::{AntiCheatGuard, Document},
        countdown::{Clock, format_time},
        machine::{AttemptMachine, Command, Phase},
    },
    error::AppError,
    models::{
        attempt::{Attempt, QuizData, Response},
        contest::Contest,
        question::Question,
    },
    state::AppState,
};

/// How often a waiting view asks whether the contest went live.
const WAITING_POLL: Duration = Duration::from_secs(15);

/// Remote operations the contest view depends on.
#[async_trait]
pub trait ContestApi: Send + Sync {
    async fn fetch_contest(&self, id: &str) -> Result<Contest, AppError>;
    async fn start_attempt(&self, id: &str) -> Result<QuizData, AppError>;
    async fn submit_attempt(&self, id: &str, responses: Vec<Response>) -> Result<Attempt, AppError>;
}

#[async_trait]
impl ContestApi for AppState {
    async fn fetch_contest(&self, id: &str) -> Result<Contest, AppError> {
        contests::refetch_contest(self, id).await
    }

    async fn start_attempt(&self, id: &str) -> Result<QuizData, AppError> {
        contests::start_attempt(self, id).await
    }

    async fn submit_attempt(&self, id: &str, responses: Vec<Response>) -> Result<Attempt, AppError> {
        contests::submit_attempt(self, id, responses).await
    }
}

/// Input from the student.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Select { index: usize, option: String },
    /// `confirmed` is the answer to the "submit now?" dialog.
    Submit { confirmed: bool },
    Retry,
    Leave,
}

/// How the view was exited.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Go to the results page.
    Submitted(Attempt),
    Left,
}

/// What a renderer needs after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    /// Empty until the attempt has started.
    pub questions: Vec<Question>,
    pub remaining: u64,
    pub clock: String,
    pub answers: Vec<Option<String>>,
    pub can_submit: bool,
    /// Last rejected action, e.g. "Answer every question before submitting."
    pub notice: Option<String>,
}

impl Snapshot {
    fn of(machine: &AttemptMachine, notice: Option<String>) -> Self {
        Self {
            phase: machine.phase().clone(),
            questions: machine
                .quiz()
                .map(|q| q.questions.clone())
                .unwrap_or_default(),
            remaining: machine.remaining(),
            clock: format_time(machine.remaining()),
            answers: machine.answers().to_vec(),
            can_submit: machine.can_submit(),
            notice,
        }
    }

    pub fn initial() -> Self {
        Self::of(&AttemptMachine::new(), None)
    }
}

/// One mounted contest view.
pub struct ContestView<A: ContestApi> {
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    contest_id: String,
    machine: AttemptMachine,
    snapshots: watch::Sender<Snapshot>,
    notice: Option<String>,
}

impl<A: ContestApi> ContestView<A> {
    pub fn new(
        api: Arc<A>,
        clock: Arc<dyn Clock>,
        contest_id: &str,
        snapshots: watch::Sender<Snapshot>,
    ) -> Self {
        Self {
            api,
            clock,
            contest_id: contest_id.to_string(),
            machine: AttemptMachine::new(),
            snapshots,
            notice: None,
        }
    }

    /// Drives the view until the attempt is submitted or the student leaves.
    ///
    /// Anti-cheat listeners are held for exactly the duration of this call, including
    /// when the future is dropped mid-flight.
    pub async fn run(
        mut self,
        document: &Document,
        mut actions: mpsc::Receiver<UserAction>,
    ) -> Outcome {
        let _guard = AntiCheatGuard::install(document);

        match self.api.fetch_contest(&self.contest_id).await {
            Ok(contest) => {
                let command = self.machine.contest_loaded(contest);
                self.execute(command).await;
            }
            Err(e) => {
                tracing::error!("Failed to load contest {}: {}", self.contest_id, e);
                self.machine.load_failed(e.user_message());
            }
        }

        let mut ticker = interval(Duration::from_millis(TICK_INTERVAL_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll = interval(WAITING_POLL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        poll.tick().await;

        loop {
            self.publish();
            if let Phase::Submitted(attempt) = self.machine.phase() {
                return Outcome::Submitted(attempt.clone());
            }

            tokio::select! {
                _ = ticker.tick() => {
                    let command = self.machine.tick(self.clock.now());
                    self.execute(command).await;
                }
                _ = poll.tick(), if self.machine.is_waiting() => {
                    match self.api.fetch_contest(&self.contest_id).await {
                        Ok(contest) => {
                            let command = self.machine.contest_loaded(contest);
                            self.execute(command).await;
                        }
                        Err(e) => tracing::warn!("Contest poll failed: {}", e),
                    }
                }
                action = actions.recv() => match action {
                    None | Some(UserAction::Leave) => {
                        tracing::info!("Left contest {} in phase {:?}", self.contest_id, self.machine.phase());
                        return Outcome::Left;
                    }
                    Some(action) => self.handle(action).await,
                },
            }
        }
    }

    async fn handle(&mut self, action: UserAction) {
        self.notice = None;
        let result = match action {
            UserAction::Select { index, option } => self.machine.select(index, &option).map(|_| None),
            UserAction::Submit { confirmed } => self.machine.submit(confirmed).map(Some),
            UserAction::Retry => self.machine.retry().map(Some),
            UserAction::Leave => Ok(None),
        };

        match result {
            Ok(command) => self.execute(command).await,
            Err(e) => self.notice = Some(e.user_message()),
        }
    }

    async fn execute(&mut self, mut command: Option<Command>) {
        while let Some(next) = command.take() {
            match next {
                Command::StartAttempt => {
                    self.publish();
                    match self.api.start_attempt(&self.contest_id).await {
                        Ok(quiz) => command = self.machine.attempt_started(quiz, self.clock.now()),
                        Err(e) => {
                            tracing::error!("Failed to start attempt: {}", e);
                            self.machine.attempt_start_failed(e.user_message());
                        }
                    }
                }
                Command::Submit { trigger, responses } => {
                    self.publish();
                    tracing::info!("Submitting contest {} ({:?})", self.contest_id, trigger);
                    match self.api.submit_attempt(&self.contest_id, responses).await {
                        Ok(attempt) => self.machine.submit_succeeded(attempt),
                        Err(e) => {
                            tracing::error!("Submission failed: {}", e);
                            self.machine.submit_failed(e.user_message());
                        }
                    }
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(Snapshot::of(&self.machine, self.notice.clone()));
    }
}

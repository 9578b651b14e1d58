// src/contest/machine.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::{
    contest::countdown::remaining_seconds,
    error::AppError,
    models::{
        attempt::{Attempt, QuizData, Response},
        contest::{Contest, ContestStatus},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The student confirmed the submit dialog.
    Manual,
    /// The countdown reached zero.
    Auto,
}

/// Client-observable phase of one contest view.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    /// The contest is not running; show a waiting message.
    NotStarted(ContestStatus),
    Starting,
    InProgress,
    Submitting(SubmitTrigger),
    /// Terminal. Input is disabled and the view moves to the results.
    Submitted(Attempt),
    /// Loading the contest or starting the attempt failed. Stays on an error card.
    Failed(String),
    /// The submit request failed. Answers are kept and a retry is offered.
    SubmitFailed {
        message: String,
        trigger: SubmitTrigger,
    },
}

/// Side effect the driver must perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartAttempt,
    Submit {
        trigger: SubmitTrigger,
        responses: Vec<Response>,
    },
}

/// Single check-and-set flag shared by the countdown and the submit button.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard(Arc<AtomicBool>);

impl SubmitGuard {
    /// True for exactly one caller until [`SubmitGuard::release`].
    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// State of one mounted contest view. Pure: every method takes the current time
/// or the outcome of a request, and returns the command to run next.
#[derive(Debug)]
pub struct AttemptMachine {
    phase: Phase,
    contest: Option<Contest>,
    quiz: Option<QuizData>,
    answers: Vec<Option<String>>,
    start_requested: bool,
    guard: SubmitGuard,
    remaining: u64,
}

impl Default for AttemptMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            contest: None,
            quiz: None,
            answers: Vec::new(),
            start_requested: false,
            guard: SubmitGuard::default(),
            remaining: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn contest(&self) -> Option<&Contest> {
        self.contest.as_ref()
    }

    pub fn quiz(&self) -> Option<&QuizData> {
        self.quiz.as_ref()
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    /// Seconds left as of the last tick.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn guard(&self) -> SubmitGuard {
        self.guard.clone()
    }

    /// The contest is known and may still go live. A completed contest never will.
    pub fn is_waiting(&self) -> bool {
        matches!(self.phase, Phase::NotStarted(ContestStatus::Upcoming))
    }

    pub fn input_enabled(&self) -> bool {
        match &self.phase {
            Phase::InProgress => true,
            Phase::SubmitFailed { .. } => self.remaining > 0,
            _ => false,
        }
    }

    /// Every question index has a non-empty answer. Vacuously true for an empty quiz.
    pub fn all_answered(&self) -> bool {
        let Some(quiz) = self.quiz.as_ref() else {
            return false;
        };
        self.answers.len() == quiz.questions.len()
            && self
                .answers
                .iter()
                .all(|a| a.as_deref().is_some_and(|a| !a.trim().is_empty()))
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::InProgress) && self.all_answered() && !self.guard.is_held()
    }

    /// Contest metadata arrived (first load or a poll while waiting).
    ///
    /// The attempt start is requested only when the contest is ongoing, no quiz data
    /// is held and no start was requested before on this view.
    pub fn contest_loaded(&mut self, contest: Contest) -> Option<Command> {
        let status = contest.status;
        self.contest = Some(contest);

        if !matches!(self.phase, Phase::Loading | Phase::NotStarted(_)) {
            return None;
        }

        if status != ContestStatus::Ongoing {
            self.phase = Phase::NotStarted(status);
            return None;
        }

        if self.quiz.is_some() || self.start_requested {
            return None;
        }

        self.start_requested = true;
        self.phase = Phase::Starting;
        Some(Command::StartAttempt)
    }

    pub fn load_failed(&mut self, message: String) {
        if matches!(self.phase, Phase::Loading) {
            self.phase = Phase::Failed(message);
        }
    }

    /// The start request succeeded. A resumed attempt restores its saved answers.
    pub fn attempt_started(&mut self, quiz: QuizData, now: DateTime<Utc>) -> Option<Command> {
        if !matches!(self.phase, Phase::Starting) {
            return None;
        }

        let mut answers = vec![None; quiz.questions.len()];
        for (slot, saved) in answers.iter_mut().zip(&quiz.responses) {
            if !saved.selected_option.trim().is_empty() {
                *slot = Some(saved.selected_option.clone());
            }
        }

        self.answers = answers;
        self.remaining = remaining_seconds(quiz.started_at, quiz.timer, now);
        self.quiz = Some(quiz);
        self.phase = Phase::InProgress;

        // Resuming after the deadline submits right away.
        self.tick(now)
    }

    pub fn attempt_start_failed(&mut self, message: String) {
        if matches!(self.phase, Phase::Starting) {
            self.phase = Phase::Failed(message);
        }
    }

    /// Records an answer for the question at `index`.
    pub fn select(&mut self, index: usize, option: &str) -> Result<(), AppError> {
        if !self.input_enabled() {
            return Err(AppError::Validation(
                "Answers can no longer be changed.".to_string(),
            ));
        }
        let quiz = self
            .quiz
            .as_ref()
            .ok_or_else(|| AppError::Validation("The contest has not started.".to_string()))?;
        let question = quiz
            .questions
            .get(index)
            .ok_or_else(|| AppError::Validation(format!("There is no question {}.", index + 1)))?;
        if !question.options.iter().any(|o| o == option) {
            return Err(AppError::Validation(format!(
                "'{option}' is not an option of question {}.",
                index + 1
            )));
        }

        self.answers[index] = Some(option.to_string());
        Ok(())
    }

    /// Recomputes the countdown. Fires the automatic submit once it reaches zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Command> {
        let quiz = self.quiz.as_ref()?;
        self.remaining = remaining_seconds(quiz.started_at, quiz.timer, now);

        if self.remaining == 0 && matches!(self.phase, Phase::InProgress) {
            tracing::info!("Time is up, submitting automatically");
            return self.begin_submit(SubmitTrigger::Auto);
        }
        None
    }

    /// Manual submit after the confirmation dialog.
    pub fn submit(&mut self, confirmed: bool) -> Result<Command, AppError> {
        if !matches!(self.phase, Phase::InProgress) {
            return Err(AppError::Conflict(
                "This attempt cannot be submitted now.".to_string(),
            ));
        }
        if !self.all_answered() {
            return Err(AppError::Validation(
                "Answer every question before submitting.".to_string(),
            ));
        }
        if !confirmed {
            return Err(AppError::Validation("Submission was not confirmed.".to_string()));
        }
        self.begin_submit(SubmitTrigger::Manual)
            .ok_or_else(|| AppError::Conflict("Already submitting.".to_string()))
    }

    /// Re-sends a failed submission with the answers as they are now.
    pub fn retry(&mut self) -> Result<Command, AppError> {
        let Phase::SubmitFailed { trigger, .. } = self.phase else {
            return Err(AppError::Conflict("Nothing to retry.".to_string()));
        };
        self.begin_submit(trigger)
            .ok_or_else(|| AppError::Conflict("Already submitting.".to_string()))
    }

    pub fn submit_succeeded(&mut self, attempt: Attempt) {
        if matches!(self.phase, Phase::Submitting(_)) {
            self.phase = Phase::Submitted(attempt);
        }
    }

    /// The submission did not go through. Releases the guard so a retry can fire.
    pub fn submit_failed(&mut self, message: String) {
        if let Phase::Submitting(trigger) = self.phase {
            self.phase = Phase::SubmitFailed { message, trigger };
            self.guard.release();
        }
    }

    /// Answers in question order. Unanswered questions are sent as an empty selection.
    pub fn responses(&self) -> Vec<Response> {
        self.answers
            .iter()
            .map(|a| Response {
                selected_option: a.clone().unwrap_or_default(),
            })
            .collect()
    }

    fn begin_submit(&mut self, trigger: SubmitTrigger) -> Option<Command> {
        if !self.guard.try_acquire() {
            return None;
        }
        self.phase = Phase::Submitting(trigger);
        Some(Command::Submit {
            trigger,
            responses: self.responses(),
        })
    }
}

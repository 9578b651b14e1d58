// src/main.rs

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use club_portal::{
    AppError, AppState,
    admin::{console::AdminConsole, generator::QuestionGenerator},
    api::{auth, contests},
    config::Config,
    contest::{
        anticheat::Document,
        countdown::{SystemClock, time_remaining_label},
        machine::Phase,
        runner::{ContestView, Outcome, Snapshot, UserAction},
    },
    dashboard::load_dashboard,
    models::{
        contest::ContestRequest,
        problem::Difficulty,
        user::{LoginRequest, UsernameLoginRequest},
    },
    notify::TracingNotifier,
    problems::{ProblemCatalog, ProblemFilter},
    routes::{AdminPage, Decision, Route, guard},
    session::FileStorage,
};
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "club", about = "Coding club portal client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email or username and a password.
    Login {
        #[arg(long, conflicts_with = "username", required_unless_present = "username")]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, env = "CLUB_PASSWORD")]
        password: String,
    },
    /// Passwordless login: mails a code and reads it from stdin.
    LoginOtp {
        #[arg(long)]
        email: String,
    },
    Logout,
    /// Show the signed-in profile.
    Whoami,
    Dashboard,
    /// List contests with their time labels.
    Contests {
        /// Keep the admin table open and recount labels every second until Ctrl+C.
        #[arg(long)]
        watch: bool,
    },
    /// Take a contest interactively.
    Take { id: String },
    Leaderboard { id: String },
    /// Browse the bundled interview-prep problems.
    Problems {
        #[arg(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    /// Draft a contest from questions generated by the configured model (admin only).
    Generate {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value_t = 30)]
        timer: u32,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    match s.to_ascii_lowercase().as_str() {
        "easy" => Ok(Difficulty::Easy),
        "medium" => Ok(Difficulty::Medium),
        "hard" => Ok(Difficulty::Hard),
        other => Err(format!("unknown difficulty '{other}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "club.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    // stdout belongs to the interactive views
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<(), AppError> {
    let storage = Arc::new(FileStorage::new(config.session_file.clone()));
    let state = AppState::new(config, storage, Arc::new(TracingNotifier))?;
    if let Some(user) = state.session.restore().await? {
        tracing::debug!("Restored session for {}", user.email);
    }

    match command {
        Command::Login {
            email,
            username,
            password,
        } => {
            enter(&state, &Route::Login)?;
            let user = match (email, username) {
                (Some(email), _) => auth::login(&state, &LoginRequest { email, password }).await?,
                (None, Some(username)) => {
                    auth::login_with_username(&state, &UsernameLoginRequest { username, password })
                        .await?
                }
                (None, None) => {
                    return Err(AppError::Validation("Give --email or --username.".to_string()));
                }
            };
            println!("Signed in as {} ({:?})", user.name, user.role);
        }
        Command::LoginOtp { email } => {
            enter(&state, &Route::Login)?;
            auth::begin_email_login(&state, &email).await?;
            auth::send_login_otp(&state, &email).await?;
            println!("Enter the code sent to {email}:");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let code = lines.next_line().await?.unwrap_or_default();
            let user = auth::verify_login_otp(&state, &email, code.trim()).await?;
            println!("Signed in as {}", user.name);
        }
        Command::Logout => auth::logout(&state).await?,
        Command::Whoami => {
            enter(&state, &Route::Dashboard)?;
            let user = auth::refresh_user(&state).await?;
            println!("{} <{}> {:?}, {} badge points", user.name, user.email, user.role, user.badge_points());
        }
        Command::Dashboard => {
            enter(&state, &Route::Dashboard)?;
            let dashboard = load_dashboard(&state, Utc::now()).await?;
            println!("Hello, {}", dashboard.user.name);
            match dashboard.rank {
                Some(rank) => println!(
                    "{} points, rank {rank} of {}",
                    dashboard.points, dashboard.total_students
                ),
                None => println!("{} points", dashboard.points),
            }
            for contest in &dashboard.live_contests {
                println!("LIVE  {}  {}", contest.id, contest.title);
            }
            for contest in &dashboard.upcoming_contests {
                println!("SOON  {}  {}", contest.id, contest.title);
            }
            for event in &dashboard.upcoming_events {
                println!("EVENT {}  {}", event.date.format("%Y-%m-%d"), event.title);
            }
            for card in &dashboard.announcements {
                println!("NEWS  {}: {}", card.title, card.preview);
            }
            if dashboard.unread_notifications > 0 {
                println!("{} unread notifications", dashboard.unread_notifications);
            }
        }
        Command::Contests { watch: true } => {
            enter(&state, &Route::Admin(AdminPage::Contests))?;
            let console = AdminConsole::open(&state)?;
            let table = console.watch_contests(Arc::new(SystemClock)).await?;
            let mut rows = table.rows();
            loop {
                for row in rows.borrow_and_update().iter() {
                    println!(
                        "{}  {:<32} {:>2} q  {}",
                        row.contest.id, row.contest.title, row.question_count, row.time_label
                    );
                }
                println!();
                tokio::select! {
                    changed = rows.changed() => if changed.is_err() { break },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        Command::Contests { watch: false } => {
            enter(&state, &Route::Contests)?;
            let now = Utc::now();
            for contest in contests::list_contests(&state).await? {
                println!(
                    "{}  {:<32} {:>3} min  {}",
                    contest.id,
                    contest.title,
                    contest.timer,
                    time_remaining_label(&contest, now)
                );
            }
        }
        Command::Take { id } => take_contest(&state, &id).await?,
        Command::Leaderboard { id } => {
            enter(&state, &Route::ContestResults(id.clone()))?;
            print_leaderboard(&state, &id).await?;
        }
        Command::Problems {
            difficulty,
            topic,
            query,
        } => {
            let catalog = ProblemCatalog::bundled()?;
            let filter = ProblemFilter {
                difficulty,
                topic,
                query,
            };
            for problem in catalog.filter(&filter) {
                println!(
                    "{:<22} {:<8?} {:<16} {}",
                    problem.id,
                    problem.difficulty,
                    problem.topic,
                    problem.link.as_deref().unwrap_or("")
                );
            }
        }
        Command::Generate { topic, timer, count } => {
            enter(&state, &Route::Admin(AdminPage::Contests))?;
            let console = AdminConsole::open(&state)?;
            let genai = state
                .config
                .genai
                .clone()
                .ok_or_else(|| AppError::Config("GENAI_API_KEY is not set".to_string()))?;
            let generator = QuestionGenerator::new(genai, state.config.request_timeout)?;
            let mut draft = ContestRequest {
                title: topic.clone(),
                description: String::new(),
                timer,
                questions: Vec::new(),
                status: None,
            };
            console.generate_questions(&generator, &topic, count, &mut draft).await?;
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
    }
    Ok(())
}

/// Applies the route guard the way navigation would.
fn enter(state: &AppState, route: &Route) -> Result<(), AppError> {
    match guard(route, &state.session) {
        Decision::Render => Ok(()),
        Decision::Redirect(Route::Login) => {
            Err(AppError::AuthError("Please log in first.".to_string()))
        }
        Decision::Redirect(Route::Dashboard) => {
            Err(AppError::Forbidden("Admin access required.".to_string()))
        }
        Decision::Redirect(other) => Err(AppError::Validation(format!(
            "Already signed in. Go to {} or log out first.",
            other.path()
        ))),
    }
}

async fn take_contest(state: &AppState, id: &str) -> Result<(), AppError> {
    enter(state, &Route::TakeContest(id.to_string()))?;

    let (action_tx, action_rx) = mpsc::channel(16);
    let (snapshot_tx, mut snapshot_rx) = watch::channel(Snapshot::initial());
    let document = Document::new();
    let view = ContestView::new(Arc::new(state.clone()), Arc::new(SystemClock), id, snapshot_tx);

    // A blocking stdin read cannot be cancelled, so it gets a detached thread of its own
    // instead of a runtime task; the process may exit while it waits for a line.
    let snapshots = snapshot_rx.clone();
    std::thread::spawn(move || read_actions(std::io::stdin().lock(), action_tx, snapshots));

    let render = async {
        let mut last: Option<Snapshot> = None;
        while snapshot_rx.changed().await.is_ok() {
            let snapshot = snapshot_rx.borrow_and_update().clone();
            render_snapshot(last.as_ref(), &snapshot);
            last = Some(snapshot);
        }
    };

    let (outcome, ()) = tokio::join!(view.run(&document, action_rx), render);

    match outcome {
        Outcome::Submitted(attempt) => {
            println!(
                "Score {}: {} correct, {} wrong",
                attempt.score, attempt.correct_answers, attempt.wrong_answers
            );
            println!("Results: {}", Route::ContestResults(id.to_string()).path());
            print_leaderboard(state, id).await?;
        }
        Outcome::Left => println!("Left the contest."),
    }
    Ok(())
}

/// Stdin commands: `<question> <option>`, `submit`, `retry`, `quit`.
///
/// Stops once the view is gone; end of input leaves the contest.
fn read_actions(
    input: impl BufRead,
    actions: mpsc::Sender<UserAction>,
    snapshots: watch::Receiver<Snapshot>,
) {
    let mut lines = input.lines();
    while let Some(Ok(line)) = lines.next() {
        let line = line.trim();
        let action = match line {
            "submit" => {
                println!("Submit now? [y/N]");
                let answer = lines.next().and_then(Result::ok).unwrap_or_default();
                UserAction::Submit {
                    confirmed: answer.trim().eq_ignore_ascii_case("y"),
                }
            }
            "retry" => UserAction::Retry,
            "quit" | "leave" => UserAction::Leave,
            _ => match parse_selection(line, &snapshots.borrow()) {
                Some(action) => action,
                None => {
                    println!("Commands: <question> <option> | submit | retry | quit");
                    continue;
                }
            },
        };
        if actions.blocking_send(action).is_err() {
            return;
        }
    }
    if !actions.is_closed() {
        let _ = actions.blocking_send(UserAction::Leave);
    }
}

/// `"2 b"` selects option b of question 2.
fn parse_selection(line: &str, snapshot: &Snapshot) -> Option<UserAction> {
    let (question, option) = line.split_once(char::is_whitespace)?;
    let index = question.parse::<usize>().ok()?.checked_sub(1)?;
    let letter = option.trim().chars().next()?.to_ascii_lowercase();
    let slot = (letter as usize).checked_sub('a' as usize)?;
    let option = snapshot.questions.get(index)?.options.get(slot)?.clone();
    Some(UserAction::Select { index, option })
}

fn render_snapshot(last: Option<&Snapshot>, snapshot: &Snapshot) {
    let phase_changed = last.is_none_or(|l| l.phase != snapshot.phase);
    if phase_changed {
        match &snapshot.phase {
            Phase::Loading => println!("Loading contest..."),
            Phase::NotStarted(status) => println!("Contest is {status:?}. Waiting for it to go live..."),
            Phase::Starting => println!("Starting your attempt..."),
            Phase::InProgress => {
                for (i, question) in snapshot.questions.iter().enumerate() {
                    println!("\n{}. {}", i + 1, question.question_text);
                    for (slot, option) in question.options.iter().enumerate() {
                        let letter = char::from(b'a' + slot as u8);
                        println!("   {letter}) {option}");
                    }
                }
                println!("\n{} remaining", snapshot.clock);
            }
            Phase::Submitting(trigger) => println!("Submitting ({trigger:?})..."),
            Phase::Submitted(_) => println!("Submitted."),
            Phase::Failed(message) => println!("{message}"),
            Phase::SubmitFailed { message, .. } => {
                println!("{message} Your answers are kept; type 'retry' to submit again.")
            }
        }
    }

    if snapshot.phase == Phase::InProgress && !phase_changed {
        if let Some(last) = last {
            if last.answers != snapshot.answers {
                let answered = snapshot.answers.iter().filter(|a| a.is_some()).count();
                println!("{answered}/{} answered", snapshot.answers.len());
            }
        }
        if snapshot.remaining <= 10 || snapshot.remaining % 60 == 0 {
            println!("{} remaining", snapshot.clock);
        }
    }

    if let Some(notice) = &snapshot.notice {
        if last.is_none_or(|l| l.notice.as_ref() != Some(notice)) {
            println!("{notice}");
        }
    }
}

async fn print_leaderboard(state: &AppState, id: &str) -> Result<(), AppError> {
    for (i, entry) in contests::leaderboard(state, id).await?.iter().enumerate() {
        let rank = entry.rank.map_or(i + 1, |r| r as usize);
        println!("{rank:>3}. {:<24} {}", entry.student_name, entry.score);
    }
    Ok(())
}

//! Terminal driver for a trivia session: reads player commands on stdin and prints notices.

use std::{env, sync::Arc};

use anyhow::Context;
use futures::{FutureExt, StreamExt, future::BoxFuture};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_session::{
    AnswerVerifier, Challenge, CollaboratorError, FinalFiveSource, GameConfig, RuntimeDeps,
    SharedRuntime, Verdict,
    dao::kv_store::FileStore,
    dto::sse::ServerEvent,
    services::{game_service, time_source::SystemTimeSource},
    state::ledger::normalize_guess,
};

const HELP: &str = "commands: reveal <n> | guess <text> | skip | retry | status | reset | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GameConfig::load();
    let challenge_id = env::var("TRIVIA_CHALLENGE_ID").unwrap_or_else(|_| "daily".into());
    let language = env::var("TRIVIA_LANGUAGE").unwrap_or_else(|_| "en".into());
    let answer = env::var("TRIVIA_ANSWER").unwrap_or_else(|_| "ferris".into());
    let options = env::var("TRIVIA_FINAL_FIVE")
        .map(|raw| raw.split(',').map(|option| option.trim().to_owned()).collect())
        .unwrap_or_else(|_| {
            ["ferris", "tux", "gopher", "duke", "octocat"]
                .map(String::from)
                .to_vec()
        });
    let store_dir = env::var("TRIVIA_STORE_DIR").unwrap_or_else(|_| ".trivia-store".into());

    let store = FileStore::open(&store_dir)
        .with_context(|| format!("opening session store at {store_dir}"))?;
    info!(root = %store.root().display(), "session store ready");

    let runtime = game_service::open_session(RuntimeDeps {
        config,
        challenge: Challenge::new(challenge_id, language),
        store: Arc::new(store),
        verifier: Arc::new(LocalVerifier { answer }),
        final_five: Arc::new(StaticFinalFive { options }),
        clock: Arc::new(SystemTimeSource),
    });

    tokio::spawn(print_notices(runtime.clone()));
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if !handle_command(&runtime, line.trim())? {
                    break;
                }
            }
        }
    }

    info!("leaving session");
    Ok(())
}

/// Run one command line; returns `false` when the player quits.
fn handle_command(runtime: &SharedRuntime, line: &str) -> anyhow::Result<bool> {
    let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
    let result = match command {
        "" => Ok(()),
        "reveal" => match argument.trim().parse::<usize>() {
            Ok(index) => game_service::start_reveal(runtime, index).map(|_| ()),
            Err(_) => {
                println!("usage: reveal <n>");
                Ok(())
            }
        },
        "guess" => game_service::submit_guess(runtime, argument),
        "skip" => game_service::skip_clue(runtime),
        "retry" => game_service::retry_final_five(runtime),
        "reset" => {
            game_service::reset_session(runtime, "player requested a new game");
            Ok(())
        }
        "status" => {
            let view = game_service::session_view(runtime);
            println!(
                "{}",
                serde_json::to_string_pretty(&view).context("rendering session")?
            );
            Ok(())
        }
        "quit" | "exit" => return Ok(false),
        _ => {
            println!("{HELP}");
            Ok(())
        }
    };

    if let Err(rejection) = result {
        println!("rejected: {rejection}");
    }
    Ok(true)
}

async fn print_notices(runtime: SharedRuntime) {
    let mut notices = Box::pin(runtime.notices().stream());
    while let Some(notice) = notices.next().await {
        match ServerEvent::try_from(&notice) {
            Ok(frame) => println!("{} {}", frame.event.unwrap_or_default(), frame.data),
            Err(err) => warn!(error = %err, "failed to render notice"),
        }
    }
}

/// Verifier comparing guesses against a locally known answer.
struct LocalVerifier {
    answer: String,
}

impl AnswerVerifier for LocalVerifier {
    fn verify_guess(
        &self,
        _challenge_id: &str,
        guess: &str,
        _language: &str,
    ) -> BoxFuture<'static, Result<Verdict, CollaboratorError>> {
        let is_correct = normalize_guess(guess) == normalize_guess(&self.answer);
        futures::future::ready(Ok(Verdict { is_correct })).boxed()
    }
}

/// Final Five source serving a fixed option list.
struct StaticFinalFive {
    options: Vec<String>,
}

impl FinalFiveSource for StaticFinalFive {
    fn fetch_final_five_options(
        &self,
        _challenge_id: &str,
        _previous_guesses: &[String],
        _language: &str,
    ) -> BoxFuture<'static, Result<Vec<String>, CollaboratorError>> {
        futures::future::ready(Ok(self.options.clone())).boxed()
    }
}

/// Configure tracing subscribers; logs go to stderr so stdout stays readable.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,trivia_session=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

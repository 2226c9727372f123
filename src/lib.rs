//! Library crate for trivia-session, exposing the session runtime to binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;

pub use config::{GameConfig, StaleTimerPolicy};
pub use error::{CollaboratorError, ConfigError, Rejection};
pub use services::collaborators::{AnswerVerifier, FinalFiveSource, Verdict};
pub use state::{RuntimeDeps, RuntimeState, SharedRuntime, session::Challenge};

/// External collaborator contracts.
pub mod collaborators;
/// Final Five option fetch with backoff.
pub mod final_five_service;
/// Session commands and the effect executor.
pub mod game_service;
/// Write-through snapshot persistence.
pub mod persistence;
/// Scheduled reveal commits.
pub mod reveal_service;
/// Bounded exponential backoff.
pub mod retry;
/// Wall-clock sources.
pub mod time_source;
/// One-second countdown interval.
pub mod timer_service;
/// Single-shot guess verification.
pub mod verification_service;

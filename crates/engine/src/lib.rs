//! Talebound Engine library.
//!
//! Server for two-player, AI-narrated role-playing sessions.
//!
//! ## Structure
//!
//! - `use_cases/` - Session, character and round-cycle orchestration
//! - `use_cases/narration/` - Prompt, generator gateway, update parsing and applying
//! - `infrastructure/` - Ports and their adapters (SQLite, OpenAI-compatible client)
//! - `api/` - HTTP entry points
//! - `app` - Application composition
//! - `config` - Environment configuration

pub mod api;
pub mod app;
pub mod config;
pub mod infrastructure;
pub mod use_cases;

/// Test fixtures module for integration testing.
#[cfg(test)]
pub mod test_fixtures;

/// End-to-end tests over a temporary SQLite store.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
pub use config::EngineConfig;

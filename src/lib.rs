// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod game;
pub mod metrics;
pub mod problem;
pub mod runtime;
pub mod scores;
pub mod session_store;
pub mod warmup;

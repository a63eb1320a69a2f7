//! JobGuard Server
//!
//! HTTP front end for the job-posting fraud classifier: an HTML form at `/`,
//! `POST /predict` for JSON and form clients, plus `/health` and `/metrics`.

pub mod cli;
pub mod config;
pub mod provision;
pub mod server;
pub mod state;

pub use cli::*;
pub use config::*;
pub use server::*;
pub use state::*;

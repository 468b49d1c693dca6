//! tasksync-core - Core library for tasksync
//!
//! Keeps task edits safe while talking to Linear: local drafts, a baseline
//! of the last agreed remote state, a save status machine and conflict
//! detection with explicit resolution.

pub mod baseline;
pub mod config;
pub mod conflict;
pub mod draft;
pub mod error;
pub mod gateway;
pub mod models;
pub mod projection;
pub mod session;
pub mod status;
pub mod store;
pub mod util;

pub use conflict::{Conflict, Resolution};
pub use error::{Error, Result};
pub use models::{Task, TaskFields, TaskId};
pub use session::{EditSession, LoadOutcome, SaveOutcome};
pub use status::SaveStatus;

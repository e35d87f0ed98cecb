//! Automation worker: runs one job against the console and reports back.
//!
//! A job moves through
//! `Init → Authenticating → NavigatingToConsole → SelectingMethod → AwaitingCode
//! → CodeEmitted → PollingConnection → Connected | TimedOut | Failed`.
//! Management and sync jobs branch off after navigation.

mod runner;
mod types;

pub use runner::AutomationWorker;
pub use types::*;

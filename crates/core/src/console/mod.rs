//! Console client abstraction.
//!
//! The console is a web application with no API of its own. `ConsoleConnector`
//! opens one `ConsoleSession` per job; `WebConsole` drives the real site over
//! HTTP with a private cookie jar per session.

mod scrape;
mod traits;
mod types;
mod web;

pub use traits::*;
pub use types::*;
pub use web::{WebConsole, WebConsoleSession};

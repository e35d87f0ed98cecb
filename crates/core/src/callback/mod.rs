//! Callback messages: what a job reports and how it gets there.

mod sink;
mod types;

pub use sink::{CallbackSink, HttpCallbackSink};
pub use types::*;

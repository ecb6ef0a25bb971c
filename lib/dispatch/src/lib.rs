//! Turn dispatching for the copper-sparrow assistant.
//!
//! The dispatcher is the top of the inbound pipeline: for every utterance
//! it decides whether an active recap session claims the turn, whether a
//! command matches, whether a document needs ingesting, or whether the
//! orchestration engine should run.

pub mod command;
pub mod dispatcher;
pub mod error;

pub use command::{Command, parse_command};
pub use dispatcher::{Dispatcher, DocumentTextExtractor};
pub use error::ExtractError;

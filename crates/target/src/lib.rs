// wikiedit-target: orchestration of page load, diff, serialise and save
// requests against a wiki's editing API.

pub mod cache_key;
pub mod checkboxes;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod education;
pub mod error;
pub mod notices;
pub mod retry;
pub mod sanity;
pub mod submit;
pub mod target;
pub mod telemetry;
pub mod transport;

pub use classify::{DiffOutcome, LoadedPage, SaveOutcome};
pub use coordinator::TargetEvent;
pub use document::HtmlDocument;
pub use error::{ErrorKind, PolicyBlock, TargetError};
pub use target::{SaveOptions, Target};

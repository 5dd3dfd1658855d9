//! Fetching subscription sources.
//!
//! A [`Source`] owns the lifecycle of one origin: resolving its URL,
//! streaming the body through the [`crate::parser::Classifier`] and
//! recording the outcome. The [`Scheduler`] runs every source at once and
//! joins them with a bounded wait budget.

pub mod producer;
pub mod scheduler;
pub mod source;
pub mod template;

use std::fmt;
use std::future::Future;

use futures::stream::BoxStream;
use thiserror::Error;

pub use producer::{EntryProducer, Produced, UrlProducer};
pub use scheduler::{collect, RunReport, Scheduler, SchedulerConfig, SourceStats};
pub use source::{ErrorKind, Source, SourceOptions, SourceState};
pub use template::TemplateState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or no response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The connection broke while the body was streaming.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// A response whose body has not been read yet.
pub struct FetchResponse {
    pub status: u16,
    pub body: BoxStream<'static, Result<Vec<u8>, FetchError>>,
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// HTTP GET with a streamed body.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResponse, FetchError>> + Send;
}

/// A failure that points at a defect rather than at the network, reported
/// at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source_index: usize,
    pub url: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "source {} ({}): {}", self.source_index, url, self.message),
            None => write!(f, "source {}: {}", self.source_index, self.message),
        }
    }
}

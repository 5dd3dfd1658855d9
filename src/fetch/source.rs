use std::sync::Arc;

use chrono::NaiveDate;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::fetch::producer::EntryProducer;
use crate::fetch::template::TemplateState;
use crate::fetch::{Diagnostic, FetchError, Fetcher};
use crate::models::RawEntry;
use crate::parser::classifier::{ClassifyError, Classifier};
use crate::settings::sources::SourceEntry;
use crate::utils::url::raw_to_fastly;

/// Why a source ended in [`SourceState::Errored`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient: the request or the body stream failed.
    Network,
    /// A defect: the body or producer output could not be processed.
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Unresolved,
    Fetching,
    Succeeded,
    /// Terminal HTTP status other than 200.
    Failed(u16),
    Errored(ErrorKind),
}

impl SourceState {
    pub fn is_resolved(self) -> bool {
        !matches!(self, SourceState::Unresolved | SourceState::Fetching)
    }
}

#[derive(Clone)]
enum Origin {
    Url(String),
    Template(TemplateState),
    Producer(Arc<dyn EntryProducer>),
}

/// Knobs shared by every source of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    /// Attempts per template origin, the first one included.
    pub retry_depth: u32,
    /// Rewrite `raw.githubusercontent.com` URLs to the jsDelivr mirror.
    pub mirror_raw_github: bool,
    /// Date rendered into `+date` templates on the first attempt.
    pub today: NaiveDate,
}

impl Default for SourceOptions {
    fn default() -> Self {
        SourceOptions {
            retry_depth: 2,
            mirror_raw_github: false,
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// One fetch unit and its outcome.
pub struct Source {
    index: usize,
    origin: Origin,
    mirror_raw_github: bool,
    state: SourceState,
    url: Option<String>,
    entries: Vec<RawEntry>,
}

enum Attempt {
    Entries(Vec<RawEntry>),
    Status(u16),
    Network(FetchError),
    Unclassifiable(ClassifyError),
}

impl Source {
    pub fn url(index: usize, url: impl Into<String>) -> Self {
        Self::with_origin(index, Origin::Url(url.into()))
    }

    pub fn template(index: usize, template: TemplateState) -> Self {
        Self::with_origin(index, Origin::Template(template))
    }

    pub fn producer(index: usize, producer: Arc<dyn EntryProducer>) -> Self {
        Self::with_origin(index, Origin::Producer(producer))
    }

    /// Builds a source from a parsed source list line.
    pub fn from_entry(index: usize, entry: &SourceEntry, options: &SourceOptions) -> Self {
        let source = if entry.is_template() {
            Self::template(
                index,
                TemplateState::new(
                    entry.url.clone(),
                    entry.tags.clone(),
                    options.today,
                    options.retry_depth,
                ),
            )
        } else {
            Self::url(index, entry.url.clone())
        };
        source.with_mirror(options.mirror_raw_github)
    }

    fn with_origin(index: usize, origin: Origin) -> Self {
        Source {
            index,
            origin,
            mirror_raw_github: false,
            state: SourceState::Unresolved,
            url: None,
            entries: Vec::new(),
        }
    }

    pub fn with_mirror(mut self, mirror_raw_github: bool) -> Self {
        self.mirror_raw_github = mirror_raw_github;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// The URL of the last attempt, once one was made.
    pub fn resolved_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn take_entries(&mut self) -> Vec<RawEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Short description for logs, available before resolution.
    pub fn label(&self) -> String {
        match &self.origin {
            Origin::Url(url) => url.clone(),
            Origin::Template(template) => template.template().to_string(),
            Origin::Producer(producer) => format!("<{}>", producer.name()),
        }
    }

    /// Resolves the source. Calling it again once resolved does nothing.
    pub async fn get<F: Fetcher>(&mut self, fetcher: &F, diagnostics: &UnboundedSender<Diagnostic>) {
        if self.state != SourceState::Unresolved {
            return;
        }
        self.state = SourceState::Fetching;

        match self.origin.clone() {
            Origin::Producer(producer) => self.run_producer(producer, diagnostics).await,
            Origin::Url(url) => {
                let url = self.rewrite(url);
                let attempt = fetch_once(fetcher, &url).await;
                self.url = Some(url);
                self.settle(attempt, diagnostics);
            }
            Origin::Template(mut template) => loop {
                let url = self.rewrite(template.url());
                let attempt = fetch_once(fetcher, &url).await;
                self.url = Some(url);

                if matches!(attempt, Attempt::Status(_) | Attempt::Network(_)) {
                    if let Some(next) = template.regenerate() {
                        info!(
                            "Source {} failed, retrying with {}",
                            self.index,
                            next.date()
                        );
                        template = next;
                        continue;
                    }
                }
                self.settle(attempt, diagnostics);
                break;
            },
        }
    }

    fn rewrite(&self, url: String) -> String {
        if self.mirror_raw_github && url.contains("raw.githubusercontent.com") {
            raw_to_fastly(&url)
        } else {
            url
        }
    }

    fn settle(&mut self, attempt: Attempt, diagnostics: &UnboundedSender<Diagnostic>) {
        match attempt {
            Attempt::Entries(entries) => {
                debug!("Source {} yielded {} entries", self.index, entries.len());
                self.entries = entries;
                self.state = SourceState::Succeeded;
            }
            Attempt::Status(status) => {
                warn!("Source {} answered {}", self.index, status);
                self.state = SourceState::Failed(status);
            }
            Attempt::Network(e) => {
                warn!("Source {} failed: {}", self.index, e);
                self.state = SourceState::Errored(ErrorKind::Network);
            }
            Attempt::Unclassifiable(e) => self.report(e.to_string(), diagnostics),
        }
    }

    fn report(&mut self, message: String, diagnostics: &UnboundedSender<Diagnostic>) {
        self.state = SourceState::Errored(ErrorKind::Internal);
        let diagnostic = Diagnostic {
            source_index: self.index,
            url: self.url.clone(),
            message,
        };
        if diagnostics.send(diagnostic).is_err() {
            debug!("Diagnostic queue closed, dropping report of source {}", self.index);
        }
    }

    async fn run_producer(
        &mut self,
        producer: Arc<dyn EntryProducer>,
        diagnostics: &UnboundedSender<Diagnostic>,
    ) {
        let name = producer.name().to_string();
        match tokio::task::spawn_blocking(move || producer.produce()).await {
            Ok(Ok(produced)) => {
                self.entries = produced.into_entries();
                self.state = SourceState::Succeeded;
            }
            Ok(Err(e)) => self.report(format!("producer {} failed: {:#}", name, e), diagnostics),
            Err(e) => self.report(format!("producer {} panicked: {}", name, e), diagnostics),
        }
    }
}

/// One GET, streamed through a classifier until it has what it needs.
async fn fetch_once<F: Fetcher>(fetcher: &F, url: &str) -> Attempt {
    let response = match fetcher.fetch(url).await {
        Ok(response) => response,
        Err(e) => return Attempt::Network(e),
    };
    if response.status != 200 {
        return Attempt::Status(response.status);
    }

    let mut body = response.body;
    let mut classifier = Classifier::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => {
                if classifier.feed(&chunk).is_break() {
                    debug!("Stopped reading {} early", url);
                    break;
                }
            }
            Err(e) => return Attempt::Network(e),
        }
    }
    drop(body);

    match classifier.finish() {
        Ok(entries) => Attempt::Entries(entries),
        Err(e) => Attempt::Unclassifiable(e),
    }
}

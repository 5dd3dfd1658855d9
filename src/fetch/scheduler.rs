//! Concurrent fan-out over sources with a bounded join budget.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::fetch::producer::{collect_producer_urls, EntryProducer, UrlProducer};
use crate::fetch::source::{Source, SourceOptions, SourceState};
use crate::fetch::{Diagnostic, Fetcher};
use crate::merge::Merger;
use crate::models::RawEntry;
use crate::settings::sources::SourceEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Length of one bounded wait on a task.
    pub wait_increment: Duration,
    /// Waits spent on one task before it is abandoned.
    pub max_wait_increments: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            wait_increment: Duration::from_secs(5),
            max_wait_increments: 6,
        }
    }
}

/// What happened to one source, for the end of run table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub index: usize,
    pub url: String,
    /// `None` when the source was abandoned before it finished.
    pub state: Option<SourceState>,
    pub entries: usize,
    pub added: usize,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub stats: Vec<SourceStats>,
    pub diagnostics: Vec<Diagnostic>,
    pub interrupted: bool,
}

enum Wait {
    Joined(Result<Source, JoinError>),
    Elapsed,
    Interrupted,
}

pub struct Scheduler<F: Fetcher> {
    fetcher: Arc<F>,
    config: SchedulerConfig,
    interrupt: Option<watch::Receiver<bool>>,
    interrupted: bool,
}

impl<F: Fetcher> Scheduler<F> {
    pub fn new(fetcher: Arc<F>, config: SchedulerConfig) -> Self {
        Scheduler {
            fetcher,
            config,
            interrupt: None,
            interrupted: false,
        }
    }

    /// Stops waiting once `true` is sent on the channel.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Fetches every source and merges them in order of their index.
    pub async fn run(&mut self, sources: Vec<Source>, merger: &mut Merger) -> RunReport {
        let mut stats = Vec::with_capacity(sources.len());
        let diagnostics = self
            .join_all(sources, |index, label, joined| {
                let stat = match joined {
                    Some(mut source) => {
                        let entries = source.take_entries();
                        let summary = merger.merge_entries(index, &entries);
                        info!(
                            "Source {} ({}): {:?}, {} entries, {} new",
                            index,
                            label,
                            source.state(),
                            entries.len(),
                            summary.added
                        );
                        SourceStats {
                            index,
                            url: source.resolved_url().unwrap_or(&label).to_string(),
                            state: Some(source.state()),
                            entries: entries.len(),
                            added: summary.added,
                        }
                    }
                    None => SourceStats {
                        index,
                        url: label,
                        state: None,
                        entries: 0,
                        added: 0,
                    },
                };
                stats.push(stat);
            })
            .await;

        RunReport {
            stats,
            diagnostics,
            interrupted: self.interrupted,
        }
    }

    /// Fetches airport sources and returns the subscription URLs they list.
    pub async fn expand_airports(&mut self, airports: Vec<Source>) -> Vec<String> {
        let mut urls = Vec::new();
        self.join_all(airports, |index, label, joined| {
            let Some(source) = joined else {
                return;
            };
            let found: Vec<String> = source
                .entries()
                .iter()
                .filter_map(|entry| match entry {
                    RawEntry::Link(link)
                        if link.starts_with("http://") || link.starts_with("https://") =>
                    {
                        Some(link.clone())
                    }
                    _ => None,
                })
                .collect();
            info!("Airport {} ({}) listed {} subscriptions", index, label, found.len());
            urls.extend(found);
        })
        .await;
        urls
    }

    /// Spawns every source, then joins them one by one in index order.
    ///
    /// `on_joined` gets `None` for sources that were abandoned.
    async fn join_all(
        &mut self,
        mut sources: Vec<Source>,
        mut on_joined: impl FnMut(usize, String, Option<Source>),
    ) -> Vec<Diagnostic> {
        sources.sort_by_key(Source::index);
        let (tx, rx) = unbounded_channel();

        let tasks: Vec<(usize, String, JoinHandle<Source>)> = sources
            .into_iter()
            .map(|mut source| {
                let index = source.index();
                let label = source.label();
                let fetcher = Arc::clone(&self.fetcher);
                let tx: UnboundedSender<Diagnostic> = tx.clone();
                let handle = tokio::spawn(async move {
                    source.get(fetcher.as_ref(), &tx).await;
                    source
                });
                (index, label, handle)
            })
            .collect();
        drop(tx);

        let mut diagnostics = Vec::new();
        for (index, label, handle) in tasks {
            match self.join(handle).await {
                Some(Ok(source)) => on_joined(index, label, Some(source)),
                Some(Err(e)) => {
                    diagnostics.push(Diagnostic {
                        source_index: index,
                        url: Some(label.clone()),
                        message: format!("fetch task failed: {}", e),
                    });
                    on_joined(index, label, None);
                }
                None => {
                    warn!("Abandoning source {} ({})", index, label);
                    on_joined(index, label, None);
                }
            }
        }

        diagnostics.extend(drain(rx));
        for diagnostic in &diagnostics {
            error!("{}", diagnostic);
        }
        diagnostics
    }

    /// Waits for one task within the budget. `None` means it was abandoned;
    /// the task keeps running but its result is never looked at.
    async fn join(&mut self, mut handle: JoinHandle<Source>) -> Option<Result<Source, JoinError>> {
        let mut remaining = if self.interrupted {
            0
        } else {
            self.config.max_wait_increments
        };
        let increment = self.config.wait_increment;

        while remaining > 0 {
            let wait = tokio::select! {
                joined = tokio::time::timeout(increment, &mut handle) => match joined {
                    Ok(joined) => Wait::Joined(joined),
                    Err(_) => Wait::Elapsed,
                },
                _ = wait_for_interrupt(&mut self.interrupt) => Wait::Interrupted,
            };
            match wait {
                Wait::Joined(joined) => return Some(joined),
                Wait::Elapsed => remaining -= 1,
                Wait::Interrupted => {
                    warn!("Interrupted, no longer waiting for unfinished sources");
                    self.interrupted = true;
                    remaining = 0;
                }
            }
        }

        if handle.is_finished() {
            Some(handle.await)
        } else {
            None
        }
    }
}

/// Resolves once an interrupt is requested; never resolves without a channel.
async fn wait_for_interrupt(interrupt: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = interrupt {
        let closed = rx.wait_for(|requested| *requested).await.is_err();
        if !closed {
            return;
        }
    }
    std::future::pending::<()>().await
}

fn drain(mut rx: UnboundedReceiver<Diagnostic>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    while let Ok(diagnostic) = rx.try_recv() {
        diagnostics.push(diagnostic);
    }
    diagnostics
}

/// Runs a whole collection pass.
///
/// Airports are fetched first and their subscription URLs join the plain
/// sources and the URL producers' output; the combined list is sorted,
/// indexed and fetched, followed by the entry producers.
pub async fn collect<F: Fetcher>(
    scheduler: &mut Scheduler<F>,
    entries: Vec<SourceEntry>,
    options: &SourceOptions,
    url_producers: Vec<Arc<dyn UrlProducer>>,
    entry_producers: Vec<Arc<dyn EntryProducer>>,
    merger: &mut Merger,
) -> RunReport {
    let (airports, mut plain): (Vec<SourceEntry>, Vec<SourceEntry>) =
        entries.into_iter().partition(|entry| entry.airport);

    if !airports.is_empty() {
        let airports = airports
            .iter()
            .enumerate()
            .map(|(index, entry)| Source::from_entry(index, entry, options))
            .collect();
        let urls = scheduler.expand_airports(airports).await;
        plain.extend(urls.into_iter().map(SourceEntry::plain));
    }
    plain.extend(
        collect_producer_urls(url_producers)
            .await
            .into_iter()
            .map(SourceEntry::plain),
    );
    plain.sort();
    plain.dedup();

    let mut sources: Vec<Source> = plain
        .iter()
        .enumerate()
        .map(|(index, entry)| Source::from_entry(index, entry, options))
        .collect();
    let offset = sources.len();
    sources.extend(
        entry_producers
            .into_iter()
            .enumerate()
            .map(|(i, producer)| Source::producer(offset + i, producer)),
    );

    info!("Fetching {} sources", sources.len());
    scheduler.run(sources, merger).await
}

//! Programmatic origins.
//!
//! Site specific scrapers live outside this crate; they plug in through
//! these traits. Both are synchronous and may block.

use std::sync::Arc;

use log::{info, warn};
use serde_yaml::Mapping;

use crate::models::RawEntry;

/// Yields subscription URLs, resolved before scheduling starts.
pub trait UrlProducer: Send + Sync {
    fn name(&self) -> &str;
    fn urls(&self) -> anyhow::Result<Vec<String>>;
}

/// What an [`EntryProducer`] hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Produced {
    Link(String),
    Links(Vec<String>),
    Fragments(Vec<Mapping>),
}

impl Produced {
    pub fn into_entries(self) -> Vec<RawEntry> {
        match self {
            Produced::Link(link) => vec![RawEntry::Link(link)],
            Produced::Links(links) => links.into_iter().map(RawEntry::Link).collect(),
            Produced::Fragments(fragments) => {
                fragments.into_iter().map(RawEntry::Fragment).collect()
            }
        }
    }
}

/// Yields entries directly, without a fetch. Run on a blocking thread.
pub trait EntryProducer: Send + Sync {
    fn name(&self) -> &str;
    fn produce(&self) -> anyhow::Result<Produced>;
}

/// Calls every URL producer on a blocking thread; failures are logged and
/// skipped.
pub async fn collect_producer_urls(producers: Vec<Arc<dyn UrlProducer>>) -> Vec<String> {
    let mut urls = Vec::new();
    for producer in producers {
        let name = producer.name().to_string();
        match tokio::task::spawn_blocking(move || producer.urls()).await {
            Ok(Ok(found)) => {
                info!("{} produced {} urls", name, found.len());
                urls.extend(found.into_iter().filter(|url| !url.is_empty()));
            }
            Ok(Err(e)) => warn!("URL producer {} failed: {:#}", name, e),
            Err(e) => warn!("URL producer {} panicked: {}", name, e),
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    struct Fixed(&'static [&'static str]);

    impl UrlProducer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn urls(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct Broken;

    impl UrlProducer for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn urls(&self) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("page layout changed")
        }
    }

    #[tokio::test]
    async fn test_collect_producer_urls_skips_failures() {
        let producers: Vec<Arc<dyn UrlProducer>> = vec![
            Arc::new(Broken),
            Arc::new(Fixed(&["https://a.example.com/sub", ""])),
        ];
        assert_eq!(
            collect_producer_urls(producers).await,
            vec!["https://a.example.com/sub".to_string()]
        );
    }

    struct RecordsThread(Mutex<Option<ThreadId>>);

    impl UrlProducer for RecordsThread {
        fn name(&self) -> &str {
            "thread"
        }

        fn urls(&self) -> anyhow::Result<Vec<String>> {
            *self.0.lock().unwrap() = Some(std::thread::current().id());
            Ok(vec!["https://t.example.com/sub".to_string()])
        }
    }

    #[tokio::test]
    async fn test_url_producers_run_off_the_async_thread() {
        let producer = Arc::new(RecordsThread(Mutex::new(None)));
        let urls = collect_producer_urls(vec![producer.clone() as Arc<dyn UrlProducer>]).await;
        assert_eq!(urls.len(), 1);
        let ran_on = producer.0.lock().unwrap().expect("producer was called");
        assert_ne!(ran_on, std::thread::current().id());
    }

    #[test]
    fn test_produced_into_entries() {
        assert_eq!(
            Produced::Links(vec!["a://1".into(), "b://2".into()]).into_entries(),
            vec![RawEntry::from("a://1"), RawEntry::from("b://2")]
        );
    }
}

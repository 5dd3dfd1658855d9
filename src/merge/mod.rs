//! The working set of a run.
//!
//! A [`Merger`] owns every accepted [`Proxy`], the set of names in use, the
//! provenance of each identity and the entries no decoder understood. Sources
//! are merged one at a time from a single task, so none of this is shared.

pub mod filter;

use std::collections::{HashMap, HashSet};

use linked_hash_map::LinkedHashMap;
use log::{debug, warn};

use crate::models::{Proxy, ProxyIdentity, RawEntry};
use crate::parser::explodes::explode_entry;
use crate::parser::types::ExplodeError;

pub use filter::{is_fake, is_link_candidate, supports_clash, supports_ray};

/// Maximum display name length, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 30;

const ELLIPSIS: &str = "...";

/// Outcome of merging one batch of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Entries offered, before filtering.
    pub entries: usize,
    /// Records that were new to the working set.
    pub added: usize,
    /// Records whose identity was already present.
    pub duplicates: usize,
    /// Entries kept verbatim in the unknown set.
    pub unknown: usize,
}

#[derive(Debug)]
pub struct Merger {
    max_name_len: usize,
    proxies: LinkedHashMap<ProxyIdentity, Proxy>,
    names: HashSet<String>,
    provenance: HashMap<ProxyIdentity, Vec<usize>>,
    unknown: Vec<RawEntry>,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NAME_LEN)
    }
}

impl Merger {
    pub fn new(max_name_len: usize) -> Self {
        Merger {
            max_name_len: max_name_len.max(ELLIPSIS.len() + 1),
            proxies: LinkedHashMap::new(),
            names: HashSet::new(),
            provenance: HashMap::new(),
            unknown: Vec::new(),
        }
    }

    /// Decode and merge the entries produced by source `source_index`.
    pub fn merge_entries(&mut self, source_index: usize, entries: &[RawEntry]) -> MergeSummary {
        let mut summary = MergeSummary {
            entries: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            if let RawEntry::Link(link) = entry {
                if !is_link_candidate(link) {
                    continue;
                }
            }

            match explode_entry(entry) {
                Ok(proxy) => {
                    if self.insert(source_index, proxy) {
                        summary.added += 1;
                    } else {
                        summary.duplicates += 1;
                    }
                }
                Err(ExplodeError::NotALink) => {}
                Err(e @ ExplodeError::UnsupportedKind { .. }) => {
                    if let ExplodeError::UnsupportedKind { reason: None, .. } = &e {
                        warn!("{}", e);
                    } else {
                        debug!("{}", e);
                    }
                    if !self.unknown.contains(entry) {
                        self.unknown.push(entry.clone());
                        summary.unknown += 1;
                    }
                }
                Err(e) => warn!("Dropping entry from source {}: {}", source_index, e),
            }
        }
        summary
    }

    /// Adds a decoded record. Returns false when its identity was already known.
    pub fn insert(&mut self, source_index: usize, mut proxy: Proxy) -> bool {
        let identity = proxy.identity();
        let sources = self.provenance.entry(identity.clone()).or_default();
        if !sources.contains(&source_index) {
            sources.push(source_index);
        }
        if self.proxies.contains_key(&identity) {
            return false;
        }

        proxy.name = self.unique_name(&proxy.name);
        debug!("Added {} node {}", proxy.proxy_type().to_string(), proxy.name);
        self.names.insert(proxy.name.clone());
        self.proxies.insert(identity, proxy);
        true
    }

    fn unique_name(&self, name: &str) -> String {
        let name = truncate_name(name, self.max_name_len);
        if !self.names.contains(&name) {
            return name;
        }
        (1..)
            .map(|n| format!("{} #{}", name, n))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or(name)
    }

    /// All accepted records, in insertion order.
    pub fn proxies(&self) -> impl Iterator<Item = &Proxy> {
        self.proxies.values()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn get(&self, identity: &ProxyIdentity) -> Option<&Proxy> {
        self.proxies.get(identity)
    }

    /// Indices of the sources that produced `identity`, in merge order.
    pub fn provenance(&self, identity: &ProxyIdentity) -> &[usize] {
        self.provenance
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Entries kept verbatim because no decoder supports them.
    pub fn unknown(&self) -> &[RawEntry] {
        &self.unknown
    }

    /// Records Clash can load, fakes excluded.
    pub fn clash_view(&self) -> impl Iterator<Item = &Proxy> {
        self.proxies()
            .filter(|proxy| !is_fake(proxy) && supports_clash(proxy))
    }

    /// Records V2Ray style clients can load, fakes excluded.
    pub fn ray_view(&self) -> impl Iterator<Item = &Proxy> {
        self.proxies()
            .filter(|proxy| !is_fake(proxy) && supports_ray(proxy))
    }
}

/// Shortens `name` to `max_len` characters, marking the cut with `...`.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    let kept: String = name
        .chars()
        .take(max_len.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 30), "short");
        let long = "a".repeat(31);
        assert_eq!(truncate_name(&long, 30), format!("{}...", "a".repeat(27)));
        let wide = "香".repeat(31);
        assert_eq!(truncate_name(&wide, 30).chars().count(), 30);
    }

    #[test]
    fn test_unsupported_kept_once() {
        let mut merger = Merger::default();
        let entry = RawEntry::from("hysteria2://pw@h.example.com:443#H");
        let first = merger.merge_entries(0, &[entry.clone()]);
        merger.merge_entries(1, &[entry.clone()]);
        assert_eq!(first.unknown, 1);
        assert_eq!(merger.unknown(), &[entry]);
        assert!(merger.is_empty());
    }

    #[test]
    fn test_malformed_and_non_candidates_are_dropped() {
        let mut merger = Merger::default();
        let summary = merger.merge_entries(
            0,
            &[
                RawEntry::from("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:http#Bad"),
                RawEntry::from("just text"),
                RawEntry::from("trojan://pw@t.example.com:443 | rm -rf"),
            ],
        );
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.added, 0);
        assert!(merger.is_empty());
        assert!(merger.unknown().is_empty());
    }
}

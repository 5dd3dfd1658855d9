//! Rendering of the final outputs from a merged working set.

use log::{info, warn};
use serde_yaml::Mapping;

use crate::generator::clash::proxies_to_clash_yaml;
use crate::generator::single::proxy_to_uri;
use crate::merge::Merger;
use crate::models::RawEntry;
use crate::utils::base64::base64_encode;

/// One link per line: every V2Ray compatible record, then the unknown links.
pub fn render_link_list(merger: &Merger) -> String {
    let mut txt = String::new();
    let mut supported = 0;
    for proxy in merger.ray_view() {
        txt.push_str(&proxy_to_uri(proxy));
        txt.push('\n');
        supported += 1;
    }
    for entry in merger.unknown() {
        if let RawEntry::Link(link) = entry {
            txt.push_str(link);
            txt.push('\n');
        }
    }
    info!(
        "{} usable records, {} unparsed entries, {} records in total",
        supported,
        merger.unknown().len(),
        merger.len()
    );
    txt
}

/// The link list wrapped in standard Base64, as subscription clients expect.
pub fn render_base64_list(link_list: &str) -> String {
    base64_encode(link_list)
}

/// Unknown Clash fragments. No output format carries them.
pub fn unrendered_fragments(merger: &Merger) -> Vec<&Mapping> {
    merger
        .unknown()
        .iter()
        .filter_map(|entry| match entry {
            RawEntry::Fragment(fragment) => Some(fragment),
            RawEntry::Link(_) => None,
        })
        .collect()
}

/// The Clash compatible records as a `proxies:` document.
pub fn render_clash_proxies(merger: &Merger) -> String {
    let skipped = unrendered_fragments(merger);
    for fragment in &skipped {
        warn!(
            "Not writing unsupported {} node {} ({})",
            field(fragment, "type"),
            field(fragment, "name"),
            field(fragment, "server")
        );
    }
    if !skipped.is_empty() {
        warn!("{} unsupported clash nodes left out of the outputs", skipped.len());
    }
    proxies_to_clash_yaml(merger.clash_view())
}

fn field<'a>(fragment: &'a Mapping, key: &str) -> &'a str {
    fragment.get(key).and_then(|v| v.as_str()).unwrap_or("?")
}

/// All rendered outputs of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub link_list: String,
    pub base64_list: String,
    pub clash_proxies: String,
}

impl Outputs {
    pub fn render(merger: &Merger) -> Self {
        let link_list = render_link_list(merger);
        Outputs {
            base64_list: render_base64_list(&link_list),
            clash_proxies: render_clash_proxies(merger),
            link_list,
        }
    }
}

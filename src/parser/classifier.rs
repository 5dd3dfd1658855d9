//! Incremental subscription body classification.
//!
//! A subscription URL may serve a Clash config, a Base64 blob of links, or a
//! plain list of links, and nothing in the response says which. The
//! [`Classifier`] decides from the first meaningful line while the body is
//! still streaming, and stops reading a Clash config as soon as its
//! `proxies:` section is over.

use std::ops::ControlFlow;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use thiserror::Error;

use crate::models::RawEntry;
use crate::parser::explodes::clash::strip_tags;
use crate::utils::base64::base64_decode;

/// `key: value` or `key:` at the start of a YAML document.
static YAML_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*:(\s|$)").expect("Invalid YAML key regex"));

const PROXIES_MARKER: &str = "proxies:";
const PROXY_GROUPS_MARKER: &str = "proxy-groups:";
const YAML_DOCUMENT_MARKER: &str = "---";

/// Shape of a subscription body, decided from its first meaningful line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// A Clash YAML config; entries come from its `proxies` list.
    Clash,
    /// One proxy link per line.
    LinkList,
    /// The whole body is one Base64 blob of newline separated links.
    Base64,
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("invalid clash config: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("body is neither a link list nor valid base64")]
    InvalidBlob,
}

/// Decides the shape of a line that is neither empty nor a comment.
pub fn detect_shape(line: &str) -> BodyShape {
    if YAML_KEY_REGEX.is_match(line) {
        BodyShape::Clash
    } else if line.contains("://") {
        BodyShape::LinkList
    } else {
        BodyShape::Base64
    }
}

/// Streaming classifier over body chunks.
///
/// Feed chunks in order with [`Classifier::feed`]; once it answers
/// [`ControlFlow::Break`] the rest of the body is not needed. Then call
/// [`Classifier::finish`] to get the entries.
#[derive(Debug, Default)]
pub struct Classifier {
    /// Bytes after the last complete line; may end inside a UTF-8 sequence.
    pending: Vec<u8>,
    /// Prefix of `pending` already searched for a line break.
    scanned: usize,
    shape: Option<BodyShape>,
    content: String,
    links: Vec<RawEntry>,
    stopped: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(&self) -> Option<BodyShape> {
        self.shape
    }

    /// Consumes one chunk of the body.
    pub fn feed(&mut self, chunk: &[u8]) -> ControlFlow<()> {
        if self.stopped {
            return ControlFlow::Break(());
        }
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.pending[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            start = end + 1;
            from = start;
            if self.push_line(&line).is_break() {
                self.stopped = true;
                self.pending.clear();
                self.scanned = 0;
                return ControlFlow::Break(());
            }
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        ControlFlow::Continue(())
    }

    fn push_line(&mut self, line: &str) -> ControlFlow<()> {
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            return ControlFlow::Continue(());
        }

        let shape = match self.shape {
            Some(shape) => shape,
            None => {
                if line.trim_start().starts_with('#') || line == YAML_DOCUMENT_MARKER {
                    return ControlFlow::Continue(());
                }
                let shape = detect_shape(line);
                debug!("Subscription body looks like {:?}", shape);
                self.shape = Some(shape);
                shape
            }
        };

        match shape {
            BodyShape::Clash => {
                if self.content.is_empty() {
                    if line == PROXIES_MARKER {
                        self.content.push_str(line);
                        self.content.push('\n');
                    }
                } else if line == PROXY_GROUPS_MARKER {
                    return ControlFlow::Break(());
                } else {
                    self.content.push_str(line);
                    self.content.push('\n');
                }
            }
            BodyShape::LinkList => self.links.push(RawEntry::Link(line.trim().to_string())),
            BodyShape::Base64 => self.content.push_str(line.trim()),
        }
        ControlFlow::Continue(())
    }

    /// Treats the bytes after the last line break as a final line.
    fn flush(&mut self) {
        if !self.stopped && !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.scanned = 0;
            let _ = self.push_line(&line);
        }
    }

    /// Ends the stream and extracts the entries.
    pub fn finish(mut self) -> Result<Vec<RawEntry>, ClassifyError> {
        self.flush();

        match self.shape {
            None => Ok(Vec::new()),
            Some(BodyShape::LinkList) => Ok(self.links),
            Some(BodyShape::Clash) => parse_clash_proxies(&self.content),
            Some(BodyShape::Base64) => {
                let decoded = base64_decode(&self.content).ok_or(ClassifyError::InvalidBlob)?;
                Ok(decoded
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(RawEntry::from)
                    .collect())
            }
        }
    }
}

/// Extracts the `proxies` list of a (possibly truncated) Clash config.
fn parse_clash_proxies(content: &str) -> Result<Vec<RawEntry>, ClassifyError> {
    if content.is_empty() {
        debug!("Clash config has no proxies section");
        return Ok(Vec::new());
    }
    let document = strip_tags(serde_yaml::from_str::<Value>(content)?);
    let proxies = match document.get(PROXIES_MARKER.trim_end_matches(':')) {
        Some(Value::Sequence(proxies)) => proxies.clone(),
        _ => return Ok(Vec::new()),
    };

    Ok(proxies
        .into_iter()
        .filter_map(|proxy| match proxy {
            Value::Mapping(fragment) => Some(RawEntry::Fragment(fragment)),
            Value::String(link) => Some(RawEntry::Link(link)),
            _ => None,
        })
        .collect())
}

/// Classifies a complete body in one go.
pub fn classify_str(body: &str) -> Result<Vec<RawEntry>, ClassifyError> {
    let mut classifier = Classifier::new();
    let _ = classifier.feed(body.as_bytes());
    classifier.finish()
}

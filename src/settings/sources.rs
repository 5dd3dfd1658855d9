//! The `sources.list` format.
//!
//! One origin per line:
//!
//! ```text
//! # comment
//! https://example.com/sub            plain subscription
//! !https://example.com/ci-only       skipped in local mode
//! *https://example.com/airports      body lists further subscription URLs
//! +date https://example.com/%Y%m%d   template, tags before the URL
//! ```

/// One parsed line of the source list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceEntry {
    /// URL, or URL template when `tags` is not empty.
    pub url: String,
    /// `+` tags, e.g. `+date`.
    pub tags: Vec<String>,
    pub airport: bool,
}

impl SourceEntry {
    pub fn plain(url: impl Into<String>) -> Self {
        SourceEntry {
            url: url.into(),
            tags: Vec::new(),
            airport: false,
        }
    }

    pub fn is_template(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// Parses a source list; the result is sorted.
pub fn parse_source_lines(content: &str, local_mode: bool) -> Vec<SourceEntry> {
    let mut entries: Vec<SourceEntry> = content
        .lines()
        .filter_map(|line| parse_source_line(line.trim(), local_mode))
        .collect();
    entries.sort();
    entries
}

fn parse_source_line(line: &str, local_mode: bool) -> Option<SourceEntry> {
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = match line.strip_prefix('!') {
        Some(_) if local_mode => return None,
        Some(rest) => rest,
        None => line,
    };
    let (line, airport) = match line.strip_prefix('*') {
        Some(rest) => (rest, true),
        None => (line, false),
    };

    if !line.starts_with('+') {
        return Some(SourceEntry {
            url: line.to_string(),
            tags: Vec::new(),
            airport,
        });
    }

    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    let url = tokens.pop()?.to_string();
    let tags = tokens
        .into_iter()
        .take_while(|tag| tag.starts_with('+'))
        .map(str::to_string)
        .collect();
    Some(SourceEntry { url, tags, airport })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
# comment

https://b.example.com/sub
!https://ci.example.com/sub
*https://airport.example.com/list
+date +fresh https://a.example.com/%Y%m%d.txt
";

    #[test]
    fn test_parse_source_lines() {
        let entries = parse_source_lines(LIST, false);
        assert_eq!(
            entries,
            vec![
                SourceEntry {
                    url: "https://a.example.com/%Y%m%d.txt".to_string(),
                    tags: vec!["+date".to_string(), "+fresh".to_string()],
                    airport: false,
                },
                SourceEntry {
                    url: "https://airport.example.com/list".to_string(),
                    tags: vec![],
                    airport: true,
                },
                SourceEntry::plain("https://b.example.com/sub"),
                SourceEntry::plain("https://ci.example.com/sub"),
            ]
        );
        assert!(entries[0].is_template());
    }

    #[test]
    fn test_local_mode_skips_bang_lines() {
        let entries = parse_source_lines(LIST, true);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| !e.url.contains("ci.example.com")));
    }
}

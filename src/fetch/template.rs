//! Date-rotating URL templates.
//!
//! A source line such as `+date https://example.com/%Y/%m/%Y%m%d.txt` names
//! a file that is published once a day. When today's file is missing the
//! template is retried with the previous day's date.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;

pub const DATE_TAG: &str = "+date";

/// One attempt of a template: the date to render and how many further
/// attempts are allowed after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateState {
    template: String,
    tags: Vec<String>,
    date: NaiveDate,
    retries_left: u32,
}

impl TemplateState {
    /// `retry_depth` counts attempts in total, this one included.
    pub fn new(template: impl Into<String>, tags: Vec<String>, date: NaiveDate, retry_depth: u32) -> Self {
        TemplateState {
            template: template.into(),
            tags,
            date,
            retries_left: retry_depth.saturating_sub(1),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn retries_left(&self) -> u32 {
        self.retries_left
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Renders the URL of this attempt.
    pub fn url(&self) -> String {
        if !self.has_tag(DATE_TAG) {
            return self.template.clone();
        }
        let items: Vec<Item<'_>> = StrftimeItems::new(&self.template).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return self.template.clone();
        }
        self.date.format_with_items(items.into_iter()).to_string()
    }

    /// The next attempt, one day earlier, if the budget allows one.
    pub fn regenerate(&self) -> Option<TemplateState> {
        if self.retries_left == 0 {
            return None;
        }
        let date = if self.has_tag(DATE_TAG) {
            self.date.pred_opt()?
        } else {
            self.date
        };
        Some(TemplateState {
            template: self.template.clone(),
            tags: self.tags.clone(),
            date,
            retries_left: self.retries_left - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_template_steps_back_once() {
        let state = TemplateState::new(
            "https://example.com/%Y/%m/%Y%m%d.txt",
            vec![DATE_TAG.to_string()],
            date(2024, 3, 1),
            2,
        );
        assert_eq!(state.url(), "https://example.com/2024/03/20240301.txt");

        let next = state.regenerate().unwrap();
        assert_eq!(next.url(), "https://example.com/2024/02/20240229.txt");
        assert!(next.regenerate().is_none());
    }

    #[test]
    fn test_template_without_date_tag_is_literal() {
        let state = TemplateState::new("https://example.com/%Y.txt", vec!["+other".to_string()], date(2024, 1, 1), 2);
        assert_eq!(state.url(), "https://example.com/%Y.txt");
    }

    #[test]
    fn test_invalid_format_falls_back_to_template() {
        let state = TemplateState::new("https://example.com/%Q", vec![DATE_TAG.to_string()], date(2024, 1, 1), 2);
        assert_eq!(state.url(), "https://example.com/%Q");
    }

    #[test]
    fn test_zero_depth_never_regenerates() {
        let state = TemplateState::new("u", vec![DATE_TAG.to_string()], date(2024, 1, 1), 0);
        assert!(state.regenerate().is_none());
    }
}

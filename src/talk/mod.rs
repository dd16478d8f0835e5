//! The next talk of a seminar series and everything derived from it.
//!
//! [`extract::parse`] turns fetched feed bytes into at most one [`Talk`];
//! [`schedule`] holds the announce/reminder rules.

pub mod extract;
pub mod schedule;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub use extract::{parse, ExtractError, PLACEHOLDER_ABSTRACT, PLACEHOLDER_TITLE};

/// A fully-derived upcoming talk.
///
/// Built once per extraction from a feed record and the seminar's config,
/// then only read by message composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Talk {
    pub title: String,
    /// Display name of the seminar as configured.
    pub series: String,
    pub speaker: String,
    pub institution: Option<String>,
    /// Permalink to the talk on the talks site.
    pub link: String,
    pub date: NaiveDate,
    pub room: String,
    pub zoom: Option<String>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Abstract proper, with any conferencing preamble removed.
    pub abstract_text: String,
    /// `abstract_text` wrapped at 80 columns for plain-text messages.
    pub wrapped_abstract: String,
    pub announce_at: NaiveDateTime,
    pub reminder_at: NaiveDateTime,
    /// The feed admin left a placeholder title or abstract.
    pub has_missing_components: bool,
}

impl Talk {
    /// `"(University of X)"`, or empty when the feed gave no institution.
    pub fn institution_suffix(&self) -> String {
        self.institution
            .as_deref()
            .map(|i| format!("({})", i))
            .unwrap_or_default()
    }

    /// Speaker with institution, e.g. `Jane Doe (University of X)`.
    pub fn speaker_line(&self) -> String {
        match self.institution.as_deref() {
            Some(institution) => format!("{} ({})", self.speaker, institution),
            None => self.speaker.clone(),
        }
    }

    /// e.g. `Friday 23 October 2026, 14:00-15:00`
    pub fn long_datetime(&self) -> String {
        format!(
            "{}, {}-{}",
            self.date.format("%A %d %B %Y"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }

    /// e.g. `Friday 23 October`
    pub fn mid_datetime(&self) -> String {
        self.date.format("%A %d %B").to_string()
    }

    /// e.g. `Fri 23 Oct @ 14:00`
    pub fn short_datetime(&self) -> String {
        format!("{} @ {}", self.date.format("%a %d %b"), self.start.format("%H:%M"))
    }

    /// Day the announcement goes out, e.g. `Wednesday 21 October`.
    pub fn announce_day(&self) -> String {
        self.announce_at.format("%A %d %B").to_string()
    }

    /// When the talk starts.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }
}

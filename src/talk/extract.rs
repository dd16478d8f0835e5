//! Feed record to [`Talk`] conversion.
//!
//! The feed is semi-structured free text typed in by list admins, so most of
//! this module is string heuristics: separating the speaker from their
//! institution, cutting conferencing details off the abstract, and slicing
//! dates out of fixed-width timestamps.

use chrono::{NaiveDate, NaiveTime, Weekday};
use thiserror::Error;

use super::{schedule, Talk};
use crate::config::SeminarConfig;
use crate::feed::{parse_feed, FeedDocument, ParseError, RawTalkRecord};
use crate::util::{wrap_text, LINE_WIDTH};

/// Title the talks site shows until the speaker sends one.
pub const PLACEHOLDER_TITLE: &str = "Title to be confirmed";
/// Abstract the talks site shows until the speaker sends one.
pub const PLACEHOLDER_ABSTRACT: &str = "Abstract not available";

/// Separates conferencing preamble from the abstract proper.
const ABSTRACT_MARKER: &str = "*Abstract*\n\n";

/// Length of the ` 14:00:00 +0100` tail after the date.
const TIMESTAMP_TIME_SUFFIX: usize = 15;
/// `HH:MM` ends this many bytes before the end of a timestamp.
const TIME_OF_DAY_END_OFFSET: usize = 9;
const TIME_OF_DAY_LEN: usize = 5;
/// Date after the `Fri, ` weekday prefix.
const DATE_FORMAT: &str = "%d %b %Y";

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The feed could not be parsed at all.
    #[error("Malformed feed: {0}")]
    MalformedFeed(#[from] ParseError),

    /// A talk's timestamp does not have the expected layout. Usually means the
    /// feed format changed, so this is surfaced rather than skipped.
    #[error("Unparseable {field} timestamp: {value:?}")]
    UnparseableTimestamp { field: &'static str, value: String },
}

/// Extracts the next talk of `seminar` from raw feed bytes.
///
/// Returns `Ok(None)` when the feed holds no talk belonging to its own series;
/// that is the normal outcome for a week without a seminar.
///
/// # Errors
///
/// - [`ExtractError::MalformedFeed`] - Not well-formed XML, or no series name
/// - [`ExtractError::UnparseableTimestamp`] - The selected talk's times are unreadable
pub fn parse(bytes: &[u8], seminar: &SeminarConfig) -> Result<Option<Talk>, ExtractError> {
    let document = parse_feed(bytes)?;

    match select_talk(&document) {
        Some(record) => build_talk(record, seminar).map(Some),
        None => {
            tracing::info!(
                seminar = %seminar.name,
                series = %document.series_name,
                entries = document.talks.len(),
                "No upcoming talk in series"
            );
            Ok(None)
        }
    }
}

/// First talk, in feed order, whose series is the feed's own.
///
/// Lists can include talks cross-posted from other lists; those can sit ahead
/// of the series' own talk in the feed and must never be picked.
pub fn select_talk(document: &FeedDocument) -> Option<&RawTalkRecord> {
    document.talks.iter().find(|talk| {
        let own = talk.series == document.series_name;
        if !own {
            tracing::debug!(
                title = %talk.title,
                series = %talk.series,
                "Skipping talk cross-posted from another series"
            );
        }
        own
    })
}

fn build_talk(record: &RawTalkRecord, seminar: &SeminarConfig) -> Result<Talk, ExtractError> {
    let (speaker, institution) = split_speaker(&record.speaker);
    let date = parse_talk_date("start_time", &record.start_time)?;
    let start = parse_time_of_day("start_time", &record.start_time)?;
    let end = parse_time_of_day("end_time", &record.end_time)?;

    let abstract_text = extract_abstract(&record.abstract_text).to_string();
    // Placeholders are matched against the title exactly as the feed has it
    let has_missing_components = is_placeholder(&record.title, &abstract_text);
    let title = record.title.trim().to_string();

    let talk = Talk {
        wrapped_abstract: wrap_text(&abstract_text, LINE_WIDTH),
        announce_at: schedule::announce_datetime(date, &seminar.announce),
        reminder_at: schedule::reminder_datetime(date, &seminar.reminder),
        title,
        series: seminar.name.clone(),
        speaker,
        institution,
        link: record.url.trim().to_string(),
        date,
        room: seminar.room.clone(),
        zoom: seminar.zoom.clone(),
        start,
        end,
        abstract_text,
        has_missing_components,
    };

    tracing::info!(
        seminar = %talk.series,
        title = %talk.title,
        speaker = %talk.speaker,
        date = %talk.date,
        announce_at = %talk.announce_at,
        reminder_at = %talk.reminder_at,
        missing_components = talk.has_missing_components,
        "Found next talk"
    );

    Ok(talk)
}

/// Splits `Jane Doe (University of X)` into speaker and institution.
///
/// The last parenthesised group is taken as the institution, so a nickname or
/// title in earlier parentheses stays with the speaker. Without any `(` the
/// whole text is the speaker.
///
/// # Examples
///
/// ```
/// use talkbot::talk::extract::split_speaker;
///
/// assert_eq!(
///     split_speaker("Jane Doe (Dr.) (University of X)"),
///     ("Jane Doe (Dr.)".to_string(), Some("University of X".to_string()))
/// );
/// assert_eq!(split_speaker(" Jane Doe "), ("Jane Doe".to_string(), None));
/// ```
pub fn split_speaker(text: &str) -> (String, Option<String>) {
    let segments: Vec<&str> = text.split('(').collect();

    match segments.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            let last = last.trim_end();
            let institution = last.strip_suffix(')').unwrap_or(last).trim();
            let speaker = rest.join("(");
            (speaker.trim().to_string(), Some(institution.to_string()))
        }
        _ => (text.trim().to_string(), None),
    }
}

/// Drops everything up to and including the first `*Abstract*` marker.
///
/// Text without the marker is returned unchanged; nothing is trimmed.
pub fn extract_abstract(text: &str) -> &str {
    match text.split_once(ABSTRACT_MARKER) {
        Some((_, abstract_text)) => abstract_text,
        None => text,
    }
}

/// True when the title or abstract is still the talks site's placeholder.
pub fn is_placeholder(title: &str, abstract_text: &str) -> bool {
    title == PLACEHOLDER_TITLE || abstract_text == PLACEHOLDER_ABSTRACT
}

/// Calendar date of a `Fri, 23 Oct 2026 14:00:00 +0100` timestamp.
///
/// The weekday prefix must name a day but is not checked against the date.
fn parse_talk_date(field: &'static str, value: &str) -> Result<NaiveDate, ExtractError> {
    let unparseable = || ExtractError::UnparseableTimestamp {
        field,
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let date_part = trimmed
        .len()
        .checked_sub(TIMESTAMP_TIME_SUFFIX)
        .and_then(|end| trimmed.get(..end))
        .ok_or_else(unparseable)?;

    let (weekday, date) = date_part.split_once(", ").ok_or_else(unparseable)?;
    weekday.parse::<Weekday>().map_err(|_| unparseable())?;

    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| unparseable())
}

/// `HH:MM` time of day of a `Fri, 23 Oct 2026 14:00:00 +0100` timestamp.
fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, ExtractError> {
    let unparseable = || ExtractError::UnparseableTimestamp {
        field,
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let time_part = trimmed
        .len()
        .checked_sub(TIME_OF_DAY_END_OFFSET)
        .and_then(|end| Some(end.checked_sub(TIME_OF_DAY_LEN)?..end))
        .and_then(|range| trimmed.get(range))
        .ok_or_else(unparseable)?;

    NaiveTime::parse_from_str(time_part, "%H:%M").map_err(|_| unparseable())
}

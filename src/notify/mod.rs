//! Announcement and reminder messages for a [`Talk`].
//!
//! talkbot is meant to run hourly from a scheduler. Each run checks whether the
//! current hour is the talk's announce (or reminder) hour and only then
//! composes a message and hands it to a [`Dispatcher`].

mod dispatch;

use chrono::{Duration, NaiveDateTime};
use std::fmt;

use crate::talk::Talk;

pub use dispatch::{DispatchError, Dispatcher, StdoutDispatcher};

/// Which of the two notifications a run is sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// "Upcoming talk", sent some days ahead.
    Announce,
    /// "Starting soon", sent on the day.
    Reminder,
}

impl Mode {
    /// When this notification is scheduled for `talk`.
    pub fn scheduled_for(self, talk: &Talk) -> NaiveDateTime {
        match self {
            Mode::Announce => talk.announce_at,
            Mode::Reminder => talk.reminder_at,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Announce => f.write_str("announcement"),
            Mode::Reminder => f.write_str("reminder"),
        }
    }
}

/// A composed plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// What [`deliver`] did with a talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    /// Current time is outside the scheduled hour.
    NotDue,
    /// Announcement held back because the talk still has placeholders.
    Suppressed,
}

/// Checks whether a notification scheduled for `scheduled` should go out now.
///
/// # Arguments
///
/// * `scheduled` - Announce or reminder time of the talk
/// * `now` - Current local time
///
/// # Returns
///
/// True when `now` falls within the hour starting at `scheduled`, matching an
/// hourly run.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use talkbot::notify::is_due;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
/// let scheduled = day.and_hms_opt(10, 0, 0).unwrap();
/// assert!(is_due(scheduled, day.and_hms_opt(10, 30, 0).unwrap()));
/// assert!(!is_due(scheduled, day.and_hms_opt(11, 0, 0).unwrap()));
/// ```
pub fn is_due(scheduled: NaiveDateTime, now: NaiveDateTime) -> bool {
    now >= scheduled && now < scheduled + Duration::hours(1)
}

/// Composes the plain-text message for `talk`.
///
/// # Arguments
///
/// * `talk` - The talk being announced
/// * `mode` - Announcement or reminder wording
/// * `talks_page` - Link to the full list of the series' talks
///
/// # Returns
///
/// Subject line and body. The body lists title, speaker, time and place,
/// then the wrapped abstract and both links.
pub fn compose(talk: &Talk, mode: Mode, talks_page: &str) -> Message {
    let subject = match mode {
        Mode::Announce => format!(
            "[{}] {} - {}, {}",
            talk.series,
            talk.title,
            talk.speaker,
            talk.mid_datetime()
        ),
        Mode::Reminder => format!(
            "Reminder: [{}] {} - {}",
            talk.series,
            talk.title,
            talk.short_datetime()
        ),
    };

    let mut body = String::new();
    match mode {
        Mode::Announce => body.push_str(&format!(
            "The next {} talk is on {}.\n\n",
            talk.series,
            talk.mid_datetime()
        )),
        Mode::Reminder => body.push_str(&format!(
            "Today's {} talk starts at {}.\n\n",
            talk.series,
            talk.start.format("%H:%M")
        )),
    }

    body.push_str(&format!("Title:   {}\n", talk.title));
    body.push_str(&format!("Speaker: {}\n", talk.speaker_line()));
    body.push_str(&format!("When:    {}\n", talk.long_datetime()));
    body.push_str(&format!("Where:   {}\n", talk.room));
    if let Some(zoom) = talk.zoom.as_deref() {
        body.push_str(&format!("Zoom:    {}\n", zoom));
    }

    body.push_str("\nAbstract:\n\n");
    body.push_str(&talk.wrapped_abstract);
    body.push_str("\n\n");

    body.push_str(&format!("Talk page: {}\n", talk.link));
    body.push_str(&format!("All {} talks: {}\n", talk.series, talks_page));

    Message { subject, body }
}

/// Sends the `mode` notification for `talk` if it is due.
///
/// Announcements for talks with placeholder content are suppressed unless
/// `force` is set; `force` also skips the due check. Reminders go out
/// regardless of placeholders since the talk is happening either way.
pub fn deliver<D: Dispatcher + ?Sized>(
    dispatcher: &mut D,
    talk: &Talk,
    mode: Mode,
    recipients: &[String],
    talks_page: &str,
    now: NaiveDateTime,
    force: bool,
) -> Result<Outcome, DispatchError> {
    let scheduled = mode.scheduled_for(talk);

    if !force && !is_due(scheduled, now) {
        tracing::info!(
            seminar = %talk.series,
            mode = %mode,
            scheduled = %scheduled,
            now = %now,
            "Not due yet"
        );
        return Ok(Outcome::NotDue);
    }

    if mode == Mode::Announce && talk.has_missing_components && !force {
        tracing::warn!(
            seminar = %talk.series,
            title = %talk.title,
            "Talk has placeholder title or abstract, not announcing (use --force to send anyway)"
        );
        return Ok(Outcome::Suppressed);
    }

    let message = compose(talk, mode, talks_page);
    dispatcher.dispatch(recipients, &message)?;
    tracing::info!(
        seminar = %talk.series,
        mode = %mode,
        recipients = recipients.len(),
        "Sent {}",
        mode
    );
    Ok(Outcome::Sent)
}

//! talkbot finds the next talk of a seminar series on talks.bham.ac.uk and
//! works out when to announce it and when to send the day-of reminder.
//!
//! The pipeline is leaf-first: [`feed`] fetches and parses the list's XML,
//! [`talk`] picks the series' own next talk and derives its schedule, and
//! [`notify`] composes and dispatches the messages.

pub mod config;
pub mod feed;
pub mod notify;
pub mod talk;
pub mod util;

use thiserror::Error;

use config::SeminarConfig;
use feed::FetchError;
use talk::{ExtractError, Talk};

/// Anything that stops a seminar's next talk from being found.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Fetches `seminar`'s feed and extracts its next talk.
///
/// `Ok(None)` means there is no talk in the next `window_days` days.
pub async fn find_next_talk(
    client: &reqwest::Client,
    base_url: &str,
    window_days: u32,
    seminar: &SeminarConfig,
) -> Result<Option<Talk>, Error> {
    let url = feed::build_feed_url(base_url, seminar.talks_id, window_days)?;
    let bytes = feed::fetch(client, &url).await?;
    Ok(talk::parse(&bytes, seminar)?)
}

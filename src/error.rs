use std::fmt;

use thiserror::Error;

/// Why a fetch gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Timeout, refused connection, TLS or body read failure.
    NetworkFailure,
    /// The server answered, but never with a 200.
    HttpStatus,
    /// The run was cancelled before the fetch could complete.
    Cancelled,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::NetworkFailure => "network failure",
            FetchErrorKind::HttpStatus => "HTTP status",
            FetchErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Terminal failure of [`crate::fetch::Fetcher`] after its retry budget ran out.
#[derive(Debug, Clone, Error)]
#[error("{kind} for {url} after {attempts} attempt(s): {last_cause}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub attempts: u32,
    /// Last non-200 status seen, if the server answered at all.
    pub status: Option<u16>,
    pub last_cause: String,
}

impl FetchError {
    pub fn cancelled(url: &str, attempts: u32) -> Self {
        FetchError {
            kind: FetchErrorKind::Cancelled,
            url: url.to_string(),
            attempts,
            status: None,
            last_cause: "run cancelled".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("unknown venue `{0}` (see `papercrawl venues`)")]
    UnknownVenue(String),

    #[error("venue {venue} has no track `{track}` (available: {available})")]
    UnknownTrack {
        venue: String,
        track: String,
        available: String,
    },

    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid detail pattern for {venue}: {source}")]
    Pattern {
        venue: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid selector `{selector}` in profile {venue}: {message}")]
    Selector {
        venue: String,
        selector: String,
        message: String,
    },

    #[error("track {track} of {venue} has no listing templates")]
    EmptyTrack { venue: String, track: String },
}

pub type Result<T> = std::result::Result<T, CrawlError>;

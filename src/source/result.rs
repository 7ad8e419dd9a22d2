//! The tagged result every fetch operation returns.

use std::fmt;

use serde::Serialize;

/// Where the data in a [`FetchResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The live statistics API (directly or through the relay).
    Api,
    /// A static snapshot file from the fallback host.
    Fallback,
    /// Neither source produced data.
    Error,
}

impl Source {
    /// `true` only for live API data.  Anything else is shown as cached.
    pub fn is_live(self) -> bool {
        self == Source::Api
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Api => "api",
            Source::Fallback => "fallback",
            Source::Error => "error",
        })
    }
}

/// Outcome of one fetch.
///
/// `data` is present exactly when `source` is [`Source::Api`] or
/// [`Source::Fallback`]; a [`Source::Error`] result always carries an error
/// message and no data.  The fields are private and the constructors below
/// are the only way to build one, so that pairing cannot drift.
///
/// Serializes as `{"data": …, "source": "api"}`, with an `"error"` key only
/// on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult<T> {
    data: Option<T>,
    source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> FetchResult<T> {
    pub fn api(data: T) -> Self {
        Self {
            data: Some(data),
            source: Source::Api,
            error: None,
        }
    }

    pub fn fallback(data: T) -> Self {
        Self {
            data: Some(data),
            source: Source::Fallback,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            data: None,
            source: Source::Error,
            error: Some(error.into()),
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

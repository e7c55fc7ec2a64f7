//! The cache store contract and compartment naming.

use async_trait::async_trait;

use crate::error::CacheError;
use crate::models::Response;

/// Prefix of shell compartments: `static-{release}`.
pub const SHELL_PREFIX: &str = "static-";

/// Prefix of data compartments: `data-{release}-{host}`.
pub const DATA_PREFIX: &str = "data-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare keys with their query strings removed.
    pub ignore_search: bool,
}

impl MatchOptions {
    pub fn ignore_search() -> Self {
        Self {
            ignore_search: true,
        }
    }
}

/// Named, durable key→response compartments.
///
/// Each operation is individually atomic. Concurrent puts to the same key are
/// last-writer-wins; callers never lock around the store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the compartment if it does not exist.
    async fn open(&self, name: &str) -> Result<(), CacheError>;

    /// Names of every existing compartment.
    async fn names(&self) -> Result<Vec<String>, CacheError>;

    /// Look up `key` in compartment `name`. A missing compartment is a miss,
    /// not an error, and is not created.
    async fn match_entry(
        &self,
        name: &str,
        key: &str,
        options: MatchOptions,
    ) -> Result<Option<Response>, CacheError>;

    /// Store `response` under `key`, creating the compartment if needed.
    async fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), CacheError>;

    /// Delete a whole compartment. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// Keys stored in compartment `name` (empty when absent).
    async fn keys(&self, name: &str) -> Result<Vec<String>, CacheError>;
}

/// Which family a compartment belongs to, judged by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompartmentKind {
    Shell,
    Data,
    Other,
}

impl CompartmentKind {
    pub fn of(name: &str) -> Self {
        if name.starts_with(SHELL_PREFIX) {
            CompartmentKind::Shell
        } else if name.starts_with(DATA_PREFIX) {
            CompartmentKind::Data
        } else {
            CompartmentKind::Other
        }
    }
}

pub fn shell_name(release: &str) -> String {
    format!("{}{}", SHELL_PREFIX, release)
}

pub fn data_name(release: &str, host: &str) -> String {
    format!("{}{}-{}", DATA_PREFIX, release, host)
}

/// Prefix shared by every data compartment of one release.
pub fn data_release_prefix(release: &str) -> String {
    format!("{}{}-", DATA_PREFIX, release)
}

fn strip_search(key: &str) -> &str {
    match key.find('?') {
        Some(idx) => &key[..idx],
        None => key,
    }
}

/// Pick the stored key that answers `key` under `options`. An exact match
/// always wins over a query-insensitive one.
pub(crate) fn select_key<'a, I>(stored: I, key: &str, options: MatchOptions) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let wanted = strip_search(key);
    let mut fallback = None;
    for candidate in stored {
        if candidate == key {
            return Some(candidate.as_str());
        }
        if options.ignore_search && fallback.is_none() && strip_search(candidate) == wanted {
            fallback = Some(candidate.as_str());
        }
    }
    fallback
}

/// A handle on one opened compartment.
pub struct Compartment<'a> {
    store: &'a dyn CacheStore,
    name: String,
}

impl<'a> Compartment<'a> {
    /// Open (creating if absent) compartment `name`.
    pub async fn open(store: &'a dyn CacheStore, name: impl Into<String>) -> Result<Self, CacheError> {
        let name = name.into();
        store.open(&name).await?;
        Ok(Self { store, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &str) -> Result<Option<Response>, CacheError> {
        self.store
            .match_entry(&self.name, key, MatchOptions::default())
            .await
    }

    pub async fn get_ignoring_search(&self, key: &str) -> Result<Option<Response>, CacheError> {
        self.store
            .match_entry(&self.name, key, MatchOptions::ignore_search())
            .await
    }

    pub async fn put(&self, key: &str, response: &Response) -> Result<(), CacheError> {
        self.store.put(&self.name, key, response).await
    }

    pub async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.store.keys(&self.name).await
    }
}

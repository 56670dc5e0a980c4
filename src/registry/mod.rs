//! Shared pool of unconsumed invitation codes.
//!
//! The pool is one record addressed by a fixed id. Reads return the whole list
//! and writes replace it in full; there is no conditional update, so concurrent
//! consumers race and the last write wins.

pub mod management;
pub mod memory;
pub mod writer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use management::ManagementClient;
pub use memory::MemoryRegistry;
pub use writer::{RetryPolicy, spawn_update};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid registry URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{url} - {status}, {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("management API token unavailable: {0}")]
    Token(String),
    #[error("malformed invitation record: {0}")]
    MalformedRecord(String),
    #[error("invitation record not found: {0}")]
    NotFound(String),
}

/// Contents of the registry record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationRecord {
    pub invitation_codes: Vec<String>,
}

impl InvitationRecord {
    #[must_use]
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            invitation_codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.invitation_codes.iter().any(|item| item == code)
    }

    /// The list with every exact occurrence of `code` removed, order preserved.
    #[must_use]
    pub fn without(&self, code: &str) -> Vec<String> {
        self.invitation_codes
            .iter()
            .filter(|item| item.as_str() != code)
            .cloned()
            .collect()
    }
}

/// Get-by-id and full-replace update over the invitation record.
#[async_trait]
pub trait InvitationRegistry: Send + Sync {
    /// # Errors
    /// Returns an error if the record cannot be read or lacks `invitation_codes`.
    async fn get(&self, id: &str) -> Result<InvitationRecord, RegistryError>;

    /// # Errors
    /// Returns an error if the record cannot be written.
    async fn update(&self, id: &str, codes: &[String]) -> Result<(), RegistryError>;
}

//! In-process registry, used for local runs and tests.

use super::{InvitationRecord, InvitationRegistry, RegistryError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: RwLock<HashMap<String, InvitationRecord>>,
    fail_reads: AtomicU32,
    fail_writes: AtomicU32,
    reads: AtomicU32,
    writes: AtomicU32,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_record(id: &str, record: InvitationRecord) -> Self {
        let mut registry = Self::new();
        registry
            .records
            .get_mut()
            .insert(id.to_string(), record);
        registry
    }

    pub async fn record(&self, id: &str) -> Option<InvitationRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Fail the next `count` reads.
    pub fn fail_reads(&self, count: u32) {
        self.fail_reads.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` writes.
    pub fn fail_writes(&self, count: u32) {
        self.fail_writes.store(count, Ordering::SeqCst);
    }

    #[must_use]
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(operation: &str) -> RegistryError {
    RegistryError::Status {
        url: format!("memory://{operation}"),
        status: 503,
        message: "injected failure".to_string(),
    }
}

#[async_trait]
impl InvitationRegistry for MemoryRegistry {
    async fn get(&self, id: &str) -> Result<InvitationRecord, RegistryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_reads) {
            return Err(injected("get"));
        }

        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, codes: &[String]) -> Result<(), RegistryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_writes) {
            return Err(injected("update"));
        }

        self.records
            .write()
            .await
            .insert(id.to_string(), InvitationRecord::new(codes.iter().cloned()));
        Ok(())
    }
}

//! Identifier issuance for profiles and entities

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Issues unique identifiers. An issued id is never handed out twice.
pub trait IdentifierService: Send + Sync {
    fn issue(&self) -> Uuid;
}

/// Random v4 identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdentifierService for RandomIds {
    fn issue(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Monotonic identifiers for reproducible runs and tests.
///
/// The n-th issued id is `Uuid::from_u128(start + n)`.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierService for SequentialIds {
    fn issue(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::Relaxed)))
    }
}

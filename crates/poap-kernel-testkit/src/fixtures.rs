//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use poap_kernel::{KernelConfig, PoapKernel, Result};
use poap_kernel_core::{Address, LectureParams, LectureRef};
use poap_kernel_ledger::{LedgerSchema, MemoryLedger};

/// A kernel over an in-memory ledger with a pinned clock.
pub struct KernelFixture {
    pub kernel: PoapKernel<MemoryLedger, MemoryLedger>,
    pub ledger: Arc<MemoryLedger>,
}

impl KernelFixture {
    /// A fixture for `schema` with default settings otherwise.
    pub fn new(schema: LedgerSchema) -> Result<Self> {
        Self::with_config(KernelConfig {
            schema,
            ..KernelConfig::default()
        })
    }

    pub fn with_config(config: KernelConfig) -> Result<Self> {
        let (kernel, ledger) = PoapKernel::in_memory(config)?;
        Ok(Self { kernel, ledger })
    }

    /// Pin the ledger clock.
    pub async fn set_time(&self, now: u64) {
        self.ledger.set_time(now).await;
    }

    /// Create one lecture through the registrar.
    pub async fn create(&self, params: &LectureParams) -> Result<LectureRef> {
        Ok(self.kernel.registrar().create(params).await?.lecture)
    }

    /// Create `n` lectures named `Lecture 0..n`, each open over
    /// `[start, end + i)`.
    pub async fn seed(&self, n: u64, start: u64, end: u64) -> Result<Vec<LectureRef>> {
        let mut created = Vec::new();
        for i in 0..n {
            created.push(self.create(&numbered(i, start, end + i)).await?);
        }
        Ok(created)
    }
}

/// Parameters for the `i`th seeded lecture.
pub fn numbered(i: u64, start: u64, end: u64) -> LectureParams {
    LectureParams::with_window(
        format!("Lecture {}", i),
        start,
        end,
        format!("ipfs://QmLecture{}", i),
    )
}

/// A deterministic attendee address.
pub fn attendee(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xa0;
    bytes[19] = n;
    Address::from_bytes(bytes)
}

/// One fixture per ledger schema.
pub fn all_schema_fixtures() -> Result<Vec<KernelFixture>> {
    [
        LedgerSchema::Sequential,
        LedgerSchema::HashPrimary,
        LedgerSchema::Indexed,
    ]
    .into_iter()
    .map(KernelFixture::new)
    .collect()
}

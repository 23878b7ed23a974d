use async_trait::async_trait;
use time::Date;

/// The slice of an account the quota tracker reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    /// Tier as stored; may hold a value outside the tier table.
    pub tier: Option<String>,
    pub questions_used: u32,
    pub last_use_date: Option<Date>,
}

#[derive(Debug, thiserror::Error)]
#[error("account store unavailable: {0}")]
pub struct StoreError(#[from] pub anyhow::Error);

/// Persistence the tracker depends on. Implementations must bind every
/// value as a parameter.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_usage(&self, email: &str) -> Result<Option<UsageRecord>, StoreError>;

    async fn update_usage(
        &self,
        email: &str,
        questions_used: u32,
        last_use_date: Date,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
pub use memory::MemoryAccountStore;

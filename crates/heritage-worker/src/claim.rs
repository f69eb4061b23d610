//! Claim-before-run guard against two triggers running the same job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use heritage_core::result::AppResult;
use heritage_entity::backup::BackupJobType;

/// Proof of holding the run claim for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimToken {
    /// The claimed job.
    pub job: BackupJobType,
    /// Unique id of this claim.
    pub id: Uuid,
    /// When the claim lapses if never released.
    pub expires_at: DateTime<Utc>,
}

/// Exclusive, expiring right to run a backup job.
///
/// A deployment running several server instances plugs a shared
/// implementation in here; [`LocalRunClaim`] only covers one process.
#[async_trait]
pub trait RunClaim: Send + Sync + std::fmt::Debug + 'static {
    /// Try to claim `job`. `None` while another live claim holds it.
    async fn try_claim(&self, job: BackupJobType, now: DateTime<Utc>)
    -> AppResult<Option<ClaimToken>>;

    /// Give the claim back. Releasing a claim that has since been taken over
    /// by someone else leaves the new holder alone.
    async fn release(&self, token: &ClaimToken) -> AppResult<()>;
}

/// Process-local claims with a lease TTL.
#[derive(Debug, Clone)]
pub struct LocalRunClaim {
    leases: Arc<DashMap<BackupJobType, ClaimToken>>,
    ttl: Duration,
}

impl LocalRunClaim {
    /// Create a claim table whose leases lapse after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            leases: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Create from a TTL in seconds.
    pub fn with_ttl_seconds(seconds: u64) -> Self {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        Self::new(Duration::try_seconds(seconds).unwrap_or(Duration::MAX))
    }

    /// Whether `job` is currently claimed at `now`.
    pub fn is_claimed(&self, job: BackupJobType, now: DateTime<Utc>) -> bool {
        self.leases
            .get(&job)
            .is_some_and(|lease| lease.expires_at > now)
    }
}

#[async_trait]
impl RunClaim for LocalRunClaim {
    async fn try_claim(
        &self,
        job: BackupJobType,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ClaimToken>> {
        let token = ClaimToken {
            job,
            id: Uuid::now_v7(),
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        match self.leases.entry(job) {
            Entry::Occupied(lease) if lease.get().expires_at > now => Ok(None),
            Entry::Occupied(mut lease) => {
                tracing::warn!(job = %job, expired_at = %lease.get().expires_at, "Taking over expired backup claim");
                lease.insert(token.clone());
                Ok(Some(token))
            }
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(Some(token))
            }
        }
    }

    async fn release(&self, token: &ClaimToken) -> AppResult<()> {
        self.leases
            .remove_if(&token.job, |_, lease| lease.id == token.id);
        Ok(())
    }
}

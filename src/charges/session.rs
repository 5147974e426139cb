//! Pending-charge sessions.
//!
//! A charge that comes back from the gateway with a challenge is parked
//! here, keyed by the gateway reference, until the caller completes the
//! follow-up step. Claiming a session checks the owner, the expected
//! phase and the expiry in one shot, so a stale or foreign reference can
//! never settle someone else's charge.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("no pending charge for reference {reference}")]
    NotFound { reference: String },

    /// The reference exists but belongs to another actor, is in a
    /// different phase, or has expired. Reported identically to NotFound
    /// at the HTTP boundary.
    #[error("pending charge {reference} does not match the request")]
    Mismatch { reference: String },
}

/// Which follow-up the gateway asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePhase {
    AwaitingPin,
    AwaitingOtp,
    AwaitingAddress,
}

impl ChallengePhase {
    /// Wire name of the follow-up operation, echoed in challenge replies.
    pub fn as_action(&self) -> &'static str {
        match self {
            ChallengePhase::AwaitingPin => "submit_pin",
            ChallengePhase::AwaitingOtp => "submit_otp",
            ChallengePhase::AwaitingAddress => "submit_address",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingCharge {
    pub reference: String,
    pub actor_id: Uuid,
    pub phase: ChallengePhase,
    pub amount: BigDecimal,
    pub expires_at: DateTime<Utc>,
}

impl PendingCharge {
    pub fn new(
        reference: impl Into<String>,
        actor_id: Uuid,
        phase: ChallengePhase,
        amount: BigDecimal,
        ttl: Duration,
    ) -> Self {
        PendingCharge {
            reference: reference.into(),
            actor_id,
            phase,
            amount,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[async_trait]
pub trait PendingChargeStore: Send + Sync {
    /// Records a pending charge, replacing any prior session under the
    /// same reference (a PIN challenge that escalates to OTP reuses the
    /// gateway reference).
    async fn put(&self, pending: PendingCharge);

    /// Removes and returns the pending charge if the reference exists,
    /// belongs to `actor_id`, sits in `phase` and has not expired.
    async fn claim(
        &self,
        reference: &str,
        actor_id: Uuid,
        phase: ChallengePhase,
    ) -> Result<PendingCharge, SessionError>;

    /// Drops a session unconditionally. Used when a charge reaches a
    /// terminal state while its session is still parked.
    async fn discard(&self, reference: &str);
}

/// In-process session arena. Entries expire lazily: an expired session is
/// removed the next time it is touched.
#[derive(Default)]
pub struct MemoryPendingChargeStore {
    sessions: RwLock<HashMap<String, PendingCharge>>,
}

impl MemoryPendingChargeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingChargeStore for MemoryPendingChargeStore {
    async fn put(&self, pending: PendingCharge) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(pending.reference.clone(), pending);
    }

    async fn claim(
        &self,
        reference: &str,
        actor_id: Uuid,
        phase: ChallengePhase,
    ) -> Result<PendingCharge, SessionError> {
        let mut sessions = self.sessions.write().await;
        let pending = sessions
            .get(reference)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                reference: reference.to_string(),
            })?;

        if pending.is_expired() {
            sessions.remove(reference);
            return Err(SessionError::Mismatch {
                reference: reference.to_string(),
            });
        }
        if pending.actor_id != actor_id || pending.phase != phase {
            return Err(SessionError::Mismatch {
                reference: reference.to_string(),
            });
        }

        sessions.remove(reference);
        Ok(pending)
    }

    async fn discard(&self, reference: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn pending(reference: &str, actor_id: Uuid, phase: ChallengePhase) -> PendingCharge {
        PendingCharge::new(
            reference,
            actor_id,
            phase,
            BigDecimal::from_str("25.00").unwrap(),
            Duration::minutes(15),
        )
    }

    #[tokio::test]
    async fn claim_removes_the_session() {
        let store = MemoryPendingChargeStore::new();
        let actor = Uuid::new_v4();
        store
            .put(pending("ref123", actor, ChallengePhase::AwaitingOtp))
            .await;

        let claimed = store
            .claim("ref123", actor, ChallengePhase::AwaitingOtp)
            .await
            .unwrap();
        assert_eq!(claimed.reference, "ref123");

        let again = store.claim("ref123", actor, ChallengePhase::AwaitingOtp).await;
        assert!(matches!(again, Err(SessionError::NotFound { .. })));
    }

    #[tokio::test]
    async fn claim_rejects_a_foreign_actor() {
        let store = MemoryPendingChargeStore::new();
        let owner = Uuid::new_v4();
        store
            .put(pending("ref123", owner, ChallengePhase::AwaitingOtp))
            .await;

        let intruder = Uuid::new_v4();
        let result = store
            .claim("ref123", intruder, ChallengePhase::AwaitingOtp)
            .await;
        assert!(matches!(result, Err(SessionError::Mismatch { .. })));

        // The owner can still claim it.
        assert!(store
            .claim("ref123", owner, ChallengePhase::AwaitingOtp)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn claim_rejects_the_wrong_phase() {
        let store = MemoryPendingChargeStore::new();
        let actor = Uuid::new_v4();
        store
            .put(pending("ref123", actor, ChallengePhase::AwaitingPin))
            .await;

        let result = store
            .claim("ref123", actor, ChallengePhase::AwaitingOtp)
            .await;
        assert!(matches!(result, Err(SessionError::Mismatch { .. })));
    }

    #[tokio::test]
    async fn expired_sessions_cannot_be_claimed() {
        let store = MemoryPendingChargeStore::new();
        let actor = Uuid::new_v4();
        let mut expired = pending("ref123", actor, ChallengePhase::AwaitingOtp);
        expired.expires_at = Utc::now() - Duration::seconds(1);
        store.put(expired).await;

        let result = store
            .claim("ref123", actor, ChallengePhase::AwaitingOtp)
            .await;
        assert!(matches!(result, Err(SessionError::Mismatch { .. })));

        // Lazy expiry removed the entry entirely.
        let result = store
            .claim("ref123", actor, ChallengePhase::AwaitingOtp)
            .await;
        assert!(matches!(result, Err(SessionError::NotFound { .. })));
    }

    #[tokio::test]
    async fn put_replaces_an_existing_phase() {
        let store = MemoryPendingChargeStore::new();
        let actor = Uuid::new_v4();
        store
            .put(pending("ref123", actor, ChallengePhase::AwaitingPin))
            .await;
        store
            .put(pending("ref123", actor, ChallengePhase::AwaitingOtp))
            .await;

        let claimed = store
            .claim("ref123", actor, ChallengePhase::AwaitingOtp)
            .await
            .unwrap();
        assert_eq!(claimed.phase, ChallengePhase::AwaitingOtp);
    }
}

use crate::gateway::types::GatewayData;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: Uuid },

    #[error("ledger storage failure: {message}")]
    Storage { message: String },
}

/// Immutable transaction-history record, one row per settled charge.
/// Amounts are major currency units; everything taken from the gateway's
/// settlement payload is nullable because the gateway omits fields freely.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub fees: BigDecimal,
    pub status: String,
    pub reference: Option<String>,
    pub gateway_response: String,
    pub paid_at: DateTime<Utc>,
    pub sender: String,
    pub receiver: String,
    pub transaction_type: String,
    pub details: String,
    pub channel: Option<String>,
    pub currency: Option<String>,
    pub ip_address: Option<String>,
    pub transaction_id: Option<String>,
    pub domain: Option<String>,
    pub receipt_number: Option<String>,
    pub message: Option<String>,
    pub metadata: Option<JsonValue>,
    pub log: Option<JsonValue>,
    pub authorization: Option<JsonValue>,
    pub customer: Option<JsonValue>,
    pub plan: Option<JsonValue>,
    pub split: Option<JsonValue>,
    pub order_id: Option<String>,
    pub transaction_date: Option<String>,
    pub plan_object: Option<JsonValue>,
    pub subaccount: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Persistence seam for settlement. One call atomically credits the actor's
/// balance, recomputes their withdraw status and appends the history row.
/// A write failure leaves neither half behind.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn settle(
        &self,
        actor_id: Uuid,
        amount: &BigDecimal,
        settlement: &GatewayData,
    ) -> LedgerResult<LedgerEntry>;
}

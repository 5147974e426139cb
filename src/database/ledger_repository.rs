use crate::database::error::DatabaseError;
use crate::gateway::types::GatewayData;
use crate::ledger::policy::{decide_withdraw_status, WithdrawStatus};
use crate::ledger::store::{LedgerEntry, LedgerError, LedgerResult, LedgerStore};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

/// Postgres-backed settlement. The balance credit, the withdraw-status
/// recomputation and the history insert run in one transaction; any
/// failure rolls all of it back.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ActorRow {
    username: String,
    country_code: String,
    withdraw_status: String,
}

fn storage_error(err: sqlx::Error) -> LedgerError {
    LedgerError::Storage {
        message: DatabaseError::from_sqlx(err).to_string(),
    }
}

fn json_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn settle(
        &self,
        actor_id: Uuid,
        amount: &BigDecimal,
        settlement: &GatewayData,
    ) -> LedgerResult<LedgerEntry> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // Row lock so concurrent settlements for the same actor serialize
        // and each credit lands on the latest balance.
        let actor = sqlx::query_as::<_, ActorRow>(
            "SELECT username, country_code, withdraw_status
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(actor_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        .ok_or(LedgerError::ActorNotFound { actor_id })?;

        let currency = settlement.currency.as_deref().unwrap_or("");
        let withdraw_status = decide_withdraw_status(
            WithdrawStatus::from_flag(&actor.withdraw_status),
            currency,
            &actor.country_code,
        );

        sqlx::query(
            "UPDATE users
             SET wallet_balance = wallet_balance + $2,
                 withdraw_status = $3,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(actor_id)
        .bind(amount)
        .bind(withdraw_status.as_flag())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        let fees = settlement
            .fees
            .map(|f| BigDecimal::from(f) / BigDecimal::from(100))
            .unwrap_or_else(|| BigDecimal::from(0));

        let entry = sqlx::query_as::<_, LedgerEntry>(
            "INSERT INTO transaction_histories
             (user_id, amount, fees, status, reference, gateway_response, paid_at,
              sender, receiver, transaction_type, details, channel, currency,
              ip_address, transaction_id, domain, receipt_number, message, metadata,
              log, \"authorization\", customer, plan, split, order_id, transaction_date,
              plan_object, subaccount)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                     $27, $28)
             RETURNING id, user_id, amount, fees, status, reference, gateway_response,
                       paid_at, sender, receiver, transaction_type, details, channel,
                       currency, ip_address, transaction_id, domain, receipt_number,
                       message, metadata, log, \"authorization\", customer, plan, split,
                       order_id, transaction_date, plan_object, subaccount, created_at",
        )
        .bind(actor_id)
        .bind(amount)
        .bind(&fees)
        .bind("success")
        .bind(settlement.reference.as_deref())
        .bind("successful")
        .bind(Utc::now())
        .bind("Charged from card")
        .bind(&actor.username)
        .bind("cr")
        .bind("Received from card")
        .bind(settlement.channel.as_deref())
        .bind(settlement.currency.as_deref())
        .bind(settlement.ip_address.as_deref())
        .bind(settlement.id.map(|id| id.to_string()))
        .bind(settlement.domain.as_deref())
        .bind(settlement.receipt_number.as_deref())
        .bind(settlement.message.as_deref())
        .bind(None::<JsonValue>)
        .bind(settlement.log.clone())
        .bind(settlement.authorization.clone())
        .bind(settlement.customer.clone())
        .bind(settlement.plan.clone())
        .bind(settlement.split.clone())
        .bind(settlement.order_id.as_ref().map(json_to_string))
        .bind(settlement.transaction_date.as_deref())
        .bind(settlement.plan_object.clone())
        .bind(settlement.subaccount.clone())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        info!(
            %actor_id,
            amount = %amount,
            withdraw_status = withdraw_status.as_flag(),
            "balance credited and history recorded"
        );
        Ok(entry)
    }
}

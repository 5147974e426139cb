//! Card-charge orchestration.
//!
//! Drives the multi-step gateway protocol: an initial charge either settles
//! immediately, fails, or comes back with a challenge (address, PIN, OTP).
//! PIN and address challenges are completed inline from data already in the
//! charge request; an OTP challenge is parked as a pending session and
//! finished by a follow-up call. Settlement always goes through the ledger
//! seam so the balance credit and the history row land atomically.

use crate::charges::session::{ChallengePhase, PendingCharge, PendingChargeStore};
use crate::charges::types::{
    from_minor_units, to_minor_units, ChargeReply, ChargeRequest, OtpRequest, PinRequest,
};
use crate::error::{AppError, AppResult};
use crate::gateway::client::CardGateway;
use crate::gateway::error::GatewayError;
use crate::gateway::types::{CardCharge, ChargeOutcome, GatewayData, OtpSubmission, PinSubmission};
use crate::ledger::store::LedgerStore;
use bigdecimal::BigDecimal;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ChargeServiceConfig {
    /// Billing email attached to every gateway charge.
    pub billing_email: String,
    /// How long a parked challenge stays claimable.
    pub session_ttl: Duration,
}

impl Default for ChargeServiceConfig {
    fn default() -> Self {
        Self {
            billing_email: "billing@modelhouse.app".to_string(),
            session_ttl: Duration::seconds(900),
        }
    }
}

impl ChargeServiceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let billing_email =
            std::env::var("CHARGE_BILLING_EMAIL").unwrap_or(defaults.billing_email);
        let session_ttl = std::env::var("CHARGE_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Duration::seconds)
            .unwrap_or(defaults.session_ttl);
        Self {
            billing_email,
            session_ttl,
        }
    }
}

pub struct ChargeService {
    gateway: Arc<dyn CardGateway>,
    ledger: Arc<dyn LedgerStore>,
    sessions: Arc<dyn PendingChargeStore>,
    config: ChargeServiceConfig,
}

impl ChargeService {
    pub fn new(
        gateway: Arc<dyn CardGateway>,
        ledger: Arc<dyn LedgerStore>,
        sessions: Arc<dyn PendingChargeStore>,
        config: ChargeServiceConfig,
    ) -> Self {
        Self {
            gateway,
            ledger,
            sessions,
            config,
        }
    }

    /// Initial charge. Validation happens before any gateway call, and no
    /// balance is touched unless the gateway reports a settled payment.
    pub async fn charge(&self, actor_id: Uuid, request: ChargeRequest) -> AppResult<ChargeReply> {
        let amount = request.validate()?;
        let minor = to_minor_units(&amount)?;

        let charge = CardCharge {
            email: self.config.billing_email.clone(),
            amount: minor,
            card: request.card_details(),
        };

        info!(%actor_id, amount = %amount, "initiating card charge");
        let envelope = self.gateway.charge_card(&charge).await?;

        match ChargeOutcome::from_envelope(&envelope)? {
            ChargeOutcome::Settled(data) => self.settle(actor_id, &amount, &data).await,
            ChargeOutcome::NeedsPin { reference } => {
                self.complete_pin_inline(actor_id, &request, &amount, reference)
                    .await
            }
            ChargeOutcome::NeedsAddress { reference } => {
                self.complete_address_inline(actor_id, &request, &amount, reference)
                    .await
            }
            ChargeOutcome::NeedsOtp {
                reference,
                display_text,
            } => {
                self.park(actor_id, &reference, ChallengePhase::AwaitingOtp, &amount)
                    .await;
                Ok(ChargeReply::Challenge {
                    msg: display_text,
                    data: reference,
                    kind: "submit_otp",
                })
            }
            ChargeOutcome::Failed { reason } => Err(AppError::GatewayRejected { message: reason }),
        }
    }

    /// PIN follow-up for a charge previously parked in the PIN phase.
    pub async fn submit_pin(&self, actor_id: Uuid, request: PinRequest) -> AppResult<ChargeReply> {
        request.validate()?;
        let pending = self
            .sessions
            .claim(&request.reference, actor_id, ChallengePhase::AwaitingPin)
            .await?;

        let submission = PinSubmission {
            reference: request.reference.clone(),
            pin: request.pin.clone(),
        };
        let envelope = match self.gateway.submit_pin(&submission).await {
            Ok(envelope) => envelope,
            Err(err) => return Err(self.requeue_on_outage(pending, err).await),
        };

        self.resolve_pin_outcome(actor_id, pending, &envelope).await
    }

    /// OTP follow-up. A single gateway attempt: an OTP is consumed by the
    /// gateway on first delivery, so a transport failure re-parks the
    /// session instead of retrying blind.
    pub async fn submit_otp(&self, actor_id: Uuid, request: OtpRequest) -> AppResult<ChargeReply> {
        request.validate()?;
        let pending = self
            .sessions
            .claim(&request.reference, actor_id, ChallengePhase::AwaitingOtp)
            .await?;

        let submission = OtpSubmission {
            reference: request.reference.clone(),
            otp: request.otp.trim().to_string(),
        };
        let envelope = match self.gateway.submit_otp(&submission).await {
            Ok(envelope) => envelope,
            Err(err) => return Err(self.requeue_on_outage(pending, err).await),
        };

        match ChargeOutcome::from_envelope(&envelope)? {
            ChargeOutcome::Settled(data) => self.settle(actor_id, &pending.amount, &data).await,
            ChargeOutcome::Failed { reason } => Err(AppError::GatewayRejected { message: reason }),
            other => {
                warn!(reference = %pending.reference, outcome = ?other, "unexpected outcome after otp");
                Err(AppError::UnexpectedResponse {
                    message: "otp submission answered with another challenge".to_string(),
                })
            }
        }
    }

    /// The charge request already carries the card PIN, so a `send_pin`
    /// challenge is answered immediately rather than bounced to the caller.
    /// The session is parked first: if the PIN call dies in transit the
    /// caller can resume through the PIN endpoint.
    async fn complete_pin_inline(
        &self,
        actor_id: Uuid,
        request: &ChargeRequest,
        amount: &BigDecimal,
        reference: String,
    ) -> AppResult<ChargeReply> {
        let pending = self
            .park(actor_id, &reference, ChallengePhase::AwaitingPin, amount)
            .await;

        let submission = PinSubmission {
            reference: reference.clone(),
            pin: request.card_pin.clone(),
        };
        let envelope = match self.gateway.submit_pin(&submission).await {
            Ok(envelope) => envelope,
            Err(err) => return Err(self.requeue_on_outage(pending, err).await),
        };

        self.sessions.discard(&reference).await;
        self.resolve_pin_outcome(actor_id, pending, &envelope).await
    }

    async fn resolve_pin_outcome(
        &self,
        actor_id: Uuid,
        pending: PendingCharge,
        envelope: &crate::gateway::types::GatewayEnvelope,
    ) -> AppResult<ChargeReply> {
        match ChargeOutcome::from_envelope(envelope)? {
            ChargeOutcome::Settled(data) => self.settle(actor_id, &pending.amount, &data).await,
            ChargeOutcome::NeedsOtp {
                reference,
                display_text,
            } => {
                self.park(
                    actor_id,
                    &reference,
                    ChallengePhase::AwaitingOtp,
                    &pending.amount,
                )
                .await;
                Ok(ChargeReply::Challenge {
                    msg: display_text,
                    data: reference,
                    kind: "submit_otp",
                })
            }
            ChargeOutcome::Failed { reason } => Err(AppError::GatewayRejected { message: reason }),
            other => {
                warn!(reference = %pending.reference, outcome = ?other, "unexpected outcome after pin");
                Err(AppError::UnexpectedResponse {
                    message: "pin submission answered with another challenge".to_string(),
                })
            }
        }
    }

    /// Address verification, answered inline from the billing address in
    /// the charge request. The gateway responds with a redirect URL the
    /// caller completes out of band.
    async fn complete_address_inline(
        &self,
        actor_id: Uuid,
        request: &ChargeRequest,
        amount: &BigDecimal,
        reference: String,
    ) -> AppResult<ChargeReply> {
        let submission = request.address_submission(reference.clone());
        let envelope = self.gateway.submit_address(&submission).await?;

        if let Some(url) = envelope.data.as_ref().and_then(|d| d.url.clone()) {
            info!(%actor_id, reference = %reference, "address verification redirect issued");
            return Ok(ChargeReply::Redirect {
                msg: url,
                kind: "send_address",
            });
        }

        match ChargeOutcome::from_envelope(&envelope)? {
            ChargeOutcome::Settled(data) => self.settle(actor_id, amount, &data).await,
            ChargeOutcome::Failed { reason } => Err(AppError::GatewayRejected { message: reason }),
            _ => Err(AppError::UnexpectedResponse {
                message: "address submission returned no redirect URL".to_string(),
            }),
        }
    }

    async fn park(
        &self,
        actor_id: Uuid,
        reference: &str,
        phase: ChallengePhase,
        amount: &BigDecimal,
    ) -> PendingCharge {
        let pending = PendingCharge::new(
            reference,
            actor_id,
            phase,
            amount.clone(),
            self.config.session_ttl,
        );
        info!(%actor_id, reference, action = phase.as_action(), "charge parked awaiting challenge");
        self.sessions.put(pending.clone()).await;
        pending
    }

    /// A transport outage mid-challenge keeps the session claimable so the
    /// caller can try the follow-up again; any other failure is terminal.
    async fn requeue_on_outage(&self, pending: PendingCharge, err: GatewayError) -> AppError {
        if err.is_transport() || matches!(err, GatewayError::Unavailable { .. }) {
            self.sessions.put(pending).await;
        } else {
            self.sessions.discard(&pending.reference).await;
        }
        err.into()
    }

    /// Credits the actor and appends the history row in one ledger call.
    /// The settlement amount comes from the gateway payload when present
    /// (minor units), falling back to the amount the charge was opened with.
    async fn settle(
        &self,
        actor_id: Uuid,
        requested_amount: &BigDecimal,
        data: &GatewayData,
    ) -> AppResult<ChargeReply> {
        let amount = data
            .amount
            .map(from_minor_units)
            .unwrap_or_else(|| requested_amount.clone());

        let entry = self.ledger.settle(actor_id, &amount, data).await?;
        info!(
            %actor_id,
            amount = %amount,
            reference = entry.reference.as_deref().unwrap_or(""),
            "charge settled"
        );
        Ok(ChargeReply::Settled {
            msg: "Transaction successful".to_string(),
            entry,
        })
    }
}

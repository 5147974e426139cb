pub mod service;
pub mod session;
pub mod types;

pub use service::{ChargeService, ChargeServiceConfig};
pub use session::{ChallengePhase, MemoryPendingChargeStore, PendingCharge, PendingChargeStore};
pub use types::{ChargeReply, ChargeRequest, OtpRequest, PinRequest};

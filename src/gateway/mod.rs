pub mod client;
pub mod error;
pub mod types;

pub use client::{CardGateway, GatewayClient, RetryPolicy};
pub use error::{GatewayError, GatewayResult};
pub use types::{
    AddressSubmission, CardCharge, CardDetails, ChargeOutcome, GatewayData, GatewayEnvelope,
    OtpSubmission, PinSubmission,
};

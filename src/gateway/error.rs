use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport-level failure (connect, timeout, DNS). The only retryable kind.
    #[error("gateway request failed: {message}")]
    Network { message: String },

    /// Transport kept failing until the retry budget ran out.
    #[error("gateway unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    /// Well-formed rejection from the gateway (declined card, bad reference).
    /// Terminal, never retried.
    #[error("gateway rejected the request: {message}")]
    Rejected { message: String },

    /// Response body did not match the shape expected for the current phase.
    #[error("unexpected gateway response: {message}")]
    UnexpectedShape { message: String },
}

impl GatewayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Network { .. })
    }
}

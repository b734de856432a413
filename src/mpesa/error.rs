use thiserror::Error;

pub type MpesaResult<T> = Result<T, MpesaError>;

#[derive(Debug, Clone, Error)]
pub enum MpesaError {
    /// The provider answered and refused the request
    #[error("M-Pesa rejected request: {description}")]
    Rejected {
        code: Option<String>,
        description: String,
    },

    /// Network failure, non-JSON body, or a provider-side 5xx
    #[error("M-Pesa unavailable: {message}")]
    Unavailable { message: String },
}

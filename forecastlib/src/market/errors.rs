use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    // Network, timeout, rate limiting: worth another attempt
    Transient,
    // Invalid or delisted symbol, nothing in range: retrying cannot help
    Permanent,
    // Anything we could not place; retried like a transient error
    Unknown,
}

pub trait Retryable {
    fn class(&self) -> ErrorClass;
}

/// Error raised by a market data provider for a single request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transient provider error: {0}")]
    Transient(String),
    #[error("permanent provider error: {0}")]
    Permanent(String),
    #[error("unclassified provider error: {0}")]
    Unknown(String),
}

impl Retryable for FetchError {
    fn class(&self) -> ErrorClass {
        match self {
            FetchError::Transient(_) => ErrorClass::Transient,
            FetchError::Permanent(_) => ErrorClass::Permanent,
            FetchError::Unknown(_) => ErrorClass::Unknown,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryFailure<E> {
    #[error("gave up after {attempts} attempt(s), error is permanent: {error}")]
    Permanent { attempts: u32, error: E },
    #[error("retries exhausted after {attempts} attempt(s), last error: {error}")]
    Exhausted { attempts: u32, error: E },
}

impl<E> RetryFailure<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryFailure::Permanent { attempts, .. } | RetryFailure::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn error(&self) -> &E {
        match self {
            RetryFailure::Permanent { error, .. } | RetryFailure::Exhausted { error, .. } => error,
        }
    }
}

// Instrument-level outcome of a failed fetch
pub type FetchFailure = RetryFailure<FetchError>;

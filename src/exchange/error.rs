//! Gateway error taxonomy.
//!
//! A `GatewayError` aborts the current cycle of whichever strategy task
//! hit it; the task logs it and retries on the next tick. It never
//! propagates out of the scheduler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection, DNS, or timeout failure below the HTTP layer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The venue answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Api {
        endpoint: &'static str,
        status: u16,
    },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

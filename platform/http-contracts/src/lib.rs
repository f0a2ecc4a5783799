//! # Platform HTTP Contracts
//!
//! The pieces of the HTTP contract that both sides of a service-to-service call
//! have to agree on:
//!
//! - [`correlation`]: the `x-correlation-id` header, generated at the first hop
//!   and propagated unchanged.
//! - [`origin`]: the `x-origin` marker a calling service uses to identify itself.
//! - [`error`]: the JSON error envelope (`code`, `error`, `message`, `correlationId`).
//! - [`outcome`]: [`BestEffort`], the result type for side effects whose failure
//!   must not fail the primary operation.

pub mod correlation;
pub mod error;
pub mod origin;
pub mod outcome;

pub use correlation::{CorrelationId, CORRELATION_ID_HEADER};
#[cfg(feature = "axum")]
pub use correlation::correlation_id_middleware;
pub use error::{ErrorBody, ErrorCode, FieldError};
pub use origin::{OriginPolicy, ORIGIN_HEADER, USER_SERVICE_ORIGIN};
pub use outcome::BestEffort;

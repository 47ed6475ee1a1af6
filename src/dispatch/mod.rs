//! Outbound calls to the remote event-registration API
//!
//! [`HttpDispatcher`] posts `{"id", "name", "email"}` with `Api-Key` and
//! `Api-Secret` headers and maps every outcome, including transport errors,
//! into an [`AttemptOutcome`]. The [`Dispatcher`] trait lets the retry and
//! batch layers run against test doubles.

mod client;
mod secret;
mod types;

pub use client::{DispatchError, Dispatcher, HttpDispatcher};
pub use secret::{Credentials, SecretString, SecretValue, secret_string};
pub use types::{AttemptError, AttemptOutcome, DispatchRequest, UploadContext};

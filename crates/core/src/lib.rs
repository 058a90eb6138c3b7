//! Core domain types, errors, and constants for `vaultlink`.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing every failure mode of reference resolution.
//! - **`types`**: Secret references, remote container/item/field shapes and
//!   the cancellation token passed through every remote call.
//! - **`constants`**: Shared limits, defaults and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};

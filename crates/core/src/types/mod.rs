//! Core domain types for the `vaultlink` workspace.
//!
//! ## Organization
//!
//! - **`cancellation`**: Hierarchical cancellation tokens threaded through remote calls
//! - **`reference`**: Secret reference syntax and parsing
//! - **`remote`**: Container, item and field shapes returned by the secret store

pub mod cancellation;
pub mod reference;
pub mod remote;

// Re-export all public types for convenient access
pub use cancellation::*;
pub use reference::*;
pub use remote::*;

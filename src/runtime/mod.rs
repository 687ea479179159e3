//! # Runtime Module
//!
//! Runtime components for the Cert Backup Operator, including initialization, signal
//! handling, the watch loop, and fatal error handling.

pub mod error_policy;
pub mod initialization;
pub mod shutdown;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use shutdown::*;
pub use watch_loop::*;

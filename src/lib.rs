//! Cert Backup Operator Library
//!
//! Discovers cert-manager `Certificate` resources, and for every ready certificate copies the
//! certificate and private key from its Secret into a local backup directory.
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;

// Re-export CRD types for convenience
pub use crd::*;

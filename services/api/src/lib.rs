//! services/api/src/lib.rs
//!
//! Library half of the `api` service; the binaries in `src/bin` wire it up.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

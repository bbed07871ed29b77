//! Blockline bridge library target.
//!
//! Exposes the control socket and path helpers for integration tests. The
//! binary entry point is in `main.rs`.

pub mod ipc;
pub mod paths;

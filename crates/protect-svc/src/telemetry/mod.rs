//! Structured logging and optional OpenTelemetry trace export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, key material or grant signatures** may appear in any span
//!   attribute or log field. Documents are identified by stored path only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when set.

pub mod init;

pub use init::init_telemetry;

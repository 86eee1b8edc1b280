//! # coolmaster
//!
//! Client for CoolMaster-style HVAC controllers with:
//! - A serial dispatcher sharing one controller session between any number
//!   of callers, one command in flight, responses matched by order
//! - A codec for the controller's line protocol and `ls2` state lines
//! - Translation tables from device codes to power, mode, fan speed and
//!   temperature unit values
//! - A typed per-unit device API
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Device (one per AC unit)                     │
//! │         power / mode / setpoint / fan / full state           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ format (protocol) / decode (translate)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Dispatcher                                 │
//! │          (FIFO queue, single command in flight)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Transport                                 │
//! │        (telnet-style TCP session, prompt framing)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod translate;
pub mod transport;
pub mod dispatcher;
pub mod device;
pub mod sim;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AcError, Result};
pub use config::{Config, UnitConfig};
pub use dispatcher::{DispatchHandle, DispatchStats, Dispatcher, Ticket};
pub use device::{Controller, Device};
pub use translate::{RunningState, TargetMode, TemperatureUnit};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of coolmaster
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Shipdeck
//!
//! Core of a simulated spacecraft control panel. Switches, buttons and dials
//! drive derived subsystem statuses through interlocking activation rules, a
//! probabilistic engine ignition sequence and a cascading fuel model.
//!
//! ## Quick Start
//!
//! ```rust
//! use shipdeck::config::PanelConfig;
//! use shipdeck::panel::ControlPanel;
//! use shipdeck::ports::{FixedSample, ManualClock, NullNotifier};
//! use shipdeck::protocol::Action;
//!
//! let clock = ManualClock::new(0);
//! let mut panel = ControlPanel::new(
//!     PanelConfig::default(),
//!     Box::new(clock.clone()),
//!     Box::new(FixedSample::success()),
//!     Box::new(NullNotifier),
//! );
//!
//! panel.dispatch(Action::toggle("master-toggle"));
//! clock.advance(1_000);
//! panel.advance();
//!
//! for entry in panel.take_new_entries() {
//!     println!("[{}] {}", entry.level.label(), entry.message);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`panel`] - Single-writer action dispatch and periodic process driver
//! - [`controls`] - Control identifiers and the control store
//! - [`derivation`] - Subsystem statuses recomputed from the controls
//! - [`safety`] - Interlock monitor applying corrective writes
//! - [`subsystems`] - Power, comms, engine ignition, reactor and fuel rules
//! - [`scheduler`] - Periodic process timers
//! - [`log`] - Event log ring and message tables
//! - [`emergency`] - EMERGENCY + ABORT reset
//! - [`persistence`] - Snapshot stores
//! - [`runtime`] - Tokio task owning a panel
//! - [`telemetry`] - Status report and calibration grid

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod controls;
pub mod derivation;
pub mod emergency;
pub mod error;
pub mod log;
pub mod panel;
pub mod persistence;
pub mod ports;
pub mod protocol;
pub mod runtime;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod subsystems;
pub mod telemetry;

pub use config::PanelConfig;
pub use controls::{ControlId, ControlStore, Console};
pub use log::{LogEntry, LogLevel};
pub use panel::{ControlPanel, DispatchOutcome, TickOutcome};
pub use protocol::Action;
pub use state::GameState;

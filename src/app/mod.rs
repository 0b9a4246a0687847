//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the decision rules for a verification session:
//! pose assessment, the FSM, remote confirmation hand-off and the alarm
//! cadence.  All interaction with cameras, models and speakers happens
//! through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real devices.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

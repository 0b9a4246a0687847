//! hydrocycle library.
//!
//! Camera-verified water-intake logging, menstrual-cycle prediction and
//! reminder scheduling.  Vision models, the camera and the notification
//! tray sit behind the port traits in [`app::ports`]; everything here is
//! host-testable decision logic plus the adapters the CLI wires up.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod calendar;
pub mod config;
pub mod cycle;
pub mod error;
pub mod events;
pub mod frame;
pub mod fsm;
pub mod notify;
pub mod pose;
pub mod prefs;
pub mod records;
pub mod scheduler;

pub use error::{Error, Result};

//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific flow
//! against real file-backed storage and mock adapters.  Everything runs
//! on the host with no camera or network.

mod mocks;
mod reminder_flow_tests;
mod trace_flow_tests;

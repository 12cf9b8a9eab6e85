//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a full flow against
//! mock adapters. All tests run on the host (x86_64) with no real
//! hardware and no cloud.

mod command_flow_tests;
mod mock_ports;
mod rotation_flow_tests;
mod sync_flow_tests;

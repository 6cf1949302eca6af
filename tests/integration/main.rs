//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the control loop against
//! the mock farm adapter. Everything runs on the host with a manual clock.

mod mock_farm;
mod override_tests;
mod scenario_tests;

//! Unit test modules.

mod config_test;
mod critical_power_test;
mod effort_test;
mod threshold_test;

//! Skycast library
//!
//! Weather dashboard core: tracked locations, current conditions, 7-day
//! forecasts and geolocation, exposed for the CLI and integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod geolocation;
pub mod refresh;
pub mod storage;
pub mod ui;
pub mod units;

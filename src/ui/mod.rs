//! Plain-text rendering for Skycast
//!
//! Each renderer takes a state snapshot (or part of one) and the display
//! units and returns the text the CLI prints.

pub mod forecast;
pub mod location_list;

pub use forecast::render_forecast;
pub use location_list::{render_current_weather, render_location_list, render_search_results};

use crate::app::AppError;

/// One-line rendering of the shared error slot
pub fn render_error(error: &AppError) -> String {
    format!("error [{}]: {}", error.code, error.message)
}

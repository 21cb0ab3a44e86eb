//! Tracked locations, search results and current conditions

use crate::app::WeatherState;
use crate::data::{CitySearchResult, CurrentWeather, Location};
use crate::units::{
    format_distance, format_pressure, format_speed, format_temperature,
    meters_per_second_to_kmh, wind_direction_to_cardinal, UnitSystem,
};

/// Short summary such as "14°C light rain, wind 15 km/h SW"
fn summary_line(weather: &CurrentWeather, units: UnitSystem) -> String {
    format!(
        "{} {}, wind {} {}",
        format_temperature(weather.temp, units),
        weather.condition.description,
        format_speed(meters_per_second_to_kmh(weather.wind_speed), units),
        wind_direction_to_cardinal(weather.wind_deg)
    )
}

fn location_row(location: &Location, weather: Option<&CurrentWeather>, units: UnitSystem) -> String {
    let marker = if location.is_current_location { "*" } else { " " };
    let conditions = weather
        .map(|w| summary_line(w, units))
        .unwrap_or_else(|| "--".to_string());
    format!(
        "{} {:<28} {}  [{}]",
        marker,
        location.display_name(),
        conditions,
        location.id
    )
}

/// Renders tracked locations with their cached conditions
///
/// The current location, when it is not tracked, is listed first.
pub fn render_location_list(state: &WeatherState, units: UnitSystem) -> String {
    let mut lines = Vec::new();

    if let Some(current) = &state.current_location {
        if !state.locations.iter().any(|l| l.id == current.id) {
            lines.push(location_row(current, state.weather_data.get(&current.id), units));
        }
    }
    for location in &state.locations {
        lines.push(location_row(location, state.weather_data.get(&location.id), units));
    }

    if lines.is_empty() {
        return "No tracked locations. Add one with `skycast add <city>`.".to_string();
    }
    lines.join("\n")
}

/// Renders numbered search hits
pub fn render_search_results(results: &[CitySearchResult], units: UnitSystem) -> String {
    if results.is_empty() {
        return "No cities found.".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {:<32} {}",
                i + 1,
                r.location.display_name(),
                summary_line(&r.weather, units)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders full current conditions for one location
pub fn render_current_weather(location: &Location, weather: &CurrentWeather, units: UnitSystem) -> String {
    let wind_kmh = meters_per_second_to_kmh(weather.wind_speed);
    [
        location.display_name(),
        format!(
            "  {} (feels like {}), {}",
            format_temperature(weather.temp, units),
            format_temperature(weather.feels_like, units),
            weather.condition.description
        ),
        format!(
            "  Low {} / High {}",
            format_temperature(weather.temp_min, units),
            format_temperature(weather.temp_max, units)
        ),
        format!(
            "  Wind {} {} | Humidity {}% | Clouds {}%",
            format_speed(wind_kmh, units),
            wind_direction_to_cardinal(weather.wind_deg),
            weather.humidity,
            weather.clouds
        ),
        format!(
            "  Pressure {} | Visibility {}",
            format_pressure(weather.pressure, units),
            format_distance(f64::from(weather.visibility), units)
        ),
    ]
    .join("\n")
}

//! Seven-day forecast table
//!
//! Days padded from the last known day are marked `~` and explained in a
//! footer.

use crate::data::{DailyForecast, Location};
use crate::units::{format_temperature, UnitSystem};

fn precipitation(day: &DailyForecast) -> String {
    let mut parts = Vec::new();
    if let Some(rain) = day.rain {
        parts.push(format!("rain {:.1} mm", rain));
    }
    if let Some(snow) = day.snow {
        parts.push(format!("snow {:.1} mm", snow));
    }
    parts.join(", ")
}

/// Renders a 7-day forecast table
///
/// Synthesized days are marked with `~`.
pub fn render_forecast(location: &Location, days: &[DailyForecast], units: UnitSystem) -> String {
    let mut lines = vec![format!("7-day forecast for {}", location.display_name())];

    if days.is_empty() {
        lines.push("  No forecast data.".to_string());
        return lines.join("\n");
    }

    for day in days {
        let marker = if day.estimated { "~" } else { " " };
        let row = format!(
            "{} {} {}  {:>5} / {:<5} {:>3}%  {:<20} {}",
            marker,
            day.day_of_week,
            day.date.format("%m-%d"),
            format_temperature(day.temp_max, units),
            format_temperature(day.temp_min, units),
            day.pop,
            day.weather.description,
            precipitation(day)
        );
        lines.push(row.trim_end().to_string());
    }

    if days.iter().any(|d| d.estimated) {
        lines.push("  ~ estimated from the last forecast day".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WeatherCondition;
    use chrono::NaiveDate;

    fn day(d: u32, estimated: bool, rain: Option<f64>) -> DailyForecast {
        DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 7, d).unwrap(),
            day_of_week: "Mon".to_string(),
            temp_max: 25.0,
            temp_min: 15.0,
            weather: WeatherCondition {
                id: 500,
                main: "Rain".to_string(),
                description: "light rain".to_string(),
                icon: "10d".to_string(),
            },
            pop: 15,
            rain,
            snow: None,
            estimated,
        }
    }

    #[test]
    fn test_forecast_rows_show_temps_pop_and_rain() {
        let location = Location::new("Paris", "FR", 48.85, 2.35);
        let text = render_forecast(&location, &[day(15, false, Some(0.8))], UnitSystem::Metric);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "7-day forecast for Paris, FR");
        assert!(lines[1].contains("07-15"));
        assert!(lines[1].contains("25°C"));
        assert!(lines[1].contains("15°C"));
        assert!(lines[1].contains("15%"));
        assert!(lines[1].contains("rain 0.8 mm"));
    }

    #[test]
    fn test_estimated_days_are_marked() {
        let location = Location::new("Paris", "FR", 48.85, 2.35);
        let text = render_forecast(
            &location,
            &[day(15, false, None), day(16, true, None)],
            UnitSystem::Metric,
        );

        assert!(text.lines().nth(2).unwrap().starts_with('~'));
        assert!(text.contains("estimated"));
    }

    #[test]
    fn test_empty_forecast() {
        let location = Location::new("Paris", "FR", 48.85, 2.35);
        assert!(render_forecast(&location, &[], UnitSystem::Metric).contains("No forecast data"));
    }
}

//! Daily forecast aggregation
//!
//! Converts the provider's 3-hour forecast feed into exactly seven calendar
//! day summaries. Days are split at local midnight in the supplied time zone.
//!
//! Per-day rules:
//! - `temp_max`/`temp_min` are the max/min of the intervals' own max/min fields
//! - `pop` is the mean interval probability as a whole percentage
//! - `rain`/`snow` are summed accumulations, omitted when nothing fell
//! - `weather` is the condition of the first interval of the day
//!
//! A 5-day feed covers at most six calendar days, so the remaining days are
//! synthesized by repeating the most recent known day with precipitation
//! omitted and `estimated` set.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, TimeZone};
use tracing::{debug, warn};

use super::{DailyForecast, ForecastInterval, WeatherCondition};

/// Number of daily entries produced for any non-empty feed
pub const FORECAST_DAYS: usize = 7;

/// Running totals for one calendar day
#[derive(Debug)]
struct DayAccumulator {
    temp_max: f64,
    temp_min: f64,
    pop_sum: f64,
    count: usize,
    rain: f64,
    snow: f64,
    weather: WeatherCondition,
}

impl DayAccumulator {
    fn start(interval: &ForecastInterval) -> Self {
        Self {
            temp_max: interval.temp_max,
            temp_min: interval.temp_min,
            pop_sum: 0.0,
            count: 0,
            rain: 0.0,
            snow: 0.0,
            weather: interval.condition.clone(),
        }
    }

    fn add(&mut self, interval: &ForecastInterval) {
        self.temp_max = self.temp_max.max(interval.temp_max);
        self.temp_min = self.temp_min.min(interval.temp_min);
        self.pop_sum += interval.pop;
        self.count += 1;
        self.rain += interval.rain_3h.unwrap_or(0.0);
        self.snow += interval.snow_3h.unwrap_or(0.0);
    }

    fn finish(self, date: NaiveDate) -> DailyForecast {
        let (temp_min, temp_max) = if self.temp_min > self.temp_max {
            (self.temp_max, self.temp_min)
        } else {
            (self.temp_min, self.temp_max)
        };

        DailyForecast {
            date,
            day_of_week: short_weekday(date),
            temp_max,
            temp_min,
            weather: self.weather,
            pop: mean_pop_percent(self.pop_sum, self.count),
            rain: precipitation_total(self.rain),
            snow: precipitation_total(self.snow),
            estimated: false,
        }
    }
}

/// Aggregates a forecast feed into seven daily summaries
///
/// # Arguments
/// * `intervals` - Raw forecast samples, in any order
/// * `tz` - Time zone whose midnight splits calendar days
///
/// # Returns
/// Exactly `FORECAST_DAYS` entries on consecutive dates starting at the
/// earliest interval's local date, or an empty vector for an empty feed.
pub fn aggregate_daily<Tz: TimeZone>(
    intervals: &[ForecastInterval],
    tz: &Tz,
) -> Vec<DailyForecast> {
    let mut sorted: Vec<&ForecastInterval> = intervals.iter().collect();
    sorted.sort_by_key(|interval| interval.dt);

    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    for interval in sorted {
        let Some(local) = tz.timestamp_opt(interval.dt, 0).single() else {
            warn!(dt = interval.dt, "Skipping forecast interval with invalid timestamp");
            continue;
        };
        days.entry(local.date_naive())
            .or_insert_with(|| DayAccumulator::start(interval))
            .add(interval);
    }

    let Some(start) = days.keys().next().copied() else {
        return Vec::new();
    };

    let mut result: Vec<DailyForecast> = Vec::with_capacity(FORECAST_DAYS);
    for offset in 0..FORECAST_DAYS {
        let Some(date) = start.checked_add_signed(Duration::days(offset as i64)) else {
            break;
        };
        let day = match days.remove(&date) {
            Some(acc) => acc.finish(date),
            None => match result.last() {
                Some(previous) => synthesize_day(previous, date),
                None => continue,
            },
        };
        result.push(day);
    }

    let estimated = result.iter().filter(|d| d.estimated).count();
    debug!(
        intervals = intervals.len(),
        estimated, "Aggregated forecast into daily summaries"
    );

    result
}

/// Builds a placeholder day by repeating the previous day's values
fn synthesize_day(previous: &DailyForecast, date: NaiveDate) -> DailyForecast {
    DailyForecast {
        date,
        day_of_week: short_weekday(date),
        rain: None,
        snow: None,
        estimated: true,
        ..previous.clone()
    }
}

fn short_weekday(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Mean of the interval fractions as a percentage clamped to 0-100
fn mean_pop_percent(pop_sum: f64, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    let mean = pop_sum / count as f64;
    (mean * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Rounds a summed accumulation to 0.01 mm, dropping it when nothing fell
fn precipitation_total(sum: f64) -> Option<f64> {
    if sum > 0.0 {
        Some((sum * 100.0).round() / 100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime, Utc};

    fn condition(id: u16, main: &str) -> WeatherCondition {
        WeatherCondition {
            id,
            main: main.to_string(),
            description: main.to_lowercase(),
            icon: "01d".to_string(),
        }
    }

    fn epoch(datetime: &str) -> i64 {
        NaiveDateTime::parse_from_str(datetime, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
            .timestamp()
    }

    fn interval(datetime: &str, temp_min: f64, temp_max: f64, pop: f64) -> ForecastInterval {
        ForecastInterval {
            dt: epoch(datetime),
            temp: (temp_min + temp_max) / 2.0,
            temp_min,
            temp_max,
            humidity: 60,
            pressure: 1013.0,
            condition: condition(800, "Clear"),
            wind_speed: 3.0,
            wind_deg: 180,
            pop,
            rain_3h: None,
            snow_3h: None,
        }
    }

    /// A 5-day/3-hour feed starting at the given UTC time
    fn five_day_feed(start: &str) -> Vec<ForecastInterval> {
        let first = epoch(start);
        (0..40)
            .map(|i| {
                let mut item = interval(start, 10.0, 20.0, 0.2);
                item.dt = first + i * 3 * 3600;
                item
            })
            .collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_two_interval_day_summary() {
        let mut first = interval("2024-07-15 00:00", 15.0, 25.0, 0.1);
        first.rain_3h = Some(0.5);
        let mut second = interval("2024-07-15 03:00", 15.0, 25.0, 0.2);
        second.rain_3h = Some(0.3);

        let days = aggregate_daily(&[first, second], &Utc);
        let day1 = &days[0];

        assert_eq!(day1.date, date("2024-07-15"));
        assert!((day1.temp_max - 25.0).abs() < 0.001);
        assert!((day1.temp_min - 15.0).abs() < 0.001);
        assert_eq!(day1.pop, 15);
        assert!((day1.rain.unwrap() - 0.8).abs() < 0.001);
        assert!(day1.snow.is_none());
        assert!(!day1.estimated);
    }

    #[test]
    fn test_always_seven_days_in_increasing_order() {
        for start in ["2024-07-15 00:00", "2024-07-15 12:00", "2024-07-15 21:00"] {
            let days = aggregate_daily(&five_day_feed(start), &Utc);

            assert_eq!(days.len(), FORECAST_DAYS, "feed starting {}", start);
            for pair in days.windows(2) {
                assert_eq!(pair[1].date, pair[0].date + Duration::days(1));
            }
        }
    }

    #[test]
    fn test_single_interval_produces_seven_days() {
        let days = aggregate_daily(&[interval("2024-07-15 09:00", 12.0, 14.0, 0.0)], &Utc);

        assert_eq!(days.len(), FORECAST_DAYS);
        assert!(!days[0].estimated);
        assert!(days[1..].iter().all(|d| d.estimated));
    }

    #[test]
    fn test_empty_feed_yields_no_days() {
        let days = aggregate_daily(&[], &Utc);
        assert!(days.is_empty());
    }

    #[test]
    fn test_padding_repeats_last_known_day() {
        // Midnight start: 40 intervals cover exactly 5 calendar days
        let mut feed = five_day_feed("2024-07-15 00:00");
        for item in feed.iter_mut().filter(|i| i.dt >= epoch("2024-07-19 00:00")) {
            item.temp_max = 30.0;
            item.temp_min = 18.0;
            item.pop = 0.5;
            item.rain_3h = Some(1.0);
            item.condition = condition(500, "Rain");
        }

        let days = aggregate_daily(&feed, &Utc);

        assert_eq!(days.iter().filter(|d| !d.estimated).count(), 5);
        let last_real = &days[4];
        assert_eq!(last_real.date, date("2024-07-19"));
        assert!(last_real.rain.is_some());

        for padded in &days[5..] {
            assert!(padded.estimated);
            assert!((padded.temp_max - 30.0).abs() < 0.001);
            assert!((padded.temp_min - 18.0).abs() < 0.001);
            assert_eq!(padded.pop, 50);
            assert_eq!(padded.weather.main, "Rain");
            assert!(padded.rain.is_none(), "Synthesized days carry no accumulation");
        }
        assert_eq!(days[5].date, date("2024-07-20"));
        assert_eq!(days[6].date, date("2024-07-21"));
        assert_eq!(days[6].day_of_week, "Sun");
    }

    #[test]
    fn test_gap_in_feed_is_filled_from_previous_day() {
        let feed = vec![
            interval("2024-07-15 12:00", 10.0, 20.0, 0.0),
            interval("2024-07-17 12:00", 5.0, 8.0, 1.0),
        ];

        let days = aggregate_daily(&feed, &Utc);

        assert_eq!(days[1].date, date("2024-07-16"));
        assert!(days[1].estimated);
        assert!((days[1].temp_max - 20.0).abs() < 0.001);
        assert_eq!(days[2].date, date("2024-07-17"));
        assert!(!days[2].estimated);
        assert_eq!(days[2].pop, 100);
    }

    #[test]
    fn test_feed_longer_than_seven_days_is_truncated() {
        let feed: Vec<ForecastInterval> = (0..10)
            .map(|d| {
                let mut item = interval("2024-07-15 12:00", 10.0, 20.0, 0.0);
                item.dt += d * 86_400;
                item
            })
            .collect();

        let days = aggregate_daily(&feed, &Utc);

        assert_eq!(days.len(), FORECAST_DAYS);
        assert_eq!(days[6].date, date("2024-07-21"));
        assert!(days.iter().all(|d| !d.estimated));
    }

    #[test]
    fn test_representative_condition_is_first_interval() {
        let mut morning = interval("2024-07-15 06:00", 10.0, 12.0, 0.0);
        morning.condition = condition(701, "Mist");
        let mut noon = interval("2024-07-15 12:00", 14.0, 18.0, 0.0);
        noon.condition = condition(800, "Clear");
        let mut evening = interval("2024-07-15 18:00", 12.0, 16.0, 0.0);
        evening.condition = condition(800, "Clear");

        // Deliberately unordered input
        let days = aggregate_daily(&[noon, evening, morning], &Utc);

        assert_eq!(days[0].weather.main, "Mist");
    }

    #[test]
    fn test_min_max_use_interval_extremes_not_temp() {
        let mut a = interval("2024-07-15 00:00", 11.0, 13.0, 0.0);
        a.temp = 12.0;
        let mut b = interval("2024-07-15 12:00", 19.0, 24.0, 0.0);
        b.temp = 21.0;

        let days = aggregate_daily(&[a, b], &Utc);

        assert!((days[0].temp_min - 11.0).abs() < 0.001);
        assert!((days[0].temp_max - 24.0).abs() < 0.001);
    }

    #[test]
    fn test_temp_min_never_exceeds_temp_max() {
        // Provider glitch with inverted min/max on a single interval
        let glitch = interval("2024-07-15 00:00", 20.0, 10.0, 0.0);

        let days = aggregate_daily(&[glitch], &Utc);

        for day in &days {
            assert!(day.temp_min <= day.temp_max);
        }
        assert!((days[0].temp_min - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_pop_is_clamped_percentage() {
        let days = aggregate_daily(
            &[
                interval("2024-07-15 00:00", 10.0, 12.0, 1.0),
                interval("2024-07-15 03:00", 10.0, 12.0, 1.5),
                interval("2024-07-16 00:00", 10.0, 12.0, 0.0),
                interval("2024-07-17 00:00", 10.0, 12.0, 0.333),
            ],
            &Utc,
        );

        assert_eq!(days[0].pop, 100);
        assert_eq!(days[1].pop, 0);
        assert_eq!(days[2].pop, 33);
        assert!(days.iter().all(|d| d.pop <= 100));
    }

    #[test]
    fn test_snow_summed_and_zero_totals_omitted() {
        let mut a = interval("2024-07-15 00:00", -5.0, -1.0, 0.8);
        a.snow_3h = Some(1.25);
        a.rain_3h = Some(0.0);
        let mut b = interval("2024-07-15 03:00", -6.0, -2.0, 0.9);
        b.snow_3h = Some(2.0);

        let days = aggregate_daily(&[a, b], &Utc);

        assert!((days[0].snow.unwrap() - 3.25).abs() < 0.001);
        assert!(days[0].rain.is_none(), "Zero rain should be omitted");
    }

    #[test]
    fn test_trace_rain_is_kept() {
        let mut drizzle = interval("2024-07-15 00:00", 12.0, 14.0, 0.3);
        drizzle.rain_3h = Some(0.002);

        let days = aggregate_daily(&[drizzle], &Utc);

        assert!(days[0].rain.is_some(), "A non-zero total must not be dropped");
    }

    #[test]
    fn test_last_representable_date_does_not_overflow() {
        let mut last = interval("2024-07-15 00:00", 10.0, 20.0, 0.0);
        last.dt = NaiveDate::MAX
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();

        let days = aggregate_daily(&[last], &Utc);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, NaiveDate::MAX);
    }

    #[test]
    fn test_day_boundary_follows_time_zone() {
        // 23:00 UTC on the 15th is 01:00 on the 16th at UTC+2
        let late = interval("2024-07-15 23:00", 10.0, 12.0, 0.0);
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();

        let utc_days = aggregate_daily(std::slice::from_ref(&late), &Utc);
        let local_days = aggregate_daily(&[late], &offset);

        assert_eq!(utc_days[0].date, date("2024-07-15"));
        assert_eq!(local_days[0].date, date("2024-07-16"));
        assert_eq!(local_days[0].day_of_week, "Tue");
    }
}

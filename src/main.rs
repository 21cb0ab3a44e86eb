//! Skycast - current conditions and 7-day forecasts from the command line
//!
//! Tracks a list of favorite places, fetches their weather from
//! OpenWeatherMap and prints it as plain text.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skycast::app::App;
use skycast::cli::{Cli, Command};
use skycast::config::AppConfig;
use skycast::data::{IpApiClient, NominatimClient, WeatherClient};
use skycast::geolocation::{FixedPositionSource, GeolocationResolver, Position};
use skycast::refresh::RefreshHandle;
use skycast::storage::FileStore;
use skycast::ui;

type SkycastApp = App<WeatherClient, FileStore>;

/// Installs the tracing subscriber; `RUST_LOG` overrides the default `warn`
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Prints and clears the error slot; returns whether an error was set
fn report_error(app: &mut SkycastApp) -> bool {
    match app.state().error.clone() {
        Some(error) => {
            eprintln!("{}", ui::render_error(&error));
            app.clear_error();
            true
        }
        None => false,
    }
}

async fn run_watch(app: &mut SkycastApp, config: &AppConfig) {
    let mut handle = RefreshHandle::spawn(config.refresh.clone());
    handle.request_refresh().await;

    loop {
        tokio::select! {
            msg = handle.receiver.recv() => {
                if msg.is_none() {
                    break;
                }
                app.refresh_all_weather().await;
                println!(
                    "[{}]\n{}\n",
                    chrono::Local::now().format("%H:%M:%S"),
                    ui::render_location_list(app.state(), config.units)
                );
                report_error(app);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    handle.shutdown().await;
}

/// Runs one subcommand against the controller
///
/// # Returns
/// `false` when the command could not do what was asked for a reason that
/// is not recorded in the state (for example a bad `--pick`).
async fn run_command(app: &mut SkycastApp, command: &Command, config: &AppConfig) -> bool {
    let units = config.units;

    match command {
        Command::List => {
            app.refresh_all_weather().await;
            println!("{}", ui::render_location_list(app.state(), units));
        }
        Command::Search { query } => {
            let results = app.search_cities(&query.join(" ")).await;
            println!("{}", ui::render_search_results(&results, units));
        }
        Command::Add { query, pick } => {
            let query = query.join(" ");
            let mut results = app.search_cities(&query).await;
            if app.state().error.is_some() {
                return true;
            }
            if *pick == 0 || *pick > results.len() {
                eprintln!("No result #{} for '{}' ({} found)", pick, query, results.len());
                return false;
            }
            let location = results.swap_remove(pick - 1).location;
            let name = location.display_name();
            if app.add_location(location).await {
                println!("Tracking {}", name);
            }
        }
        Command::Remove { id } => {
            if app.state().find_location(id).is_none() {
                println!("Not tracking {}", id);
            } else {
                app.remove_location(id);
                println!("Removed {}", id);
            }
        }
        Command::Forecast { id } => {
            if let Some(days) = app.get_forecast(id.as_str()).await {
                if let Some(location) = app.state().find_location(id) {
                    println!("{}", ui::render_forecast(location, &days, units));
                }
            }
        }
        Command::Refresh => {
            let outcome = app.refresh_all_weather().await;
            println!("{}", ui::render_location_list(app.state(), units));
            println!(
                "Refreshed {} location(s), {} failed",
                outcome.refreshed.len(),
                outcome.failed.len()
            );
        }
        Command::Locate { lat, lon, save } => {
            let position = (*lat).zip(*lon).map(|(lat, lon)| Position::new(lat, lon));
            let resolver = GeolocationResolver::new(
                FixedPositionSource::new(position),
                NominatimClient::new(),
                IpApiClient::new(),
            );
            if let Some(location) = app.locate_current(&resolver).await {
                if let Some(weather) = app.state().weather_data.get(&location.id) {
                    println!("{}", ui::render_current_weather(&location, weather, units));
                } else {
                    println!("{}", location.display_name());
                }
                if *save && app.add_location(location.clone()).await {
                    println!("Tracking {} [{}]", location.display_name(), location.id);
                }
            }
        }
        Command::Watch { .. } => run_watch(app, config).await,
    }

    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = match AppConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let client = WeatherClient::new(config.api_key.clone().unwrap_or_default())
        .with_base_url(config.weather_base_url.clone());
    let mut app = App::new(client, config.file_store());
    app.hydrate();

    let completed = run_command(&mut app, &cli.command, &config).await;

    if report_error(&mut app) || !completed {
        std::process::exit(1);
    }
    Ok(())
}

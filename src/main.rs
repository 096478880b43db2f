use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vehicle_replay::config::Settings;
use vehicle_replay::input::FileRouteSource;
use vehicle_replay::{Coordinate, Session};

#[derive(Parser, Debug)]
#[command(name = "vehicle-replay")]
#[command(about = "Replay a recorded vehicle route and log every frame")]
struct Args {
    /// Route file (JSON or CSV); defaults to the route in settings
    route: Option<PathBuf>,

    /// Redirect the vehicle to LAT,LNG once the route finishes
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_coordinate, allow_hyphen_values = true)]
    click: Option<Coordinate>,
}

fn parse_coordinate(s: &str) -> Result<Coordinate> {
    let (lat, lng) = s.split_once(',').context("expected LAT,LNG")?;
    let latitude: f64 = lat.trim().parse().with_context(|| format!("bad latitude {}", lat))?;
    let longitude: f64 = lng.trim().parse().with_context(|| format!("bad longitude {}", lng))?;
    Ok(Coordinate::new(latitude, longitude))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = Settings::load();
    if let Some(path) = Settings::config_path() {
        match settings.save_if_missing(&path) {
            Ok(true) => info!("Wrote default settings to {}", path.display()),
            Ok(false) => {}
            Err(e) => warn!("Could not write default settings: {:#}", e),
        }
    }
    let route_path = args.route.unwrap_or_else(|| settings.route_path.clone());

    let session = Session::new(Box::new(FileRouteSource::new(&route_path)), settings.playback_config());
    if session.load().await.is_err() {
        warn!("No route loaded; showing fallback position");
    }

    let mut frames = session.subscribe();
    let mut pending_click = args.click;
    session.play();

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                info!("{}", frame.summary());

                if frame.is_playing || session.resume_pending() {
                    continue;
                }
                match pending_click.take() {
                    Some(target) if session.click_at(target) => {}
                    _ => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}

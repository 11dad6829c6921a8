//! Driver binary.
//!
//! Connects to the relay, then reads commands from stdin:
//! `start`, `stop`, `toggle`, `manual`, `route <id>`, `bus <id>`,
//! `status <s>`, `log`, `help`, `quit`.

use std::sync::Arc;

use anyhow::Context;
use bustrack_client::{ClientConfig, LinkEvent, LinkHandle};
use bustrack_driver::{
    ActivityKind, Command, DriverConfig, FixedSensor, LocationSensor, NoSensor, RouteWalkSensor,
    SamplingOptions, SensorKind, Throttle, Tracker, DEFAULT_POSITION,
};
use bustrack_types::Catalog;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let client_config = ClientConfig::from_env().context("invalid relay settings")?;
    let config = DriverConfig::from_env().context("invalid driver settings")?;
    let catalog = Catalog::demo();
    info!(relay = %client_config.relay_url, "Bustrack driver starting");

    let (link, events) = bustrack_client::spawn(client_config);
    let tracker = Arc::new(Tracker::with_options(
        Arc::new(NoSensor),
        Arc::new(link),
        SamplingOptions::default(),
        Throttle::new(config.min_interval, config.min_distance_m),
    ));
    tracker.set_status(config.status);
    if let Some(route_id) = &config.route_id {
        select_route(&tracker, &catalog, &config, route_id);
    }
    if let Some(bus_id) = &config.bus_id {
        select_bus(&tracker, &catalog, &config, bus_id);
    }

    tokio::spawn(watch_link(Arc::clone(&tracker), events));

    if config.autostart {
        match tracker.start() {
            Ok(()) => println!("tracking started"),
            Err(e) => println!("cannot start: {e}"),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        run_command(&tracker, &catalog, &config, command);
    }

    tracker.stop();
    info!("Bustrack driver exiting");
    Ok(())
}

fn run_command(
    tracker: &Tracker<LinkHandle>,
    catalog: &Catalog,
    config: &DriverConfig,
    command: Command,
) {
    match command {
        Command::Start => match tracker.start() {
            Ok(()) => println!("tracking started"),
            Err(e) => println!("cannot start: {e}"),
        },
        Command::Stop => {
            if tracker.stop() {
                println!("tracking stopped");
            } else {
                println!("not tracking");
            }
        }
        Command::Toggle => match tracker.toggle() {
            Ok(state) => println!("{state:?}"),
            Err(e) => println!("cannot start: {e}"),
        },
        Command::Manual => match tracker.manual_update() {
            Ok(_) => println!("manual update sent"),
            Err(e) => println!("manual update failed: {e}"),
        },
        Command::Route(route_id) => select_route(tracker, catalog, config, &route_id),
        Command::Bus(bus_id) => select_bus(tracker, catalog, config, &bus_id),
        Command::Status(status) => {
            tracker.set_status(status);
            println!("status: {status}");
        }
        Command::Log => {
            for entry in tracker.activity() {
                let marker = match entry.kind {
                    ActivityKind::Info => ' ',
                    ActivityKind::Error => '!',
                };
                println!("{marker} {} {}", entry.at.format("%H:%M:%S"), entry.message);
            }
        }
        Command::Help => print_catalog(catalog),
        Command::Quit => {}
    }
}

fn select_route(tracker: &Tracker<LinkHandle>, catalog: &Catalog, config: &DriverConfig, route_id: &str) {
    let Some(route) = catalog.route(route_id) else {
        println!("unknown route {route_id}");
        return;
    };
    let sensor: Arc<dyn LocationSensor> = match config.sensor {
        SensorKind::Route => Arc::new(
            RouteWalkSensor::new(route.path.clone(), config.sample_interval)
                .with_failure_rate(config.failure_rate),
        ),
        SensorKind::Fixed => Arc::new(FixedSensor::new(
            route.path.first().copied().unwrap_or(DEFAULT_POSITION),
            config.sample_interval,
        )),
    };
    if let Err(e) = tracker.select_route(route_id).and_then(|()| tracker.set_sensor(sensor)) {
        println!("{e}");
        return;
    }
    println!("route: {}", route.name);
}

fn select_bus(tracker: &Tracker<LinkHandle>, catalog: &Catalog, config: &DriverConfig, bus_id: &str) {
    let Some((route, bus)) = catalog.bus(bus_id) else {
        println!("unknown bus {bus_id}");
        return;
    };
    let selected_route = tracker.selection().route_id;
    if selected_route.as_deref() != Some(route.id.as_str()) {
        select_route(tracker, catalog, config, &route.id);
    }
    if config.sensor == SensorKind::Fixed {
        let sensor = Arc::new(FixedSensor::new(bus.current_position, config.sample_interval));
        if let Err(e) = tracker.set_sensor(sensor) {
            println!("{e}");
            return;
        }
    }
    match tracker.select_bus(bus_id) {
        Ok(()) => println!("bus: {}", bus.name),
        Err(e) => println!("{e}"),
    }
}

fn print_catalog(catalog: &Catalog) {
    println!("commands: start stop toggle manual route <id> bus <id> status <s> log quit");
    for route in &catalog.routes {
        println!("{}  {}", route.id, route.name);
        for bus in &route.buses {
            println!("    {}  {}", bus.id, bus.name);
        }
    }
}

async fn watch_link(tracker: Arc<Tracker<LinkHandle>>, mut events: mpsc::Receiver<LinkEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::Connected => tracker.record(ActivityKind::Info, "connected to relay"),
            LinkEvent::Disconnected => {
                tracker.record(ActivityKind::Error, "disconnected from relay");
            }
            LinkEvent::Rejected(message) => {
                warn!(%message, "Relay rejected report");
                tracker.record(ActivityKind::Error, format!("rejected: {message}"));
            }
            LinkEvent::Snapshot(list) => debug!(vehicles = list.len(), "Fleet snapshot"),
        }
    }
}

//! Viewer binary.
//!
//! Opens a receive-only link to the relay and prints the fleet table every
//! time a snapshot arrives or the simulator ticks.

use std::sync::Arc;

use anyhow::Context;
use bustrack_client::{ClientConfig, LinkEvent};
use bustrack_types::Catalog;
use bustrack_viewer::{FleetView, RandomWalk, ViewerConfig};
use tracing::{info, warn};
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
    let config = ViewerConfig::from_env().context("invalid viewer settings")?;
    let catalog = Arc::new(Catalog::demo());
    info!(
        relay = %client_config.relay_url,
        simulate = config.simulate,
        "Bustrack viewer starting"
    );

    let (_link, mut events) = bustrack_client::spawn_receiver(client_config);
    let mut view = FleetView::new(Arc::clone(&catalog));

    let mut walk = config.simulate.then(|| RandomWalk::new(&catalog));
    if let Some(walk) = &walk {
        view.set_simulated(walk.locations());
    }
    let mut ticker = tokio::time::interval(config.sim_interval);
    let filter = config.route_filter.as_deref();

    print!("{}", view.render(filter));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(LinkEvent::Snapshot(list)) => view.apply_snapshot(list),
                    Some(LinkEvent::Connected) => {
                        info!("Connected to relay");
                        continue;
                    }
                    Some(LinkEvent::Disconnected) => {
                        warn!("Disconnected from relay, showing last known fleet");
                        continue;
                    }
                    Some(LinkEvent::Rejected(message)) => {
                        warn!(%message, "Relay error");
                        continue;
                    }
                    None => break,
                }
            }
            _ = ticker.tick(), if walk.is_some() => {
                if let Some(walk) = walk.as_mut() {
                    view.set_simulated(walk.step());
                }
            }
            _ = &mut shutdown => break,
        }
        print!("{}", view.render(filter));
    }

    info!("Bustrack viewer exiting");
    Ok(())
}

// src/main.rs
//! GPS Relay - NMEA position publisher

use clap::Parser;
use gps_relay::{
    config::{RelayConfig, DEFAULT_TCP_PORT},
    display::WatchDisplay,
    relay::list_serial_ports,
    GpsRelay,
};
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(
    name = "gps-relay",
    version,
    about = "Relay NMEA-0183 positions to subscribers"
)]
struct Args {
    /// TCP host serving the NMEA stream
    #[arg(long, conflicts_with = "serial")]
    host: Option<String>,

    /// TCP port of the NMEA stream
    #[arg(long, requires = "host")]
    port: Option<u16>,

    /// Serial device carrying the NMEA stream
    #[arg(long)]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, requires = "serial")]
    baud: Option<u32>,

    /// Position representation to subscribe to (WGS84, DMS.km/h, DMS.mph, DMS.kn)
    #[arg(long = "type", value_name = "TYPE")]
    type_name: Option<String>,

    /// Refresh period in milliseconds
    #[arg(long)]
    period: Option<i64>,

    /// Render a live status screen instead of printing JSON lines
    #[arg(long)]
    watch: bool,

    /// Persist the selected source to the config file
    #[arg(long)]
    save_config: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();

    let args = Args::parse();

    if args.list_ports {
        list_serial_ports()?;
        return Ok(());
    }

    let mut config = RelayConfig::load().unwrap_or_default();
    if let Some(serial) = &args.serial {
        config.update_serial(serial.clone(), args.baud.unwrap_or(9600));
    } else if let Some(host) = &args.host {
        config.update_tcp(host.clone(), args.port.unwrap_or(DEFAULT_TCP_PORT));
    }
    if args.save_config {
        config.save()?;
        info!("configuration saved");
    }

    let relay = GpsRelay::new();
    relay.start(config.source()?).await?;

    if args.watch {
        let display = WatchDisplay::new();
        display.run(&relay).await?;
        return Ok(());
    }

    let period = args.period.or(config.default_period_ms);
    let mut subscription = relay.subscribe(args.type_name.as_deref(), period)?;
    info!(
        "subscribed as {} (id {})",
        subscription.name, subscription.id
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                relay.stop();
                break;
            }
            view = subscription.receiver.recv() => match view {
                Ok(view) => println!("{}", view),
                Err(RecvError::Lagged(n)) => warn!("dropped {} views", n),
                Err(RecvError::Closed) => break,
            }
        }
    }

    Ok(())
}

// src/display.rs
//! Live terminal display of the relay state

use crate::error::{GpsError, Result};
use crate::position::PositionType;
use crate::relay::{GpsRelay, RelayStatus};
use chrono::Utc;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::sleep;

/// Full-screen status view, redrawn once a second.
pub struct WatchDisplay;

impl WatchDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Redraw the relay state until the relay stops or Ctrl+C arrives.
    pub async fn run(&self, relay: &GpsRelay) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap).map_err(|e| GpsError::Io(e))?;

        // Handle Ctrl+C
        let stopper = relay.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.unwrap();
            stopper.stop();
        });

        while relay.is_running() {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))
                .map_err(|e| GpsError::Io(e))?;
            self.render(&mut stdout, relay)?;
            stdout.flush().map_err(|e| GpsError::Io(e))?;
            sleep(Duration::from_secs(1)).await;
        }

        execute!(stdout, Show, EnableLineWrap).map_err(|e| GpsError::Io(e))?;
        println!("\nShutting down...");
        Ok(())
    }

    fn render(&self, stdout: &mut impl Write, relay: &GpsRelay) -> Result<()> {
        let status = relay.status();

        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("              GPS Relay - NMEA position publisher"),
            Print("\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )
        .map_err(|e| GpsError::Io(e))?;

        let connection = if status.connected {
            "connected"
        } else {
            "reconnecting"
        };
        let last_fix = match status.last_fix_at {
            Some(at) => {
                let age = (Utc::now() - at).num_seconds();
                format!("{} ({}s ago)", at.format("%H:%M:%S"), age)
            }
            None => "never".to_string(),
        };
        execute!(
            stdout,
            Print(format!(
                "Stream: {}   Fixes: {}   Subscriptions: {}\n",
                connection, status.fixes, status.subscriptions
            )),
            Print(format!("Last fix: {}\n\n", last_fix))
        )
        .map_err(|e| GpsError::Io(e))?;

        self.render_fix(stdout, &status)?;
        self.render_views(stdout, relay)?;

        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("Press Ctrl+C to exit"),
            Print("\n"),
            ResetColor
        )
        .map_err(|e| GpsError::Io(e))?;

        Ok(())
    }

    fn render_fix(&self, stdout: &mut impl Write, status: &RelayStatus) -> Result<()> {
        execute!(
            stdout,
            SetForegroundColor(Color::Yellow),
            Print("LATEST FIX:\n"),
            ResetColor
        )
        .map_err(|e| GpsError::Io(e))?;

        if status.latest.is_empty() {
            execute!(stdout, Print("  waiting for data\n\n")).map_err(|e| GpsError::Io(e))?;
            return Ok(());
        }

        let fix = &status.latest;
        execute!(
            stdout,
            Print(format!("  Time:      {}\n", format_time(fix.time_ms))),
            Print(format!("  Latitude:  {}\n", format_value(fix.latitude, "°"))),
            Print(format!("  Longitude: {}\n", format_value(fix.longitude, "°"))),
            Print(format!("  Altitude:  {}\n", format_value(fix.altitude, " m"))),
            Print(format!("  Speed:     {}\n", format_value(fix.speed, " m/s"))),
            Print(format!("  Track:     {}\n\n", format_value(fix.track, "°")))
        )
        .map_err(|e| GpsError::Io(e))?;

        Ok(())
    }

    fn render_views(&self, stdout: &mut impl Write, relay: &GpsRelay) -> Result<()> {
        execute!(
            stdout,
            SetForegroundColor(Color::Cyan),
            Print("PUBLISHED VIEWS:\n"),
            ResetColor
        )
        .map_err(|e| GpsError::Io(e))?;

        for ty in PositionType::ALL {
            let view = relay.get(Some(ty.name()))?;
            execute!(stdout, Print(format!("  {:<9} {}\n", ty.name(), view)))
                .map_err(|e| GpsError::Io(e))?;
        }
        execute!(stdout, Print("\n")).map_err(|e| GpsError::Io(e))?;

        Ok(())
    }
}

impl Default for WatchDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn format_time(time_ms: Option<u32>) -> String {
    match time_ms {
        Some(ms) => format!(
            "{:02}:{:02}:{:02}.{:03} UTC",
            ms / 3_600_000,
            ms / 60_000 % 60,
            ms / 1000 % 60,
            ms % 1000
        ),
        None => "-".to_string(),
    }
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.4}{}", v, unit),
        None => "-".to_string(),
    }
}

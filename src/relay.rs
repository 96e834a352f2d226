// src/relay.rs
//! Stream ingestion, the shared relay core and the public verbs

use crate::error::{GpsError, Result};
use crate::nmea::{decode_sentence, SentenceFramer};
use crate::position::{Fix, FixBuffer, PositionType, ViewCache};
use crate::registry::{Registry, Subscription, DEFAULT_PERIOD_MS};
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use serde_json::Value;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_serial::SerialPortBuilderExt;

/// Where the NMEA byte stream comes from.
#[derive(Debug, Clone)]
pub enum StreamSource {
    Tcp { host: String, port: u16 },
    Serial { port: String, baudrate: u32 },
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSource::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            StreamSource::Serial { port, baudrate } => write!(f, "{} @ {} baud", port, baudrate),
        }
    }
}

/// Snapshot of the relay state for status displays.
#[derive(Debug, Clone)]
pub struct RelayStatus {
    pub connected: bool,
    /// Fixes accepted since startup.
    pub fixes: u64,
    /// Wall-clock time the newest fix arrived.
    pub last_fix_at: Option<DateTime<Utc>>,
    /// Live subscription count.
    pub subscriptions: usize,
    pub latest: Fix,
}

/// Everything the ingestion task and the verbs share: the fix history, the
/// view cache and the subscription registry, behind one lock so a read
/// cycle (ingest plus dispatch) never interleaves with a verb.
#[derive(Debug, Default)]
pub struct RelayCore {
    buffer: FixBuffer,
    cache: ViewCache,
    registry: Registry,
    /// Buffer generation the dispatcher has caught up with.
    dispatched: u64,
    connected: bool,
    last_fix_at: Option<DateTime<Utc>>,
}

impl RelayCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one sentence body and store the fix it carries, if any.
    pub fn ingest_sentence(&mut self, body: &str) {
        match decode_sentence(body) {
            Some(fix) => {
                trace!("fix accepted: {:?}", fix);
                self.buffer.push(fix);
                self.last_fix_at = Some(Utc::now());
            }
            None => trace!("sentence ignored: {}", body),
        }
    }

    /// Run one dispatch pass, unless no fix arrived since the last one.
    pub fn tick(&mut self, now: Instant) {
        if self.dispatched == self.buffer.generation() {
            return;
        }
        self.dispatched = self.buffer.generation();
        let Self {
            buffer,
            cache,
            registry,
            ..
        } = self;
        registry.dispatch(now, |ty| cache.view(ty, buffer));
    }

    /// Current view for the given type. The dispatch watermark is left
    /// untouched, so polling never swallows a pending push.
    pub fn position(&mut self, ty: PositionType) -> Arc<Value> {
        let Self { buffer, cache, .. } = self;
        cache.view(ty, buffer)
    }

    pub fn subscribe(&mut self, ty: PositionType, period_ms: i64) -> Result<Subscription> {
        self.registry.subscribe(ty, period_ms)
    }

    pub fn unsubscribe(&mut self, id: i32) -> Result<()> {
        self.registry.unsubscribe(id)
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            connected: self.connected,
            fixes: self.buffer.generation(),
            last_fix_at: self.last_fix_at,
            subscriptions: self.registry.len(),
            latest: *self.buffer.latest(),
        }
    }
}

/// Handle to a running relay. Clones share the core and the running flag.
#[derive(Debug, Clone)]
pub struct GpsRelay {
    core: Arc<Mutex<RelayCore>>,
    running: Arc<AtomicBool>,
}

impl GpsRelay {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Mutex::new(RelayCore::new())),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Connect to the source and spawn the ingestion task.
    ///
    /// The first connect happens inline so a dead source surfaces here;
    /// after that the task reconnects on its own with growing delays.
    pub async fn start(&self, source: StreamSource) -> Result<()> {
        info!("connecting to {}", source);
        let stream = connect(&source).await?;
        info!("connected to {}", source);
        self.core.lock().unwrap().connected = true;

        let core = Arc::clone(&self.core);
        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            let mut stream = Some(stream);
            let mut attempt: u32 = 0;
            while running.load(Ordering::Relaxed) {
                match stream.take() {
                    Some(mut s) => {
                        match read_stream(&mut s, &core, &running).await {
                            Ok(()) => info!("{}: stream ended", source),
                            Err(e) => warn!("{}: read failed: {}", source, e),
                        }
                        core.lock().unwrap().connected = false;
                    }
                    None => {
                        let delay = retry_delay(attempt);
                        attempt += 1;
                        debug!("retrying {} in {:?}", source, delay);
                        sleep(delay).await;
                        match connect(&source).await {
                            Ok(s) => {
                                info!("reconnected to {}", source);
                                core.lock().unwrap().connected = true;
                                stream = Some(s);
                                attempt = 0;
                            }
                            Err(e) => error!("reconnect to {} failed: {}", source, e),
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the relay; the ingestion task winds down after its current
    /// read.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Last known position in the requested representation.
    pub fn get(&self, type_name: Option<&str>) -> Result<Arc<Value>> {
        let ty = resolve_type(type_name)?;
        Ok(self.core.lock().unwrap().position(ty))
    }

    /// Subscribe to periodic position pushes.
    pub fn subscribe(
        &self,
        type_name: Option<&str>,
        period_ms: Option<i64>,
    ) -> Result<Subscription> {
        let ty = resolve_type(type_name)?;
        self.core
            .lock()
            .unwrap()
            .subscribe(ty, period_ms.unwrap_or(DEFAULT_PERIOD_MS))
    }

    /// Cancel a subscription by id.
    pub fn unsubscribe(&self, id: Option<i32>) -> Result<()> {
        let id = id.ok_or(GpsError::MissingId)?;
        self.core.lock().unwrap().unsubscribe(id)
    }

    /// Snapshot of the relay state.
    pub fn status(&self) -> RelayStatus {
        self.core.lock().unwrap().status()
    }
}

impl Default for GpsRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an optional type name, defaulting to WGS84.
fn resolve_type(name: Option<&str>) -> Result<PositionType> {
    match name {
        None => Ok(PositionType::default()),
        Some(name) => {
            PositionType::from_name(name).ok_or_else(|| GpsError::UnknownType(name.to_string()))
        }
    }
}

/// Open the byte stream for a source.
async fn connect(source: &StreamSource) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
    match source {
        StreamSource::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(|e| GpsError::Connection(format!("{}:{}: {}", host, port, e)))?;
            Ok(Box::new(stream))
        }
        StreamSource::Serial { port, baudrate } => {
            let stream = tokio_serial::new(port, *baudrate)
                .timeout(Duration::from_millis(1000))
                .open_native_async()
                .map_err(|e| GpsError::Connection(format!("{}: {}", port, e)))?;
            Ok(Box::new(stream))
        }
    }
}

/// Pump one connected stream into the core until it ends.
///
/// Each read cycle frames the fresh bytes, decodes the sentences they
/// closed and runs a dispatch pass, all under a single core lock.
async fn read_stream<R>(
    stream: &mut R,
    core: &Arc<Mutex<RelayCore>>,
    running: &Arc<AtomicBool>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut framer = SentenceFramer::new();
    let mut chunk = [0u8; 256];
    while running.load(Ordering::Relaxed) {
        let n = match stream.read(&mut chunk).await {
            Ok(0) => return Ok(()), // EOF
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let bodies = framer.push(&chunk[..n]);
        if bodies.is_empty() {
            continue;
        }
        let mut core = core.lock().unwrap();
        for body in &bodies {
            core.ingest_sentence(body);
        }
        core.tick(Instant::now());
    }
    Ok(())
}

/// Delay before reconnect attempt `attempt`: 1s, 2s, 4s... capped at 30s.
fn retry_delay(attempt: u32) -> Duration {
    let shift = attempt.min(5);
    Duration::from_secs((1u64 << shift).min(30))
}

/// List the serial ports visible on this machine.
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| GpsError::Other(format!("Failed to list serial ports: {}", e)))?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const GGA_LINE: &[u8] =
        b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    const GGA_BODY: &str = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
    const RMC_BODY: &str = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W,A";

    #[tokio::test]
    async fn test_read_stream_feeds_core_and_subscribers() {
        let (mut tx, mut rx) = tokio::io::duplex(1024);
        let core = Arc::new(Mutex::new(RelayCore::new()));
        let running = Arc::new(AtomicBool::new(true));

        let mut sub = core
            .lock()
            .unwrap()
            .subscribe(PositionType::Wgs84, 100)
            .unwrap();

        let reader = {
            let core = Arc::clone(&core);
            let running = Arc::clone(&running);
            tokio::spawn(async move { read_stream(&mut rx, &core, &running).await })
        };

        tx.write_all(GGA_LINE).await.unwrap();
        drop(tx); // EOF ends the reader
        reader.await.unwrap().unwrap();

        assert_eq!(core.lock().unwrap().status().fixes, 1);
        let view = sub.receiver.recv().await.unwrap();
        assert_eq!(view["type"], "WGS84");
        assert!((view["latitude"].as_f64().unwrap() - 48.1173).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_chunked_stream_still_parses() {
        let (mut tx, mut rx) = tokio::io::duplex(16);
        let core = Arc::new(Mutex::new(RelayCore::new()));
        let running = Arc::new(AtomicBool::new(true));

        let reader = {
            let core = Arc::clone(&core);
            let running = Arc::clone(&running);
            tokio::spawn(async move { read_stream(&mut rx, &core, &running).await })
        };

        for piece in GGA_LINE.chunks(7) {
            tx.write_all(piece).await.unwrap();
        }
        drop(tx);
        reader.await.unwrap().unwrap();

        assert_eq!(core.lock().unwrap().status().fixes, 1);
    }

    #[test]
    fn test_polling_does_not_gate_dispatch() {
        let mut core = RelayCore::new();
        let mut sub = core.subscribe(PositionType::Wgs84, 100).unwrap();
        core.ingest_sentence(GGA_BODY);

        // a poll between ingest and dispatch must not swallow the push
        let polled = core.position(PositionType::Wgs84);
        assert_eq!(polled["type"], "WGS84");

        core.tick(Instant::now());
        let pushed = sub.receiver.try_recv().unwrap();
        assert!(Arc::ptr_eq(&polled, &pushed));
    }

    #[test]
    fn test_tick_without_a_new_fix_is_silent() {
        let mut core = RelayCore::new();
        let mut sub = core.subscribe(PositionType::Wgs84, 100).unwrap();

        core.tick(Instant::now());
        assert!(sub.receiver.try_recv().is_err());

        core.ingest_sentence(RMC_BODY);
        core.tick(Instant::now());
        assert!(sub.receiver.try_recv().is_ok());

        // no fresh fix, no second push, however late the tick
        core.tick(Instant::now() + Duration::from_millis(500));
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn test_rejected_sentences_leave_no_trace() {
        let mut core = RelayCore::new();
        core.ingest_sentence("GPGGA,123519,4807.038,N,01131.000,E,0,08,0.9,545.4,M,46.9,M,,");
        core.ingest_sentence("GPVTG,084.4,T,,M,022.4,N,041.5,K,A");
        core.ingest_sentence("garbage");

        let status = core.status();
        assert_eq!(status.fixes, 0);
        assert!(status.last_fix_at.is_none());
        assert!(status.latest.is_empty());
    }

    #[test]
    fn test_verbs_validate_their_arguments() {
        let relay = GpsRelay::new();
        assert!(matches!(
            relay.get(Some("nonsense")),
            Err(GpsError::UnknownType(_))
        ));
        assert!(relay.get(None).is_ok());
        assert!(relay.get(Some("DMS.kn")).is_ok());
        assert!(matches!(relay.unsubscribe(None), Err(GpsError::MissingId)));
        assert!(matches!(
            relay.unsubscribe(Some(99)),
            Err(GpsError::BadId(99))
        ));

        let sub = relay.subscribe(None, None).unwrap();
        assert_eq!(sub.name, "WGS84@2000ms");
        relay.unsubscribe(Some(sub.id)).unwrap();
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        assert_eq!(retry_delay(0), Duration::from_secs(1));
        assert_eq!(retry_delay(1), Duration::from_secs(2));
        assert_eq!(retry_delay(2), Duration::from_secs(4));
        assert_eq!(retry_delay(5), Duration::from_secs(30));
        assert_eq!(retry_delay(20), Duration::from_secs(30));
    }
}

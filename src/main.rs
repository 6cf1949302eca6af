//! Greenhouse controller — host entry point.
//!
//! ```text
//! greenhouse [config.json]
//! ```
//!
//! Wires in-memory stores, an MQTT transport and the system clock around
//! the [`ControlLoop`], then polls the scheduler once a second. With
//! `mqtt_host` set, commands go to the broker and sensor readings arrive
//! from it; otherwise commands are only logged.
//!
//! Stdin is the request layer (see [`greenhouse::adapters::console`]).
//! Without a broker the process exits once stdin closes and queued
//! requests have run.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use greenhouse::adapters::config_file::JsonConfigFile;
use greenhouse::adapters::console::{self, ConsoleError, ConsoleRequest};
use greenhouse::adapters::farm::FarmIo;
use greenhouse::adapters::kv_store::KvStore;
use greenhouse::adapters::log_sink::LogEventSink;
use greenhouse::adapters::memory::{CropProfiles, LatestReading};
use greenhouse::adapters::mqtt::{
    BrokerTransport, LogTransport, MessageTransport, MqttCommandPublisher, QoS,
};
use greenhouse::adapters::sensor_feed::SensorFeed;
use greenhouse::adapters::time::SystemClock;
use greenhouse::app::ports::{Clock, ConfigPort, Job, PublishError, SchedulerDelegate};
use greenhouse::app::service::{ControlHandle, ControlLoop};
use greenhouse::config::ControlConfig;
use greenhouse::scheduler::Scheduler;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

// ── Scheduler delegate ────────────────────────────────────────
//
// The scheduler only reports what fired; jobs run after the poll so the
// loop can drain queued requests first.

#[derive(Default)]
struct DueJobs(Vec<Job>);

impl SchedulerDelegate for DueJobs {
    fn on_schedule_fired(&mut self, label: &str, job: Job) {
        log::debug!("Schedule '{}' fired", label);
        self.0.push(job);
    }
}

// ── Command uplink ────────────────────────────────────────────

enum Uplink {
    Broker(BrokerTransport),
    Log(LogTransport),
}

impl MessageTransport for Uplink {
    fn send(&mut self, topic: &str, payload: &str, qos: QoS) -> Result<(), PublishError> {
        match self {
            Self::Broker(t) => t.send(topic, payload, qos),
            Self::Log(t) => t.send(topic, payload, qos),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Broker(t) => t.is_connected(),
            Self::Log(t) => t.is_connected(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    info!(
        "Greenhouse controller starting (device '{}', UTC{:+}m)",
        config.device_id, config.utc_offset_minutes
    );

    let clock = Arc::new(SystemClock::new());
    let latest = LatestReading::new();
    let profiles = CropProfiles::new();
    let feed = SensorFeed::new(latest.clone(), config.utc_offset_minutes);

    let uplink = if config.broker_enabled() {
        let (transport, session) = BrokerTransport::connect(&config);
        let broker_feed = SensorFeed::new(latest.clone(), config.utc_offset_minutes);
        thread::Builder::new()
            .name("mqtt".into())
            .spawn(move || {
                session.run(|payload| {
                    if let Err(e) = broker_feed.ingest(payload) {
                        warn!("MQTT: sensor payload rejected: {}", e);
                    }
                });
            })
            .context("spawning MQTT session")?;
        Uplink::Broker(transport)
    } else {
        info!("No broker configured, commands go to the log only");
        Uplink::Log(LogTransport)
    };
    let serve_forever = config.broker_enabled();

    let mut scheduler = Scheduler::from_config(&config);
    let mut control = ControlLoop::new(config, clock.clone())
        .map_err(greenhouse::Error::from)
        .context("invalid control configuration")?;
    let mut io = FarmIo::new(
        latest,
        profiles.clone(),
        KvStore::new(),
        MqttCommandPublisher::new(uplink),
    );
    let mut sink = LogEventSink::new();

    let handle = control.handle();
    let reader = thread::Builder::new()
        .name("console".into())
        .spawn(move || read_requests(&feed, &profiles, &handle))
        .context("spawning console reader")?;

    loop {
        let mut due = DueJobs::default();
        scheduler.poll(clock.now_ms(), &mut due);

        control.drain_commands(&mut io, &mut sink);
        for job in due.0 {
            control.run_job(job, &mut io, &mut sink);
        }

        if reader.is_finished() && !serve_forever {
            control.drain_commands(&mut io, &mut sink);
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    info!(
        "Stdin closed after {} ticks and {} commands, shutting down",
        control.tick_count(),
        io.publisher.sent()
    );
    Ok(())
}

fn load_config() -> Result<ControlConfig> {
    match std::env::args().nth(1) {
        Some(path) => JsonConfigFile::new(&path)
            .load()
            .map_err(greenhouse::Error::from)
            .with_context(|| format!("loading config from {}", path)),
        None => {
            let config = ControlConfig::default();
            config
                .validate()
                .map_err(greenhouse::Error::from)
                .context("default configuration")?;
            Ok(config)
        }
    }
}

/// Console thread: one request per stdin line until EOF.
fn read_requests(feed: &SensorFeed, profiles: &CropProfiles, handle: &ControlHandle) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Console: read failed: {}", e);
                break;
            }
        };
        let request = match console::parse_line(&line) {
            Ok(request) => request,
            Err(ConsoleError::Empty) => continue,
            Err(e) => {
                warn!("Console: {}", e);
                continue;
            }
        };
        if let Err(e) = dispatch(request, feed, profiles, handle) {
            warn!("Console: {:#}", e);
        }
    }
}

fn dispatch(
    request: ConsoleRequest,
    feed: &SensorFeed,
    profiles: &CropProfiles,
    handle: &ControlHandle,
) -> Result<()> {
    match request {
        ConsoleRequest::SensorPayload(json) => {
            feed.ingest(&json).context("sensor payload rejected")?;
        }
        ConsoleRequest::Profile(profile) => profiles.set_active(profile),
        ConsoleRequest::Manual { module, switch } => {
            let until = handle.manual_control(module, switch)?;
            info!("Console: {} {} under manual control until {}", module, switch, until);
        }
        ConsoleRequest::Release(module) => {
            handle.disable_manual_override(module);
        }
        ConsoleRequest::Photo => handle.request_photo_capture()?,
        ConsoleRequest::ResetLight => handle.reset_accumulated_light()?,
    }
    Ok(())
}

// # nxsyncd - Nexus reconciliation agent
//
// A thin integration layer: all reconciliation logic lives in nxsync-core.
//
// The nxsyncd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Loading the manifest and building its device through the registry
// 3. Running one reconciliation pass, or one per interval until signalled
//
// ## Configuration
//
// - `NXSYNC_MANIFEST`: Path to the JSON manifest (required)
// - `NXSYNC_DEVICE_PATH`: Use a file-backed device at this path instead of
//   the manifest's device
// - `NXSYNC_NOOP`: `true` to report changes without writing them
// - `NXSYNC_RUN_INTERVAL`: Seconds between passes; `0` runs once and exits
// - `NXSYNC_LOG_LEVEL`: trace, debug, info, warn or error
//
// ## Example
//
// ```bash
// export NXSYNC_MANIFEST=/etc/nxsync/manifest.json
// export NXSYNC_DEVICE_PATH=/var/lib/nxsync/device.json
// export NXSYNC_RUN_INTERVAL=1800
//
// nxsyncd
// ```

use anyhow::{Context, Result};
use nxsync_core::{Device, DeviceConfig, DeviceRegistry, SyncConfig, run_pass};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown, or a single pass with no failed resource
/// - 1: Configuration or startup error
/// - 2: Runtime error, or a single pass with failed resources
#[derive(Debug, Clone, Copy)]
enum NxsyncExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<NxsyncExitCode> for ExitCode {
    fn from(code: NxsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    manifest: PathBuf,
    device_path: Option<String>,
    noop: Option<bool>,
    run_interval_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let manifest = env::var("NXSYNC_MANIFEST").context(
            "NXSYNC_MANIFEST is required. \
            Set it via: export NXSYNC_MANIFEST=/etc/nxsync/manifest.json",
        )?;

        let noop = match env::var("NXSYNC_NOOP").ok() {
            None => None,
            Some(raw) => Some(parse_flag(&raw).with_context(|| {
                format!("NXSYNC_NOOP must be true or false. Got: {}", raw)
            })?),
        };

        let run_interval_secs = match env::var("NXSYNC_RUN_INTERVAL").ok() {
            None => None,
            Some(raw) => Some(raw.trim().parse().with_context(|| {
                format!("NXSYNC_RUN_INTERVAL must be a number of seconds. Got: {}", raw)
            })?),
        };

        Ok(Self {
            manifest: PathBuf::from(manifest),
            device_path: env::var("NXSYNC_DEVICE_PATH").ok(),
            noop,
            run_interval_secs,
            log_level: env::var("NXSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.manifest.is_file() {
            anyhow::bail!(
                "NXSYNC_MANIFEST does not point to a file: {}",
                self.manifest.display()
            );
        }

        if let Some(path) = &self.device_path
            && path.is_empty()
        {
            anyhow::bail!("NXSYNC_DEVICE_PATH cannot be empty when set");
        }

        if let Some(interval) = self.run_interval_secs
            && interval > 86_400
        {
            anyhow::bail!(
                "NXSYNC_RUN_INTERVAL must be at most 86400 seconds. Got: {}",
                interval
            );
        }

        if log_level(&self.log_level).is_none() {
            anyhow::bail!(
                "NXSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    /// Load the manifest and apply environment overrides
    fn manifest(&self) -> Result<SyncConfig> {
        let mut manifest = SyncConfig::from_path(&self.manifest)
            .with_context(|| format!("Failed to load manifest {}", self.manifest.display()))?;

        if let Some(path) = &self.device_path {
            manifest.device = DeviceConfig::File { path: path.clone() };
        }
        if let Some(noop) = self.noop {
            manifest.engine.noop = noop;
        }
        if let Some(interval) = self.run_interval_secs {
            manifest.engine.run_interval_secs = interval;
        }

        manifest.validate().context("Invalid manifest")?;
        Ok(manifest)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn log_level(raw: &str) -> Option<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NxsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return NxsyncExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&config.log_level).unwrap_or(Level::INFO))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NxsyncExitCode::ConfigError.into();
    }

    info!("Starting nxsyncd");

    let manifest = match config.manifest() {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{:#}", e);
            return NxsyncExitCode::ConfigError.into();
        }
    };
    info!(
        "Manifest loaded: {} ACE(s), {} port-channel global(s)",
        manifest.aces.len(),
        manifest.portchannel_globals.len()
    );

    let registry = DeviceRegistry::with_builtin();
    let device = match registry.create(&manifest.device) {
        Ok(device) => device,
        Err(e) => {
            error!("Failed to open {} device: {}", manifest.device.type_name(), e);
            return NxsyncExitCode::ConfigError.into();
        }
    };

    // Passes are synchronous; the runtime only drives the interval timer
    // and signal handling.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NxsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(device.as_ref(), &manifest).await {
            Ok(true) => NxsyncExitCode::CleanShutdown,
            Ok(false) => NxsyncExitCode::RuntimeError,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                NxsyncExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Run one pass, or one per interval until a shutdown signal
///
/// Returns `false` when a single pass left failed resources.
async fn run_daemon(device: &dyn Device, manifest: &SyncConfig) -> Result<bool> {
    let interval = manifest.engine.run_interval_secs;

    if interval == 0 {
        let report = run_pass(device, manifest)?;
        if report.has_failures() {
            warn!("{} resource(s) failed", report.failed());
        }
        return Ok(!report.has_failures());
    }

    let mut shutdown = ShutdownSignals::new()?;
    info!("Running a pass every {}s", interval);

    loop {
        match run_pass(device, manifest) {
            Ok(report) if report.has_failures() => {
                warn!(
                    "{} resource(s) failed; they are reconciled again next pass",
                    report.failed()
                );
            }
            Ok(_) => {}
            Err(e) => error!("Pass aborted: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            signal = shutdown.recv() => {
                info!("Received shutdown signal: {}", signal);
                info!("Shutting down daemon");
                return Ok(true);
            }
        }
    }
}

/// SIGTERM and SIGINT handlers, installed once for the daemon's lifetime
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Fallback for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(log_level("verbose"), None);
    }
}

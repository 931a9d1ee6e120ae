use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Target for per-cycle liveness records.
pub const HEARTBEAT_TARGET: &str = "talon::heartbeat";

/// Heartbeats plus anything at warn or above.
pub fn heartbeat_filter() -> Targets {
    Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target(HEARTBEAT_TARGET, LevelFilter::INFO)
}

fn open_heartbeat(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open heartbeat log {}", path.display()))
}

/// Console output filtered by `RUST_LOG`. With `heartbeat_log`, also an
/// append-only file that external watchers can tail.
pub fn init(heartbeat_log: Option<&Path>) -> Result<()> {
    let file = heartbeat_log.map(open_heartbeat).transpose()?;

    let console = fmt::layer().with_ansi(true).with_filter(
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    );
    let heartbeat = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(heartbeat_filter())
    });

    tracing_subscriber::registry()
        .with(console)
        .with(heartbeat)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn heartbeat_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talon_heartbeat.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut file = open_heartbeat(&path).unwrap();
        io::Write::write_all(&mut file, b"later\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn heartbeat_log_keeps_heartbeats_and_problems() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .with_filter(heartbeat_filter()),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: HEARTBEAT_TARGET, cycle = 7, "cycle done");
            tracing::info!("routine chatter");
            tracing::warn!("delivery failed");
        });

        let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("cycle done"));
        assert!(log.contains("cycle=7"));
        assert!(log.contains("delivery failed"));
        assert!(!log.contains("routine chatter"));
    }
}

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigStore, TalonConfig};
use crate::dashboard;
use crate::error::Result;
use crate::logging::HEARTBEAT_TARGET;
use crate::models::{AlertEvent, AlertKind, PollResult, Target};
use crate::notify::AlertSink;
use crate::probe::HealthProbe;
use crate::tracker::FailureTracker;
use crate::vitals::VitalsSource;

/// What one poll cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub results: PollResult,
    pub alerts: Vec<AlertEvent>,
    pub delivered: usize,
}

/// The long-lived poll loop: reload, probe, evaluate, alert, render, sleep.
pub struct Monitor {
    store: ConfigStore,
    probe: Arc<dyn HealthProbe>,
    sink: Option<Arc<dyn AlertSink>>,
    vitals: Box<dyn VitalsSource>,
    dashboard_path: PathBuf,
    tracker: FailureTracker,
    snapshot: TalonConfig,
    cycles: u64,
}

impl Monitor {
    pub fn new(
        store: ConfigStore,
        probe: Arc<dyn HealthProbe>,
        sink: Option<Arc<dyn AlertSink>>,
        vitals: Box<dyn VitalsSource>,
        dashboard_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            probe,
            sink,
            vitals,
            dashboard_path: dashboard_path.into(),
            tracker: FailureTracker::default(),
            snapshot: TalonConfig::default(),
            cycles: 0,
        }
    }

    pub fn tracker(&self) -> &FailureTracker {
        &self.tracker
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.snapshot.interval_secs())
    }

    /// Runs until the future is dropped. A failed cycle is logged and the next
    /// one still runs on schedule.
    pub async fn run(&mut self) {
        info!("Talon monitor active, dashboard at {}", self.dashboard_path.display());

        loop {
            if let Err(e) = self.run_cycle().await {
                error!("Monitor cycle {} failed: {}", self.cycles, e);
            }
            tokio::time::sleep(self.interval()).await;
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let started = Instant::now();
        self.reload();

        let targets = self.snapshot.watchlist.enabled_targets();
        self.tracker.retain_ports(&self.snapshot.watchlist.ports());

        let results = self.poll(&targets).await;

        let alerts: Vec<AlertEvent> = results
            .iter()
            .filter_map(|(port, is_up)| self.tracker.evaluate(port, is_up))
            .collect();
        let delivered = self.dispatch(&targets, &alerts).await;

        let vitals = self.vitals.sample();
        let report = dashboard::render(
            &results,
            &self.snapshot.watchlist.targets(),
            &vitals,
            Local::now().naive_local(),
        );
        dashboard::write(&self.dashboard_path, &report)?;

        info!(
            target: HEARTBEAT_TARGET,
            cycle = self.cycles,
            targets = results.len(),
            up = results.up_count(),
            alerts = alerts.len(),
            "Cycle completed in {:.2}s",
            started.elapsed().as_secs_f64()
        );

        Ok(CycleReport { results, alerts, delivered })
    }

    fn reload(&mut self) {
        match self.store.load() {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(e) => warn!("Config reload failed, keeping previous watchlist: {}", e),
        }
    }

    async fn poll(&self, targets: &[Target]) -> PollResult {
        let tasks: Vec<_> = targets
            .iter()
            .map(|target| {
                let probe = Arc::clone(&self.probe);
                let port = target.port;
                tokio::spawn(async move { probe.probe(port).await })
            })
            .collect();

        let mut results = PollResult::new();
        for (target, outcome) in targets.iter().zip(futures::future::join_all(tasks).await) {
            let is_up = outcome.unwrap_or_else(|e| {
                warn!("Probe for port {} aborted: {}", target.port, e);
                false
            });
            results.record(target.port, is_up);
        }
        results
    }

    /// Delivery failures are logged only; the tracker already counts the alert as sent.
    async fn dispatch(&self, targets: &[Target], alerts: &[AlertEvent]) -> usize {
        let mut delivered = 0;

        for alert in alerts {
            let name = targets
                .iter()
                .find(|t| t.port == alert.port)
                .map(|t| t.display_name.as_str())
                .unwrap_or("Unknown");
            let message = alert.message(name);
            match alert.kind {
                AlertKind::Down => error!("[CHANGE] {} ({}) -> DOWN", name, alert.port),
                AlertKind::Recovered => warn!("[CHANGE] {} ({}) -> UP", name, alert.port),
            }

            let (Some(sink), Some(recipient)) = (&self.sink, self.snapshot.chat_id) else {
                debug!("No alert recipient bound, skipping {} alert for port {}", alert.kind, alert.port);
                continue;
            };

            match sink.deliver(recipient, &message).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to deliver {} alert for port {}: {}", alert.kind, alert.port, e),
            }
        }
        delivered
    }
}

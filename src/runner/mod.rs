//! Load run orchestration
//!
//! Spawns one task per simulated user, staggers their startup, enforces the
//! run deadline, and handles Ctrl-C as an early, graceful stop. Users share
//! nothing but the gateway client and the metrics registry. When the run
//! ends the runner drains every user task, snapshots the registry, and
//! produces the final report.

use crate::config::LoadConfig;
use crate::error::{Error, Result};
use crate::gateway::GatewayClient;
use crate::metrics::{exporter, MetricsRegistry, RunReport};
use crate::session::UserSession;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Orchestrates one load run.
pub struct LoadRunner {
    config: Arc<LoadConfig>,
    gateway: Arc<GatewayClient>,
    metrics: Arc<MetricsRegistry>,
}

impl LoadRunner {
    pub fn new(config: LoadConfig) -> Result<Self> {
        config.validate()?;
        let gateway = Arc::new(GatewayClient::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            gateway,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Run the configured load and return the final report.
    pub async fn run(&self) -> Result<RunReport> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            "run {}: {} users against {} for {:?}",
            self.metrics.run_id(),
            self.config.users,
            self.gateway.base_url(),
            self.config.duration
        );

        if let Some(port) = self.config.metrics_port {
            let _ = exporter::spawn(port);
        }

        let ctrl_tx = shutdown_tx.clone();
        let _ = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping the run");
                let _ = ctrl_tx.send(true);
            }
        });

        let progress = self.spawn_progress_logger(shutdown_rx.clone());

        let deadline = Instant::now() + self.config.duration;
        let mut handles = Vec::with_capacity(self.config.users);
        for index in 0..self.config.users {
            if *shutdown_rx.borrow() {
                break;
            }
            let session = UserSession::new(
                index,
                Arc::clone(&self.gateway),
                Arc::clone(&self.config),
                Arc::clone(&self.metrics),
            );
            handles.push(tokio::spawn(drive_user(
                session,
                deadline,
                shutdown_rx.clone(),
            )));

            let mut spawn_rx = shutdown_rx.clone();
            tokio::select! {
                _ = tokio::time::sleep(self.config.spawn_interval) => {}
                _ = spawn_rx.changed() => break,
            }
        }
        info!("spawned {} users", handles.len());

        let mut deadline_rx = shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                info!("run duration elapsed, stopping users");
            }
            _ = deadline_rx.changed() => {}
        }
        let _ = shutdown_tx.send(true);

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("user task ended abnormally: {}", e);
            }
        }
        progress.abort();

        let report = self.metrics.report();
        self.write_report(&report)?;
        Ok(report)
    }

    /// Periodic progress line: totals and the rate over the last interval.
    fn spawn_progress_logger(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let metrics = Arc::clone(&self.metrics);
        let interval = self.config.progress_interval;
        tokio::spawn(async move {
            let mut last_requests = 0u64;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.changed() => break,
                }
                let (requests, failures) = metrics.totals();
                let rate = (requests - last_requests) as f64 / interval.as_secs_f64();
                info!(
                    "progress: {} requests ({} failed), {:.1} req/s",
                    requests, failures, rate
                );
                last_requests = requests;
            }
        })
    }

    /// Write the report as JSON when a path is configured.
    fn write_report(&self, report: &RunReport) -> Result<()> {
        if let Some(path) = &self.config.report_path {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| Error::Report(e.to_string()))?;
            std::fs::write(path, json)
                .map_err(|e| Error::Report(format!("cannot write {}: {}", path.display(), e)))?;
            info!("report written to {}", path.display());
        }
        Ok(())
    }
}

/// One simulated user's lifetime: bootstrap once, then loop the weighted mix
/// until the deadline passes or shutdown is signalled.
async fn drive_user(
    mut session: UserSession,
    deadline: Instant,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = session.bootstrap() => {}
        _ = shutdown.changed() => return,
    }

    loop {
        if *shutdown.borrow() || Instant::now() >= deadline {
            break;
        }
        session.run_iteration().await;

        let wait = session.next_wait();
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(wait.min(remaining)) => {}
            _ = shutdown.changed() => break,
        }
    }
}

//! Connector — one fetch → enrich → transform → send cycle, and the loop that
//! repeats it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use ubridge_core::config::{Config, ScheduleConfig};
use ubridge_core::{transform_batch, IdentityCache, LogType};
use ubridge_feeds::{ActivityEndpoint, ActivityWindow, FeedError, HecSender, UmbrellaClient};

/// What one cycle did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Raw records fetched across all activity endpoints.
    pub fetched: usize,
    /// Records reshaped into normalized events.
    pub normalized: usize,
    /// Firewall and unrecognised records forwarded unchanged.
    pub passed_through: usize,
    /// Events accepted by the event collector.
    pub sent: usize,
    pub by_type: HashMap<LogType, usize>,
}

/// Owns the Umbrella client, the event collector sender, and the identity cache.
pub struct Connector {
    umbrella: UmbrellaClient,
    hec: HecSender,
    schedule: ScheduleConfig,
    identities: IdentityCache,
}

impl Connector {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        Ok(Self {
            umbrella: UmbrellaClient::new(config.umbrella.clone())?,
            hec: HecSender::new(&config.hec)?,
            schedule: config.schedule.clone(),
            identities: IdentityCache::new(),
        })
    }

    pub fn identities(&self) -> &IdentityCache {
        &self.identities
    }

    /// Run one cycle over the fetch interval ending at `now`.
    ///
    /// Failures are logged and end the cycle early; nothing is retried.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();
        let window = ActivityWindow::ending_at(now, self.schedule.fetch_interval());
        tracing::info!(
            from = %window.from.to_rfc3339(),
            to = %window.to.to_rfc3339(),
            "running fetch cycle"
        );

        let token = match self.umbrella.fetch_token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(%err, "error getting Umbrella API token");
                return report;
            }
        };

        if self
            .identities
            .needs_refresh(self.schedule.identity_cache_max_age())
        {
            let labels = self.umbrella.fetch_identities(&token).await;
            self.identities.replace(labels);
        }

        let mut records = Vec::new();
        for endpoint in ActivityEndpoint::ALL {
            records.extend(self.umbrella.fetch_activity(&token, endpoint, &window).await);
        }
        report.fetched = records.len();
        if records.is_empty() {
            tracing::info!("no logs found from any source in this time window");
            return report;
        }

        tracing::info!(total = report.fetched, "enriching and transforming logs");
        let events = transform_batch(records, Some(&self.identities));
        for event in &events {
            *report.by_type.entry(event.log_type()).or_default() += 1;
            if event.is_normalized() {
                report.normalized += 1;
            } else {
                report.passed_through += 1;
            }
        }
        if let Some(first) = events.first() {
            tracing::debug!(event = ?first, "first transformed log in batch");
        }

        match self.hec.send(&events).await {
            Ok(sent) => report.sent = sent,
            Err(err) => tracing::error!(%err, "error sending logs to event collector"),
        }
        report
    }

    /// Repeat cycles every fetch interval until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let interval = self.schedule.fetch_interval();
        let minutes = self.schedule.fetch_interval_minutes;

        loop {
            tokio::select! {
                report = self.run_cycle(Utc::now()) => {
                    tracing::info!(
                        fetched = report.fetched,
                        sent = report.sent,
                        minutes,
                        "cycle complete, waiting before next run"
                    );
                }
                _ = &mut shutdown => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => break,
            }
        }
        tracing::info!("shutdown requested, connector stopped");
    }
}

//! Signal dashboard poller
//!
//! Each cycle fetches signals and rules concurrently and merges them into a
//! display snapshot. Only the first successful cycle moves the view out of
//! `Initializing`; later cycles refresh silently, keeping the previous data
//! visible while they run.
//!
//! Cycles may overlap when the server is slower than the poll interval. Every
//! cycle carries an issue sequence number and a response older than the last
//! applied one is dropped, so results land in issue order. Ending the session
//! bumps an epoch; cycles issued before that still finish but change nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::models::{RuleSummary, SignalEntry};
use crate::services::{RuleStore, SignalSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No data yet: the view shows a full loading state
    Initializing,
    Ready,
    /// Data visible, a silent refresh is in flight
    Refreshing,
}

/// What happened to one poll cycle's response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    /// A newer cycle had already been applied
    Stale,
    Failed,
    /// The session ended while the cycle was in flight
    Discarded,
}

/// Filter by rule name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleFilter {
    #[default]
    All,
    Rule(String),
}

/// Client-side view filter, never sent to the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalFilter {
    pub rule: RuleFilter,
    pub show_no_signal: bool,
}

impl SignalFilter {
    pub fn matches(&self, entry: &SignalEntry) -> bool {
        let rule_match = match &self.rule {
            RuleFilter::All => true,
            RuleFilter::Rule(name) => entry.rule_name.as_deref() == Some(name.as_str()),
        };
        rule_match && (self.show_no_signal || !entry.is_no_signal())
    }
}

pub fn filter_signals<'a>(signals: &'a [SignalEntry], filter: &SignalFilter) -> Vec<&'a SignalEntry> {
    signals.iter().filter(|entry| filter.matches(entry)).collect()
}

#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub phase: PollPhase,
    pub signals: Vec<SignalEntry>,
    /// Names of the stored rules, used for the filter choices
    pub rules: Vec<RuleSummary>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Last poll failure, cleared by the next successful cycle
    pub last_error: Option<String>,
}

impl DashboardSnapshot {
    fn initial() -> Self {
        Self {
            phase: PollPhase::Initializing,
            signals: Vec::new(),
            rules: Vec::new(),
            last_updated: None,
            last_error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == PollPhase::Initializing
    }

    pub fn is_refreshing(&self) -> bool {
        self.phase == PollPhase::Refreshing
    }

    pub fn filtered(&self, filter: &SignalFilter) -> Vec<&SignalEntry> {
        filter_signals(&self.signals, filter)
    }

    /// "All" followed by one choice per polled rule name
    pub fn filter_choices(&self) -> Vec<RuleFilter> {
        let mut choices = vec![RuleFilter::All];
        for rule in &self.rules {
            let choice = RuleFilter::Rule(rule.name.clone());
            if !choices.contains(&choice) {
                choices.push(choice);
            }
        }
        choices
    }
}

struct PollState {
    snapshot: DashboardSnapshot,
    applied_seq: u64,
    in_flight: usize,
}

impl PollState {
    fn settle_phase(&mut self) {
        self.snapshot.phase = match (self.snapshot.last_updated, self.in_flight) {
            (None, _) => PollPhase::Initializing,
            (Some(_), 0) => PollPhase::Ready,
            (Some(_), _) => PollPhase::Refreshing,
        };
    }
}

pub struct SignalPoller {
    signals: Arc<dyn SignalSource>,
    rules: Arc<dyn RuleStore>,
    metrics: Arc<Metrics>,
    state: RwLock<PollState>,
    snapshots: watch::Sender<DashboardSnapshot>,
    issued: AtomicU64,
    epoch: AtomicU64,
}

impl SignalPoller {
    pub fn new(
        signals: Arc<dyn SignalSource>,
        rules: Arc<dyn RuleStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (snapshots, _) = watch::channel(DashboardSnapshot::initial());
        Self {
            signals,
            rules,
            metrics,
            state: RwLock::new(PollState {
                snapshot: DashboardSnapshot::initial(),
                applied_seq: 0,
                in_flight: 0,
            }),
            snapshots,
            issued: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.subscribe()
    }

    /// Stop applying results of cycles issued so far
    pub fn end_session(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(epoch = epoch, "Signal poller session ended");
    }

    /// Run one poll cycle
    pub async fn refresh(&self) -> PollOutcome {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.poll_cycles_total.inc();

        {
            let mut state = self.state.write().await;
            state.in_flight += 1;
            state.settle_phase();
            self.publish(&state);
        }

        let result = try_join(
            self.signals.fetch_signals(),
            self.rules.list_rule_summaries(),
        )
        .await;

        let mut state = self.state.write().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(seq = seq, "Poll response arrived after teardown, discarded");
            state.settle_phase();
            self.publish(&state);
            return PollOutcome::Discarded;
        }

        let outcome = match result {
            Ok((signals, rules)) if seq > state.applied_seq => {
                state.applied_seq = seq;
                state.snapshot.signals = signals.into_entries();
                state.snapshot.rules = rules;
                state.snapshot.last_updated = Some(Utc::now());
                state.snapshot.last_error = None;
                debug!(seq = seq, signals = state.snapshot.signals.len(), "Dashboard refreshed");
                PollOutcome::Applied
            }
            Ok(_) => {
                self.metrics.stale_poll_responses_total.inc();
                debug!(seq = seq, applied = state.applied_seq, "Stale poll response dropped");
                PollOutcome::Stale
            }
            Err(e) => {
                self.metrics.poll_failures_total.inc();
                warn!(seq = seq, error = %e, "Error fetching dashboard data");
                if seq > state.applied_seq {
                    state.snapshot.last_error = Some(e.to_string());
                }
                PollOutcome::Failed
            }
        };

        let was_loading = state.snapshot.is_loading();
        state.settle_phase();
        if was_loading && !state.snapshot.is_loading() {
            info!("Signal dashboard initialized");
        }
        self.publish(&state);
        outcome
    }

    fn publish(&self, state: &PollState) {
        self.snapshots.send_replace(state.snapshot.clone());
    }
}

//! Rule synchronizer
//!
//! Keeps the local rule list consistent with the remote store. Plain CRUD goes
//! straight to the store; the telegram toggle is optimistic: the local list
//! flips immediately and the write runs in the background, reverting to the
//! last server-confirmed value if it fails.
//!
//! Writes are serialized per rule id through a write token, so at most one
//! request per rule is in flight. A queued toggle sends the rule's latest
//! local state once it holds the token and is skipped entirely when that
//! state already matches what the server confirmed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::metrics::Metrics;
use crate::models::{Rule, RuleId};
use crate::services::RuleStore;

use super::notice::NoticeBoard;

pub const DELETE_PROMPT: &str = "Are you sure you want to permanently delete this rule?";

/// Explicit user confirmation step
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Pending state of one row in the rule list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStatus {
    pub deleting: bool,
    pub pending_writes: usize,
}

impl RowStatus {
    pub fn is_busy(&self) -> bool {
        self.deleting || self.pending_writes > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined; nothing was sent
    Declined,
    /// A delete for this rule is already in flight
    AlreadyPending,
    Deleted,
}

/// Handle to a background telegram write
pub struct PendingWrite {
    rule_id: RuleId,
    handle: JoinHandle<Result<Rule, SyncError>>,
}

impl PendingWrite {
    pub fn rule_id(&self) -> &RuleId {
        &self.rule_id
    }

    /// Wait for the write (and any rollback) to finish
    pub async fn settled(self) -> Result<Rule, SyncError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(rule_id = %self.rule_id, error = %e, "Telegram write task did not complete");
                Err(SyncError::Aborted)
            }
        }
    }
}

#[derive(Default)]
struct Library {
    rules: Vec<Rule>,
    /// Last telegram flag the server acknowledged, per rule
    confirmed: HashMap<RuleId, bool>,
    rows: HashMap<RuleId, RowStatus>,
}

impl Library {
    fn find(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id.as_ref() == Some(id))
    }

    fn find_mut(&mut self, id: &RuleId) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| r.id.as_ref() == Some(id))
    }

    fn row(&self, id: &RuleId) -> RowStatus {
        self.rows.get(id).copied().unwrap_or_default()
    }

    fn remove(&mut self, id: &RuleId) {
        self.rules.retain(|r| r.id.as_ref() != Some(id));
        self.confirmed.remove(id);
    }

    /// Install a freshly listed set of rules. Rows with writes in flight keep
    /// their local telegram flag until those writes settle.
    fn replace_all(&mut self, fetched: Vec<Rule>) {
        let mut merged = Vec::with_capacity(fetched.len());
        for mut rule in fetched {
            if let Some(id) = rule.id.clone() {
                self.confirmed.insert(id.clone(), rule.telegram_enabled);
                if self.row(&id).pending_writes > 0 {
                    if let Some(local) = self.find(&id) {
                        rule.telegram_enabled = local.telegram_enabled;
                    }
                }
            }
            merged.push(rule);
        }
        self.rules = merged;

        let ids: HashSet<RuleId> = self.rules.iter().filter_map(|r| r.id.clone()).collect();
        self.confirmed.retain(|id, _| ids.contains(id));
        self.rows.retain(|id, row| ids.contains(id) || row.is_busy());
    }

    /// Mark one write for `id` finished, returning how many are still queued
    fn finish_write(&mut self, id: &RuleId) -> usize {
        let remaining = match self.rows.get_mut(id) {
            Some(row) => {
                row.pending_writes = row.pending_writes.saturating_sub(1);
                row.pending_writes
            }
            None => 0,
        };
        if self.row(id) == RowStatus::default() {
            self.rows.remove(id);
        }
        remaining
    }
}

pub struct RuleSynchronizer {
    store: Arc<dyn RuleStore>,
    metrics: Arc<Metrics>,
    notices: NoticeBoard,
    library: RwLock<Library>,
    write_tokens: Mutex<HashMap<RuleId, Arc<Mutex<()>>>>,
}

impl RuleSynchronizer {
    pub fn new(store: Arc<dyn RuleStore>, metrics: Arc<Metrics>, notices: NoticeBoard) -> Self {
        Self {
            store,
            metrics,
            notices,
            library: RwLock::new(Library::default()),
            write_tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of the local rule list
    pub async fn rules(&self) -> Vec<Rule> {
        self.library.read().await.rules.clone()
    }

    pub async fn rule(&self, id: &RuleId) -> Option<Rule> {
        self.library.read().await.find(id).cloned()
    }

    pub async fn row_status(&self, id: &RuleId) -> RowStatus {
        self.library.read().await.row(id)
    }

    /// Local telegram flag of `id`, including unconfirmed optimistic changes
    pub async fn telegram_enabled(&self, id: &RuleId) -> Option<bool> {
        self.library
            .read()
            .await
            .find(id)
            .map(|rule| rule.telegram_enabled)
    }

    pub async fn list(&self) -> Result<Vec<Rule>, SyncError> {
        Ok(self.store.list_rules().await?)
    }

    /// Replace the local list with the server's
    pub async fn refresh(&self) -> Result<Vec<Rule>, SyncError> {
        let fetched = self.list().await.map_err(|e| {
            warn!(error = %e, "Failed to fetch rules");
            e
        })?;
        let rules = {
            let mut library = self.library.write().await;
            library.replace_all(fetched);
            library.rules.clone()
        };
        debug!(count = rules.len(), "Rule list refreshed");

        let listed: HashSet<RuleId> = rules.iter().filter_map(|r| r.id.clone()).collect();
        self.write_tokens
            .lock()
            .await
            .retain(|id, token| listed.contains(id) || Arc::strong_count(token) > 1);
        Ok(rules)
    }

    pub async fn create(&self, draft: &Rule) -> Result<Rule, SyncError> {
        self.metrics.rule_writes_total.inc();
        match self.store.create_rule(draft).await {
            Ok(created) => {
                info!(rule_id = ?created.id, name = %created.name, "Rule saved");
                Ok(created)
            }
            Err(e) => {
                self.metrics.rule_write_failures_total.inc();
                error!(name = %draft.name, error = %e, "Failed to save rule");
                Err(e.into())
            }
        }
    }

    /// Full-document replace of `id`
    pub async fn update(&self, id: &RuleId, rule: &Rule) -> Result<Rule, SyncError> {
        let token = self.write_token(id).await;
        let _guard = token.lock().await;

        self.metrics.rule_writes_total.inc();
        match self.store.update_rule(id, rule).await {
            Ok(saved) => {
                self.library
                    .write()
                    .await
                    .confirmed
                    .insert(id.clone(), rule.telegram_enabled);
                info!(rule_id = %id, "Rule updated");
                Ok(saved)
            }
            Err(e) => {
                self.metrics.rule_write_failures_total.inc();
                error!(rule_id = %id, error = %e, "Failed to update rule");
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, id: &RuleId) -> Result<(), SyncError> {
        let token = self.write_token(id).await;
        let _guard = token.lock().await;

        self.metrics.rule_writes_total.inc();
        match self.store.delete_rule(id).await {
            Ok(()) => {
                info!(rule_id = %id, "Rule deleted");
                Ok(())
            }
            Err(e) => {
                self.metrics.rule_write_failures_total.inc();
                error!(rule_id = %id, error = %e, "Failed to delete rule");
                Err(e.into())
            }
        }
    }

    /// Flip `telegram_enabled` locally and persist it in the background.
    ///
    /// The local list reflects the new value before this returns. Await the
    /// returned handle to observe the outcome; on failure the flag has already
    /// been reverted and an error notice published.
    pub async fn toggle_telegram(self: &Arc<Self>, id: &RuleId) -> Result<PendingWrite, SyncError> {
        {
            let mut library = self.library.write().await;
            if library.row(id).deleting {
                return Err(SyncError::RowBusy(id.clone()));
            }
            let rule = library
                .find_mut(id)
                .ok_or_else(|| SyncError::UnknownRule(id.clone()))?;
            let previous = rule.telegram_enabled;
            rule.telegram_enabled = !previous;

            library.confirmed.entry(id.clone()).or_insert(previous);
            library.rows.entry(id.clone()).or_default().pending_writes += 1;
            debug!(rule_id = %id, telegram_enabled = !previous, "Telegram toggled locally");
        }

        let this = Arc::clone(self);
        let rule_id = id.clone();
        let handle = tokio::spawn(async move { this.persist_telegram(rule_id).await });

        Ok(PendingWrite {
            rule_id: id.clone(),
            handle,
        })
    }

    async fn persist_telegram(&self, id: RuleId) -> Result<Rule, SyncError> {
        let token = self.write_token(&id).await;
        let _guard = token.lock().await;

        let (snapshot, confirmed) = {
            let library = self.library.read().await;
            (library.find(&id).cloned(), library.confirmed.get(&id).copied())
        };

        let Some(snapshot) = snapshot else {
            self.library.write().await.finish_write(&id);
            return Err(SyncError::UnknownRule(id));
        };

        if confirmed == Some(snapshot.telegram_enabled) {
            self.library.write().await.finish_write(&id);
            debug!(rule_id = %id, "Telegram write coalesced, server already up to date");
            return Ok(snapshot);
        }

        self.metrics.rule_writes_total.inc();
        let result = self.store.update_rule(&id, &snapshot).await;

        let mut library = self.library.write().await;
        let remaining = library.finish_write(&id);
        match result {
            Ok(saved) => {
                library
                    .confirmed
                    .insert(id.clone(), snapshot.telegram_enabled);
                debug!(rule_id = %id, telegram_enabled = snapshot.telegram_enabled, "Telegram toggle persisted");
                Ok(saved)
            }
            Err(e) => {
                self.metrics.rule_write_failures_total.inc();
                if remaining == 0 {
                    let restore = library.confirmed.get(&id).copied();
                    if let (Some(value), Some(rule)) = (restore, library.find_mut(&id)) {
                        rule.telegram_enabled = value;
                        self.metrics.optimistic_rollbacks_total.inc();
                    }
                }
                error!(rule_id = %id, error = %e, "Failed to update Telegram toggle, local change reverted");
                self.notices
                    .error("Could not update the Telegram alert. The change was reverted.");
                Err(e.into())
            }
        }
    }

    /// Ask for confirmation, then delete `id`.
    ///
    /// While the request is in flight the row is marked as deleting and further
    /// calls for it return `AlreadyPending` without prompting.
    pub async fn delete_with_confirmation<P>(
        &self,
        id: &RuleId,
        prompt: &P,
    ) -> Result<DeleteOutcome, SyncError>
    where
        P: ConfirmPrompt + ?Sized,
    {
        if self.row_status(id).await.deleting {
            debug!(rule_id = %id, "Delete already in flight");
            return Ok(DeleteOutcome::AlreadyPending);
        }
        if !prompt.confirm(DELETE_PROMPT) {
            debug!(rule_id = %id, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        {
            let mut library = self.library.write().await;
            let row = library.rows.entry(id.clone()).or_default();
            if row.deleting {
                return Ok(DeleteOutcome::AlreadyPending);
            }
            row.deleting = true;
        }

        match self.delete(id).await {
            Ok(()) => {
                self.notices.success("Logic deleted successfully!");
                if let Err(e) = self.refresh().await {
                    warn!(rule_id = %id, error = %e, "Refresh after delete failed, dropping rule locally");
                    self.library.write().await.remove(id);
                }
                self.release_write_token(id).await;
                self.clear_deleting(id).await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                self.clear_deleting(id).await;
                self.notices.error("Could not delete rule. Please try again.");
                Err(e)
            }
        }
    }

    async fn clear_deleting(&self, id: &RuleId) {
        let mut library = self.library.write().await;
        if let Some(row) = library.rows.get_mut(id) {
            row.deleting = false;
        }
        if library.row(id) == RowStatus::default() {
            library.rows.remove(id);
        }
    }

    /// Rule ids currently holding a write token
    pub async fn write_token_count(&self) -> usize {
        self.write_tokens.lock().await.len()
    }

    /// Forget the token of a deleted rule unless a queued write still holds it
    async fn release_write_token(&self, id: &RuleId) {
        let mut tokens = self.write_tokens.lock().await;
        if tokens.get(id).is_some_and(|token| Arc::strong_count(token) == 1) {
            tokens.remove(id);
        }
    }

    async fn write_token(&self, id: &RuleId) -> Arc<Mutex<()>> {
        let mut tokens = self.write_tokens.lock().await;
        tokens.entry(id.clone()).or_default().clone()
    }
}

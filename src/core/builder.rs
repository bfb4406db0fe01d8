//! Rule builder view
//!
//! Owns the configuration cache, the rule synchronizer and the single editor
//! instance. The editor only exists once the configuration has loaded, so it
//! can never be seeded from an undefined configuration.

use std::sync::Arc;

use futures_util::future::try_join;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{EditorError, SubmitError, SyncError};
use crate::metrics::Metrics;
use crate::models::{Configuration, Rule, RuleId};
use crate::rules::{EditorState, RuleEditor, RuleForm, SubmitRequest};
use crate::services::RuleStore;

use super::notice::NoticeBoard;
use super::synchronizer::{ConfirmPrompt, DeleteOutcome, PendingWrite, RuleSynchronizer};

#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    Ready(Arc<Configuration>),
    /// Initial load failed; the message is shown and `load` may be retried
    Failed(String),
}

pub struct RuleBuilder {
    store: Arc<dyn RuleStore>,
    synchronizer: Arc<RuleSynchronizer>,
    notices: NoticeBoard,
    load_state: RwLock<LoadState>,
    editor: Mutex<Option<RuleEditor>>,
}

impl RuleBuilder {
    pub fn new(store: Arc<dyn RuleStore>, metrics: Arc<Metrics>, notices: NoticeBoard) -> Self {
        let synchronizer = Arc::new(RuleSynchronizer::new(
            store.clone(),
            metrics,
            notices.clone(),
        ));
        Self {
            store,
            synchronizer,
            notices,
            load_state: RwLock::new(LoadState::Loading),
            editor: Mutex::new(None),
        }
    }

    pub fn synchronizer(&self) -> &Arc<RuleSynchronizer> {
        &self.synchronizer
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Fetch the configuration and the rule list concurrently.
    ///
    /// The configuration is fetched only once; later calls just refresh rules.
    pub async fn load(&self) -> Result<Arc<Configuration>, SyncError> {
        if let Some(config) = self.configuration().await {
            self.synchronizer.refresh().await?;
            return Ok(config);
        }

        let fetch_config = async { Ok::<_, SyncError>(self.store.fetch_config().await?) };
        match try_join(fetch_config, self.synchronizer.refresh()).await {
            Ok((config, rules)) => {
                let config = Arc::new(config);
                *self.editor.lock().await = Some(RuleEditor::new(config.clone()));
                *self.load_state.write().await = LoadState::Ready(config.clone());
                info!(
                    timeframes = config.timeframes().len(),
                    rules = rules.len(),
                    "Rule builder loaded"
                );
                Ok(config)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch initial rule builder data");
                *self.load_state.write().await = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn load_state(&self) -> LoadState {
        self.load_state.read().await.clone()
    }

    pub async fn configuration(&self) -> Option<Arc<Configuration>> {
        match &*self.load_state.read().await {
            LoadState::Ready(config) => Some(config.clone()),
            LoadState::Loading | LoadState::Failed(_) => None,
        }
    }

    pub async fn rules(&self) -> Vec<Rule> {
        self.synchronizer.rules().await
    }

    pub async fn editor_state(&self) -> Option<EditorState> {
        self.editor.lock().await.as_ref().map(|e| e.state().clone())
    }

    pub async fn form(&self) -> Option<RuleForm> {
        self.editor.lock().await.as_ref().map(|e| e.form().clone())
    }

    /// Run `f` against the editor; fails with `NotLoaded` before `load`
    pub async fn with_editor<R, F>(&self, f: F) -> Result<R, EditorError>
    where
        F: FnOnce(&mut RuleEditor) -> Result<R, EditorError>,
    {
        let mut guard = self.editor.lock().await;
        let editor = guard.as_mut().ok_or(EditorError::NotLoaded)?;
        f(editor)
    }

    pub async fn open_create(&self) -> Result<(), EditorError> {
        self.with_editor(RuleEditor::open_create).await
    }

    pub async fn open_edit(&self, id: &RuleId) -> Result<(), EditorError> {
        let rule = self
            .synchronizer
            .rule(id)
            .await
            .ok_or_else(|| EditorError::UnknownRule(id.clone()))?;
        self.with_editor(|editor| editor.open_edit(&rule)).await
    }

    pub async fn cancel(&self) -> Result<(), EditorError> {
        self.with_editor(RuleEditor::cancel).await
    }

    /// Validate and persist the open form.
    ///
    /// Validation errors return before any request. On a write failure the
    /// editor goes back to its editing state with the form untouched.
    pub async fn submit(&self) -> Result<Rule, SubmitError> {
        let request = self.with_editor(RuleEditor::begin_submit).await?;

        let outcome = match request {
            SubmitRequest::Create(draft) => self
                .synchronizer
                .create(&draft)
                .await
                .map(|saved| (saved, "New logic saved successfully!")),
            SubmitRequest::Update(id, mut rule) => {
                rule.telegram_enabled = self
                    .synchronizer
                    .telegram_enabled(&id)
                    .await
                    .unwrap_or(false);
                self.synchronizer
                    .update(&id, &rule)
                    .await
                    .map(|saved| (saved, "Logic updated successfully!"))
            }
        };

        match outcome {
            Ok((saved, message)) => {
                self.with_editor(|editor| {
                    editor.finish_saved();
                    Ok(())
                })
                .await?;
                self.notices.success(message);
                if let Err(e) = self.synchronizer.refresh().await {
                    warn!(error = %e, "Rule saved but the list refresh failed");
                }
                Ok(saved)
            }
            Err(e) => {
                self.with_editor(|editor| {
                    editor.restore_after_failure();
                    Ok(())
                })
                .await?;
                self.notices.error("Failed to save rule. Please try again.");
                Err(e.into())
            }
        }
    }

    pub async fn toggle_telegram(&self, id: &RuleId) -> Result<PendingWrite, SyncError> {
        self.synchronizer.toggle_telegram(id).await
    }

    pub async fn delete_rule<P>(&self, id: &RuleId, prompt: &P) -> Result<DeleteOutcome, SyncError>
    where
        P: ConfirmPrompt + ?Sized,
    {
        self.synchronizer.delete_with_confirmation(id, prompt).await
    }
}

//! Rule editor state machine
//!
//! ```text
//! Hidden --open_create--> Creating --begin_submit--> Saving --finish_saved--> Hidden
//! Hidden --open_edit----> Editing  --begin_submit--> Saving --restore-------> Creating | Editing
//! Creating | Editing --cancel--> Hidden
//! ```
//!
//! The form always holds copies: opening an existing rule clones its fields so
//! the canonical list is never touched, and a failed save keeps whatever the
//! user typed.

use std::sync::Arc;

use crate::error::{EditorError, ValidationError};
use crate::models::{
    Condition, Configuration, MacdParams, MacdValue, Operand, OperandKind, Rule, RuleId, Side,
    Timeframe,
};

use super::conditions::{self, ConditionPatch};
use super::validation;

/// Where a save in progress will land
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    Update(RuleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Hidden,
    Creating,
    Editing(RuleId),
    Saving(SaveTarget),
}

/// Editable copy of a rule's user-facing fields
#[derive(Debug, Clone, PartialEq)]
pub struct RuleForm {
    pub name: String,
    pub signal: String,
    pub conditions: Vec<Condition>,
}

impl RuleForm {
    fn blank(config: &Configuration) -> Self {
        Self {
            name: String::new(),
            signal: String::new(),
            conditions: vec![conditions::new_default_condition(config)],
        }
    }
}

/// Network call a validated submit resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    Create(Rule),
    Update(RuleId, Rule),
}

pub struct RuleEditor {
    config: Arc<Configuration>,
    state: EditorState,
    form: RuleForm,
}

impl RuleEditor {
    pub fn new(config: Arc<Configuration>) -> Self {
        let form = RuleForm::blank(&config);
        Self {
            config,
            state: EditorState::Hidden,
            form,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn form(&self) -> &RuleForm {
        &self.form
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditorState::Hidden)
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, EditorState::Saving(_))
    }

    /// Open a blank form seeded with the default crossover condition
    pub fn open_create(&mut self) -> Result<(), EditorError> {
        self.ensure_hidden()?;
        self.form = RuleForm::blank(&self.config);
        self.state = EditorState::Creating;
        Ok(())
    }

    /// Open a copy of an existing rule
    pub fn open_edit(&mut self, rule: &Rule) -> Result<(), EditorError> {
        self.ensure_hidden()?;
        let id = rule.id.clone().ok_or(EditorError::MissingRuleId)?;
        self.form = RuleForm {
            name: rule.name.clone(),
            signal: rule.signal.clone(),
            conditions: rule.conditions.clone(),
        };
        self.state = EditorState::Editing(id);
        Ok(())
    }

    /// Discard the form and hide the editor. No-op when already hidden.
    pub fn cancel(&mut self) -> Result<(), EditorError> {
        if self.is_saving() {
            return Err(EditorError::Saving);
        }
        self.reset();
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.form.name = name.into();
        Ok(())
    }

    pub fn set_signal(&mut self, signal: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.form.signal = signal.into();
        Ok(())
    }

    pub fn add_condition(&mut self) -> Result<(), EditorError> {
        self.ensure_editable()?;
        conditions::add_condition(&mut self.form.conditions, &self.config);
        Ok(())
    }

    pub fn remove_condition(&mut self, index: usize) -> Result<Condition, EditorError> {
        self.ensure_editable()?;
        Ok(conditions::remove_condition(&mut self.form.conditions, index)?)
    }

    pub fn set_condition(&mut self, index: usize, patch: ConditionPatch) -> Result<(), EditorError> {
        self.ensure_editable()?;
        Ok(conditions::set_condition(&mut self.form.conditions, index, patch)?)
    }

    pub fn set_operand_type(
        &mut self,
        index: usize,
        side: Side,
        kind: OperandKind,
    ) -> Result<(), EditorError> {
        let config = self.config.clone();
        self.update_operand(index, side, |operand| {
            Ok(conditions::set_operand_type(operand, kind, &config))
        })
    }

    pub fn set_operand_timeframe(
        &mut self,
        index: usize,
        side: Side,
        timeframe: &Timeframe,
    ) -> Result<(), EditorError> {
        let config = self.config.clone();
        self.update_operand(index, side, |operand| {
            conditions::set_operand_timeframe(operand, timeframe, &config)
        })
    }

    pub fn set_operand_params(
        &mut self,
        index: usize,
        side: Side,
        params: MacdParams,
    ) -> Result<(), EditorError> {
        let config = self.config.clone();
        self.update_operand(index, side, |operand| {
            conditions::set_operand_params(operand, params, &config)
        })
    }

    pub fn set_operand_value(
        &mut self,
        index: usize,
        side: Side,
        value: MacdValue,
    ) -> Result<(), EditorError> {
        let config = self.config.clone();
        self.update_operand(index, side, |operand| {
            conditions::set_operand_value(operand, value, &config)
        })
    }

    pub fn set_operand_offset(
        &mut self,
        index: usize,
        side: Side,
        offset: i32,
    ) -> Result<(), EditorError> {
        self.update_operand(index, side, |operand| {
            conditions::set_operand_offset(operand, offset)
        })
    }

    pub fn set_literal_value(
        &mut self,
        index: usize,
        side: Side,
        value: f64,
    ) -> Result<(), EditorError> {
        self.update_operand(index, side, |operand| {
            conditions::set_literal_value(operand, value)
        })
    }

    /// Validate the form and enter `Saving`.
    ///
    /// The returned rule carries `telegram_enabled = false`; the caller owns
    /// the canonical flag and overwrites it for updates. On a validation
    /// error the state is left untouched.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, EditorError> {
        let target = match &self.state {
            EditorState::Creating => SaveTarget::Create,
            EditorState::Editing(id) => SaveTarget::Update(id.clone()),
            EditorState::Saving(_) => return Err(EditorError::Saving),
            EditorState::Hidden => return Err(EditorError::NotOpen),
        };

        let rule = Rule::draft(
            self.form.name.clone(),
            self.form.signal.clone(),
            self.form.conditions.clone(),
        );
        validation::validate_rule(&rule, &self.config)?;

        let request = match &target {
            SaveTarget::Create => SubmitRequest::Create(rule),
            SaveTarget::Update(id) => SubmitRequest::Update(id.clone(), rule.with_id(id.clone())),
        };
        self.state = EditorState::Saving(target);
        Ok(request)
    }

    /// Save acknowledged: clear the form and hide
    pub fn finish_saved(&mut self) {
        self.reset();
    }

    /// Save rejected: back to the state the submit came from, form intact
    pub fn restore_after_failure(&mut self) {
        if let EditorState::Saving(target) = &self.state {
            self.state = match target {
                SaveTarget::Create => EditorState::Creating,
                SaveTarget::Update(id) => EditorState::Editing(id.clone()),
            };
        }
    }

    fn reset(&mut self) {
        self.form = RuleForm::blank(&self.config);
        self.state = EditorState::Hidden;
    }

    fn ensure_hidden(&self) -> Result<(), EditorError> {
        match self.state {
            EditorState::Hidden => Ok(()),
            EditorState::Saving(_) => Err(EditorError::Saving),
            EditorState::Creating | EditorState::Editing(_) => Err(EditorError::AlreadyOpen),
        }
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        match self.state {
            EditorState::Creating | EditorState::Editing(_) => Ok(()),
            EditorState::Saving(_) => Err(EditorError::Saving),
            EditorState::Hidden => Err(EditorError::NotOpen),
        }
    }

    fn update_operand<F>(&mut self, index: usize, side: Side, f: F) -> Result<(), EditorError>
    where
        F: FnOnce(Operand) -> Result<Operand, ValidationError>,
    {
        self.ensure_editable()?;
        let len = self.form.conditions.len();
        let condition = self
            .form
            .conditions
            .get_mut(index)
            .ok_or(ValidationError::NoSuchCondition { index, len })?;
        let slot = condition.operand_mut(side);
        let updated = f(slot.clone())?;
        *slot = updated;
        Ok(())
    }
}

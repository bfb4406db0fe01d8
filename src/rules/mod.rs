//! Rule authoring: condition list model, shape validation and the editor

pub mod conditions;
pub mod editor;
pub mod validation;

pub use conditions::ConditionPatch;
pub use editor::{EditorState, RuleEditor, RuleForm, SaveTarget, SubmitRequest};
pub use validation::{validate_rule, MAX_LOOKBACK, OFFSET_CHOICES};

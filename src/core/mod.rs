//! Core application primitives (views, synchronizer, poller)

pub mod builder;
pub mod notice;
pub mod poller;
pub mod scheduler;
pub mod synchronizer;

pub use builder::{LoadState, RuleBuilder};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use poller::{
    filter_signals, DashboardSnapshot, PollOutcome, PollPhase, RuleFilter, SignalFilter,
    SignalPoller,
};
pub use scheduler::PollScheduler;
pub use synchronizer::{
    ConfirmPrompt, DeleteOutcome, PendingWrite, RowStatus, RuleSynchronizer, DELETE_PROMPT,
};

//! Sales pipeline: deals, their stage machine, activities, reminders and
//! derived metrics.

mod activity;
mod alerts;
mod deal;
mod lead;
mod metrics;
mod reminder;
mod stage;
mod validation;

pub use self::activity::{ActivityKind, ActivityRecord, DealActivity, NewActivity, UnknownActivityKind};
pub use self::alerts::{alerts_for, AlertKind, AlertPolicy, AlertSeverity, DealAlert};
pub use self::deal::{
    CorruptDealRecord, Deal, DealDraft, DealOutcome, DealPatch, DealPriority, DealRecord,
    DealTransitionError, LossDetails, StageMilestones, StageTransition, TransitionContext,
    UnknownPriority, WonDetails,
};
pub use self::lead::{LeadIntake, PublicLead};
pub use self::metrics::{
    performance_metrics, pipeline_metrics, DateRange, LostReasonShare, PerformanceMetrics,
    PipelineMetrics, StageBreakdown,
};
pub use self::reminder::{
    DealReminder, NewReminder, ReminderAlreadySettled, ReminderRecord, ReminderStatus,
    UnknownReminderStatus,
};
pub use self::stage::{DealStage, UnknownStage};
pub use self::validation::CrmValidationError;

#[cfg(test)]
mod tests;

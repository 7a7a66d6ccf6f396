pub mod action;
pub mod field;
pub mod loaders;
pub mod observation;
pub mod profile;
pub mod run;
pub mod section;

pub use action::{
    ActionTarget, ActionVerb, ExecutionResult, FieldMatch, PlannedAction, ReviewResult,
    TierAttempt,
};
pub use field::{BoundingBox, Button, DomHints, Field, FieldKind, LiveState};
pub use loaders::{load_all_jobs, load_job};
pub use observation::{Blocker, BlockerKind, Observation};
pub use profile::{JobSpec, Profile};
pub use run::{ActionRecord, RunOutcome, RunResult};
pub use section::Section;

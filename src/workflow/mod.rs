//! 填表流程的纯逻辑部分
//!
//! 不直接访问浏览器：页面操作都经由 [`crate::tiers::ExecutionTier`]
//! 和 [`crate::infrastructure::PageSession`] 完成。

pub mod escalation;
pub mod fingerprint;
pub mod navigation;
pub mod planner;
pub mod run_ctx;
pub mod sections;
pub mod verify;

pub use escalation::{execute_with_escalation, EscalationOutcome, EscalationPolicy};
pub use fingerprint::{fingerprint, page_signature};
pub use navigation::NavigationHeuristic;
pub use run_ctx::{Budget, RunContext};
pub use sections::group_sections;

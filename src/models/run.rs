//! 运行结果模型

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::action::{ActionVerb, TierAttempt};

/// 一次运行的最终结局，必定是其中之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Submitted,
    Blocked,
    BudgetExhausted,
    NavigationFailed,
    Stuck,
    PageLimitExceeded,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunOutcome::Submitted => "submitted",
            RunOutcome::Blocked => "blocked",
            RunOutcome::BudgetExhausted => "budget_exhausted",
            RunOutcome::NavigationFailed => "navigation_failed",
            RunOutcome::Stuck => "stuck",
            RunOutcome::PageLimitExceeded => "page_limit_exceeded",
        };
        f.write_str(s)
    }
}

/// 动作日志条目，可供外部回放缓存使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub page: usize,
    pub section: String,
    pub fingerprint: String,
    pub label: String,
    pub verb: ActionVerb,
    pub value: String,
    /// 最终成功的执行层（失败时为最后尝试的层）
    pub tier: Option<String>,
    pub success: bool,
    pub verified: bool,
    pub cost: f64,
    pub history: Vec<TierAttempt>,
}

/// 一次完整页面流程的汇总结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub job_id: String,
    pub success: bool,
    pub outcome: RunOutcome,
    pub pages_processed: usize,
    pub total_cost: f64,
    pub actions_executed: usize,
    pub actions_verified: usize,
    pub actions_failed: usize,
    pub action_log: Vec<ActionRecord>,
    /// 人类可读的停止原因；失败时至少有一条
    pub stop_reasons: Vec<String>,
}

impl RunResult {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            success: false,
            outcome: RunOutcome::NavigationFailed,
            pages_processed: 0,
            total_cost: 0.0,
            actions_executed: 0,
            actions_verified: 0,
            actions_failed: 0,
            action_log: Vec::new(),
            stop_reasons: Vec::new(),
        }
    }

    /// 记录结局与原因
    pub fn finish(&mut self, outcome: RunOutcome, reason: impl Into<String>) {
        self.outcome = outcome;
        self.success = outcome == RunOutcome::Submitted;
        self.stop_reasons.push(reason.into());
    }

    pub fn record(&mut self, record: ActionRecord) {
        self.actions_executed += 1;
        if record.verified {
            self.actions_verified += 1;
        } else {
            self.actions_failed += 1;
        }
        self.action_log.push(record);
    }
}

//! 执行层（Tier）
//!
//! ## 职责
//!
//! 每一层都是一种自动化策略，按成本从低到高排列。编排器只依赖
//! [`ExecutionTier`] 的五个操作以及每层声明的单次动作成本，
//! 从不根据某一层的具体身份做分支。
//!
//! - `DomTier` - 零成本 DOM 脚本
//! - `LlmTier` - DOM 观察 + LLM 匹配，按动作计费

pub mod dom;
pub mod llm;

pub use dom::DomTier;
pub use llm::LlmTier;

use async_trait::async_trait;

use crate::error::{ErrorCategory, TierError, TierResult};
use crate::models::{ExecutionResult, FieldMatch, Observation, PlannedAction, ReviewResult};
use crate::workflow::RunContext;

/// 执行层契约
#[async_trait]
pub trait ExecutionTier: Send + Sync {
    /// 层名称，仅用于日志和动作记录
    fn name(&self) -> &str;

    /// 单次动作的固定成本（美元）
    fn cost_per_action(&self) -> f64;

    /// 是否依赖外部推理服务，仅用于规划和统计
    fn requires_inference(&self) -> bool;

    /// 观察当前页面
    async fn observe(&self, ctx: &RunContext) -> TierResult<Observation>;

    /// 把观察中的字段匹配到档案数据
    async fn match_fields(
        &self,
        ctx: &RunContext,
        observation: &Observation,
    ) -> TierResult<Vec<FieldMatch>>;

    /// 执行动作（有副作用），返回与 `actions` 一一对应的结果
    async fn execute(
        &self,
        ctx: &RunContext,
        actions: &[PlannedAction],
    ) -> TierResult<Vec<ExecutionResult>>;

    /// 只读校验，不得修改页面
    async fn review(
        &self,
        ctx: &RunContext,
        actions: &[PlannedAction],
        results: &[ExecutionResult],
    ) -> TierResult<Vec<ReviewResult>>;

    /// 把错误归入统一分类
    fn classify_error(&self, err: &TierError) -> ErrorCategory {
        if err.category != ErrorCategory::Unknown {
            return err.category;
        }
        classify_message(&err.message)
    }
}

/// 根据错误文本推断分类，供各层共用
pub fn classify_message(message: &str) -> ErrorCategory {
    let msg = message.to_ascii_lowercase();
    if let Some(code) = msg.split(':').next() {
        let category = ErrorCategory::from_code(code);
        if category != ErrorCategory::Unknown {
            return category;
        }
    }

    if msg.contains("websocket")
        || msg.contains("connection closed")
        || msg.contains("target closed")
        || msg.contains("session closed")
        || msg.contains("channel")
    {
        ErrorCategory::BrowserDisconnected
    } else if msg.contains("timeout") || msg.contains("timed out") {
        ErrorCategory::Timeout
    } else if msg.contains("not found") || msg.contains("no node") {
        ErrorCategory::ElementNotFound
    } else if msg.contains("not visible") || msg.contains("hidden") {
        ErrorCategory::ElementNotVisible
    } else if msg.contains("not interactable")
        || msg.contains("disabled")
        || msg.contains("intercept")
    {
        ErrorCategory::ElementNotInteractable
    } else if msg.contains("captcha") {
        ErrorCategory::BlockerDetected
    } else {
        ErrorCategory::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_script_error_codes() {
        assert_eq!(
            classify_message("element_not_found: #email"),
            ErrorCategory::ElementNotFound
        );
        assert_eq!(
            classify_message("value_mismatch: expected 'Ada'"),
            ErrorCategory::ValueMismatch
        );
    }

    #[test]
    fn test_classify_cdp_messages() {
        assert_eq!(
            classify_message("WebSocket protocol error: Connection reset"),
            ErrorCategory::BrowserDisconnected
        );
        assert_eq!(
            classify_message("Request timed out."),
            ErrorCategory::Timeout
        );
        assert_eq!(
            classify_message("Element is disabled"),
            ErrorCategory::ElementNotInteractable
        );
        assert_eq!(classify_message("weird"), ErrorCategory::Unknown);
    }
}

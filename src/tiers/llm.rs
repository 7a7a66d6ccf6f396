//! LLM 层 - 按动作计费
//!
//! 观察仍走 DOM 脚本；匹配交给 LLM，能处理标签不规范的字段。
//! 执行前重新观察页面，按指纹或标签重新定位目标，
//! 因此对重新渲染过的页面比 DOM 层更稳健。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ErrorCategory, TierError, TierResult};
use crate::infrastructure::{dom_scripts, JsExecutor};
use crate::models::{
    ActionTarget, ExecutionResult, FieldMatch, Observation, PlannedAction, ReviewResult,
};
use crate::services::llm_service::{LlmFieldMatch, LlmService};
use crate::tiers::{dom::review_by_read_back, ExecutionTier};
use crate::workflow::fingerprint::{button_fingerprint, fingerprint, normalize_label};
use crate::workflow::RunContext;

/// LLM 层
pub struct LlmTier {
    executor: JsExecutor,
    service: Arc<LlmService>,
    cost_per_action: f64,
}

impl LlmTier {
    pub fn new(executor: JsExecutor, service: Arc<LlmService>, cost_per_action: f64) -> Self {
        Self {
            executor,
            service,
            cost_per_action: cost_per_action.max(0.0),
        }
    }
}

#[async_trait]
impl ExecutionTier for LlmTier {
    fn name(&self) -> &str {
        "llm"
    }

    fn cost_per_action(&self) -> f64 {
        self.cost_per_action
    }

    fn requires_inference(&self) -> bool {
        true
    }

    async fn observe(&self, _ctx: &RunContext) -> TierResult<Observation> {
        dom_scripts::observe(&self.executor).await
    }

    async fn match_fields(
        &self,
        ctx: &RunContext,
        observation: &Observation,
    ) -> TierResult<Vec<FieldMatch>> {
        let raw = self
            .service
            .match_fields(&observation.fields, &ctx.profile)
            .await
            .map_err(|e| service_error(&e))?;

        let matches = resolve_matches(observation, ctx, raw);
        info!(
            "{} 🤖 LLM ({}) 匹配到 {} 个字段",
            ctx,
            self.service.model_name(),
            matches.len()
        );
        Ok(matches)
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        actions: &[PlannedAction],
    ) -> TierResult<Vec<ExecutionResult>> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let started = Instant::now();
            let fresh = dom_scripts::observe(&self.executor).await?;

            let Some(target) = relocate(&fresh, &action.target) else {
                results.push(ExecutionResult::failed(
                    self.cost_per_action,
                    started.elapsed(),
                    TierError::not_found(format!("重新观察后找不到 '{}'", action.target.label())),
                ));
                continue;
            };

            let mut relocated = action.clone();
            relocated.target = target;

            match dom_scripts::perform(&self.executor, &relocated).await {
                Ok(()) => results.push(ExecutionResult::ok(self.cost_per_action, started.elapsed())),
                Err(e) if e.is_session_fatal() => return Err(e),
                Err(e) => {
                    debug!("{} LLM 层动作失败 '{}': {}", ctx, action.target.label(), e);
                    results.push(ExecutionResult::failed(self.cost_per_action, started.elapsed(), e));
                }
            }
        }
        Ok(results)
    }

    async fn review(
        &self,
        _ctx: &RunContext,
        actions: &[PlannedAction],
        results: &[ExecutionResult],
    ) -> TierResult<Vec<ReviewResult>> {
        review_by_read_back(&self.executor, actions, results, 0.0).await
    }
}

/// LLM 服务的失败与浏览器会话无关，只会归为超时或未知
fn service_error(err: &anyhow::Error) -> TierError {
    let message = format!("{:#}", err);
    let lower = message.to_ascii_lowercase();
    let category = if lower.contains("timeout") || lower.contains("timed out") {
        ErrorCategory::Timeout
    } else {
        ErrorCategory::Unknown
    };
    TierError::new(category, message)
}

/// 把 LLM 的原始结果对应回观察中的字段
///
/// 未知字段与未知档案键会被丢弃；LLM 没给出值时使用档案中的值。
fn resolve_matches(observation: &Observation, ctx: &RunContext, raw: Vec<LlmFieldMatch>) -> Vec<FieldMatch> {
    raw.into_iter()
        .filter_map(|m| {
            let field = observation.fields.iter().find(|f| f.id == m.field_id)?;
            let profile_value = ctx.profile.get(&m.profile_key)?;
            let value = m
                .value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| profile_value.to_string());
            Some(FieldMatch {
                field: field.clone(),
                profile_key: m.profile_key,
                value,
                confidence: m.confidence,
                method: "llm".to_string(),
            })
        })
        .collect()
}

/// 在新的观察中重新定位目标：先按指纹，再按标签
fn relocate(observation: &Observation, target: &ActionTarget) -> Option<ActionTarget> {
    match target {
        ActionTarget::Field(field) => {
            let fp = fingerprint(field);
            let label = normalize_label(&field.label);
            observation
                .fields
                .iter()
                .find(|f| fingerprint(f) == fp)
                .or_else(|| {
                    observation
                        .fields
                        .iter()
                        .find(|f| f.is_actionable() && !label.is_empty() && normalize_label(&f.label) == label)
                })
                .cloned()
                .map(ActionTarget::Field)
        }
        ActionTarget::Button(button) => {
            let fp = button_fingerprint(button);
            let label = normalize_label(&button.label);
            observation
                .buttons
                .iter()
                .find(|b| button_fingerprint(b) == fp)
                .or_else(|| {
                    observation
                        .buttons
                        .iter()
                        .find(|b| b.is_enabled() && !label.is_empty() && normalize_label(&b.label) == label)
                })
                .cloned()
                .map(ActionTarget::Button)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Button, DomHints, Field};

    fn field(id: &str, label: &str) -> Field {
        Field {
            id: id.to_string(),
            selector: format!("[data-af-idx=\"{}\"]", id),
            label: label.to_string(),
            hints: DomHints {
                depth: 4,
                sibling_index: 1,
                container: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_relocate_field_by_label_after_rerender() {
        let old = field("3", "Email");
        let mut moved = field("7", "Email");
        moved.hints.depth = 6;
        let observation = Observation {
            fields: vec![field("1", "Name"), moved],
            ..Default::default()
        };

        let target = relocate(&observation, &ActionTarget::Field(old)).unwrap();
        assert_eq!(target.as_field().unwrap().id, "7");
    }

    #[test]
    fn test_relocate_button_missing() {
        let button = Button {
            id: "b1".to_string(),
            label: "Next".to_string(),
            ..Default::default()
        };
        assert!(relocate(&Observation::default(), &ActionTarget::Button(button)).is_none());
    }

    #[test]
    fn test_service_failures_never_end_the_session() {
        let closed = anyhow::anyhow!("error sending request: connection closed before message completed");
        let err = service_error(&closed);
        assert_eq!(err.category, ErrorCategory::Unknown);
        assert!(!err.is_session_fatal());

        let channel = anyhow::anyhow!("LLM API调用失败 (模型: gpt-4o-mini): channel closed");
        assert!(!service_error(&channel).is_session_fatal());

        let slow = anyhow::anyhow!("operation timed out");
        assert_eq!(service_error(&slow).category, ErrorCategory::Timeout);
    }
}

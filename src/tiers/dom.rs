//! DOM 脚本层 - 零成本
//!
//! 观察、动作和回读都直接在页面里执行 JS；匹配只看标签、name 属性
//! 和一张同义词表，不依赖外部推理服务。

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use crate::error::TierResult;
use crate::infrastructure::{dom_scripts, JsExecutor};
use crate::models::{
    ActionTarget, ExecutionResult, Field, FieldKind, FieldMatch, Observation, PlannedAction,
    Profile, ReviewResult,
};
use crate::tiers::ExecutionTier;
use crate::workflow::verify::values_match;
use crate::workflow::RunContext;

/// 标签同义词 → 档案键
const SYNONYMS: &[(&str, &str)] = &[
    ("given name", "first_name"),
    ("forename", "first_name"),
    ("surname", "last_name"),
    ("family name", "last_name"),
    ("e-mail", "email"),
    ("email address", "email"),
    ("mobile", "phone"),
    ("telephone", "phone"),
    ("phone number", "phone"),
    ("zip", "postal_code"),
    ("postcode", "postal_code"),
    ("linkedin", "linkedin_url"),
    ("website", "website_url"),
    ("portfolio", "website_url"),
];

/// DOM 脚本层
pub struct DomTier {
    executor: JsExecutor,
}

impl DomTier {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ExecutionTier for DomTier {
    fn name(&self) -> &str {
        "dom"
    }

    fn cost_per_action(&self) -> f64 {
        0.0
    }

    fn requires_inference(&self) -> bool {
        false
    }

    async fn observe(&self, _ctx: &RunContext) -> TierResult<Observation> {
        dom_scripts::observe(&self.executor).await
    }

    async fn match_fields(
        &self,
        ctx: &RunContext,
        observation: &Observation,
    ) -> TierResult<Vec<FieldMatch>> {
        Ok(match_by_label(&observation.fields, &ctx.profile))
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        actions: &[PlannedAction],
    ) -> TierResult<Vec<ExecutionResult>> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let started = Instant::now();
            match dom_scripts::perform(&self.executor, action).await {
                Ok(()) => results.push(ExecutionResult::ok(0.0, started.elapsed())),
                Err(e) if e.is_session_fatal() => return Err(e),
                Err(e) => {
                    debug!("{} DOM 动作失败 '{}': {}", ctx, action.target.label(), e);
                    results.push(ExecutionResult::failed(0.0, started.elapsed(), e));
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

/// 回读校验，DOM 层与 LLM 层共用
pub(crate) async fn review_by_read_back(
    executor: &JsExecutor,
    actions: &[PlannedAction],
    results: &[ExecutionResult],
    cost: f64,
) -> TierResult<Vec<ReviewResult>> {
    let mut reviews = Vec::with_capacity(actions.len());
    for (action, result) in actions.iter().zip(results) {
        if !result.success {
            reviews.push(ReviewResult::mismatch(&action.value, None, "execute 未成功", cost));
            continue;
        }
        let field = match &action.target {
            ActionTarget::Field(f) => f,
            ActionTarget::Button(_) => {
                reviews.push(ReviewResult::passed("", "", cost));
                continue;
            }
        };
        let actual = dom_scripts::read_value(executor, field).await?;
        if values_match(action.verb, &action.value, actual.as_deref()) {
            reviews.push(ReviewResult::passed(&action.value, actual.unwrap_or_default(), cost));
        } else {
            reviews.push(ReviewResult::mismatch(
                &action.value,
                actual,
                format!("回读值与期望不一致: '{}'", field.label),
                cost,
            ));
        }
    }
    Ok(reviews)
}

/// 按标签把字段匹配到档案键
///
/// 置信度：标签精确 0.95，name 属性 0.9，同义词 0.85，部分包含 0.7。
/// 下拉框的目标值不在选项中时降到 0.5，交给更贵的层处理。
pub fn match_by_label(fields: &[Field], profile: &Profile) -> Vec<FieldMatch> {
    let mut matches = Vec::new();

    for field in fields {
        let label = normalize_key(&field.label);
        let name = field.name.as_deref().map(normalize_key).unwrap_or_default();

        let mut best: Option<(&str, f64, &str)> = None;
        for key in profile.keys() {
            let k = normalize_key(key);
            if k.is_empty() {
                continue;
            }
            let candidate = if !label.is_empty() && label == k {
                Some((0.95, "label_exact"))
            } else if !name.is_empty() && name == k {
                Some((0.9, "name_attr"))
            } else if SYNONYMS
                .iter()
                .any(|(syn, target)| *target == key && label.contains(syn))
            {
                Some((0.85, "synonym"))
            } else if !label.is_empty()
                && (label.contains(&k) || (k.contains(&label) && label.len() > 3))
            {
                Some((0.7, "label_partial"))
            } else {
                None
            };

            if let Some((confidence, method)) = candidate {
                if best.map_or(true, |(_, c, _)| confidence > c) {
                    best = Some((key, confidence, method));
                }
            }
        }

        let Some((key, mut confidence, method)) = best else {
            continue;
        };
        let Some(value) = profile.get(key) else {
            continue;
        };

        if matches!(field.kind, FieldKind::Select | FieldKind::Radio)
            && !field.options.is_empty()
            && !field
                .options
                .iter()
                .any(|o| o.to_lowercase().contains(&value.to_lowercase()))
        {
            confidence = confidence.min(0.5);
        }

        matches.push(FieldMatch {
            field: field.clone(),
            profile_key: key.to_string(),
            value: value.to_string(),
            confidence,
            method: method.to_string(),
        });
    }

    matches
}

fn normalize_key(text: &str) -> String {
    text.to_lowercase()
        .replace(['_', '-'], " ")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

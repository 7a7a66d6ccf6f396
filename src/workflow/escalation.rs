//! 升级执行
//!
//! 从动作被分配的层开始，沿阶梯逐层尝试：
//! 每层最多 `max_attempts_per_tier` 次，每次先 execute，execute 成功后再 review，
//! 两者都成功才算成功。失败归类后，若属于快速升级集合则立即放弃本层剩余次数。
//! 每次尝试的费用都立即从预算扣除并累计到返回的费用中。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::slice;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ErrorCategory, TierError};
use crate::models::{PlannedAction, TierAttempt};
use crate::tiers::ExecutionTier;
use crate::workflow::RunContext;

/// 升级策略（不可变配置）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// 层的顺序（按名称）；为空时使用注册顺序并按成本排序
    pub tier_order: Vec<String>,
    /// 每层最多尝试次数
    pub max_attempts_per_tier: u32,
    /// 出现这些错误时不在本层重试，直接升级
    pub fast_escalation: HashSet<ErrorCategory>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            tier_order: Vec::new(),
            max_attempts_per_tier: 2,
            fast_escalation: [
                ErrorCategory::ElementNotFound,
                ErrorCategory::ElementNotInteractable,
                ErrorCategory::NavigationFailed,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl EscalationPolicy {
    /// 按策略顺序解析出实际可用的阶梯
    ///
    /// 策略中未注册的层会被忽略，因此阶梯中的每一项都真实存在。
    pub fn resolve_ladder(&self, tiers: &[Arc<dyn ExecutionTier>]) -> Vec<Arc<dyn ExecutionTier>> {
        if self.tier_order.is_empty() {
            let mut ladder: Vec<Arc<dyn ExecutionTier>> = tiers.to_vec();
            ladder.sort_by(|a, b| a.cost_per_action().total_cmp(&b.cost_per_action()));
            return ladder;
        }

        self.tier_order
            .iter()
            .filter_map(|name| tiers.iter().find(|t| t.name() == name).cloned())
            .collect()
    }
}

/// 升级执行的结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EscalationOutcome {
    pub success: bool,
    /// 成功（或最后一次尝试）所在的阶梯位置
    pub tier: Option<usize>,
    /// 所有尝试的费用总和
    pub cost: f64,
    pub last_error: Option<TierError>,
}

/// 带升级地执行单个动作
///
/// 只有会话致命错误和预算耗尽会以 `Err` 返回，其余失败体现在结果中。
pub async fn execute_with_escalation(
    ladder: &[Arc<dyn ExecutionTier>],
    policy: &EscalationPolicy,
    ctx: &mut RunContext,
    action: &mut PlannedAction,
) -> Result<EscalationOutcome, TierError> {
    let mut outcome = EscalationOutcome::default();
    let start = action.tier.min(ladder.len().saturating_sub(1));

    for (pos, tier) in ladder.iter().enumerate().skip(start) {
        for attempt in 1..=policy.max_attempts_per_tier {
            let projected = tier.cost_per_action();
            if !ctx.budget.can_afford(projected) {
                warn!(
                    "{} 💸 预算不足以在 {} 层执行 '{}' (需要 ${:.4}, 剩余 ${:.4})",
                    ctx,
                    tier.name(),
                    action.target.label(),
                    projected,
                    ctx.budget.remaining()
                );
                return Err(TierError::budget_exceeded(projected, ctx.budget.remaining()));
            }

            action.tier = pos;
            action.attempts += 1;
            outcome.tier = Some(pos);

            let (cost, result) = attempt_once(tier.as_ref(), ctx, action).await;
            ctx.budget.charge(cost);
            outcome.cost += cost;

            let error = match result {
                Ok(()) => {
                    record_attempt(action, tier.name(), attempt, true, cost, None);
                    debug!(
                        "{} ✓ '{}' 在 {} 层第 {} 次尝试成功",
                        ctx,
                        action.target.label(),
                        tier.name(),
                        attempt
                    );
                    outcome.success = true;
                    outcome.last_error = None;
                    return Ok(outcome);
                }
                Err(e) => e,
            };

            let category = tier.classify_error(&error);
            record_attempt(action, tier.name(), attempt, false, cost, Some((category, &error)));

            if category.is_session_fatal() || category == ErrorCategory::BudgetExceeded {
                return Err(TierError::new(category, error.message));
            }

            debug!(
                "{} '{}' 在 {} 层第 {} 次尝试失败: {}",
                ctx,
                action.target.label(),
                tier.name(),
                attempt,
                error
            );
            outcome.last_error = Some(TierError::new(category, error.message));

            if policy.fast_escalation.contains(&category) {
                debug!("{} ⏫ {} 属于快速升级类别，跳过 {} 层剩余尝试", ctx, category, tier.name());
                break;
            }
        }
    }

    Ok(outcome)
}

/// 单次尝试：execute，成功后 review。返回本次费用与是否成功
async fn attempt_once(
    tier: &dyn ExecutionTier,
    ctx: &RunContext,
    action: &PlannedAction,
) -> (f64, Result<(), TierError>) {
    let actions = slice::from_ref(action);

    let exec = match tier.execute(ctx, actions).await {
        Ok(results) => match results.into_iter().next() {
            Some(r) => r,
            None => {
                return (
                    tier.cost_per_action(),
                    Err(TierError::new(ErrorCategory::Unknown, "execute 没有返回结果")),
                )
            }
        },
        // 抛出异常的调用按声明成本计费
        Err(e) => return (tier.cost_per_action(), Err(e)),
    };

    let mut cost = exec.cost;
    if !exec.success {
        let error = exec
            .error
            .unwrap_or_else(|| TierError::new(ErrorCategory::Unknown, "execute 报告失败"));
        return (cost, Err(error));
    }

    let review = match tier.review(ctx, actions, slice::from_ref(&exec)).await {
        Ok(reviews) => reviews.into_iter().next(),
        Err(e) => return (cost, Err(e)),
    };

    match review {
        Some(r) => {
            cost += r.cost;
            if r.success {
                (cost, Ok(()))
            } else {
                let reason = r.reason.unwrap_or_else(|| {
                    format!("期望 '{}'，实际 {:?}", r.expected, r.actual)
                });
                (cost, Err(TierError::new(ErrorCategory::ValueMismatch, reason)))
            }
        }
        None => (
            cost,
            Err(TierError::new(ErrorCategory::Unknown, "review 没有返回结果")),
        ),
    }
}

fn record_attempt(
    action: &mut PlannedAction,
    tier: &str,
    attempt: u32,
    success: bool,
    cost: f64,
    error: Option<(ErrorCategory, &TierError)>,
) {
    action.history.push(TierAttempt {
        tier: tier.to_string(),
        attempt,
        success,
        cost,
        category: error.map(|(c, _)| c),
        message: error.map(|(_, e)| e.message.clone()),
    });
}

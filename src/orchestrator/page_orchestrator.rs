//! 页面编排器 - 编排层
//!
//! ## 职责
//!
//! 从入口页一直走到提交确认，一次运行只操作一个页面句柄，全程顺序执行。
//!
//! ## 每页流程
//!
//! 1. 用最便宜的层观察页面，检查卡死与阻断
//! 2. 从最新的观察分区，跳过已填满或已处理的分区
//! 3. 每个分区：实时状态复查 → 逐层匹配 → 规划 → 升级执行 → 定点回读
//! 4. 分区产生了校验通过的填写时，重新观察以发现新出现的条件字段
//! 5. 终点页则点击提交并轮询确认，否则点击翻页并轮询确认
//!
//! 运行只会以一个 [`RunOutcome`] 结束；会话断开以 `Err` 返回。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ErrorCategory, RunError, TierError};
use crate::models::{
    ActionRecord, ActionTarget, Button, Field, FieldMatch, Observation, PlannedAction, RunOutcome, RunResult,
};
use crate::tiers::ExecutionTier;
use crate::utils::logging::truncate_text;
use crate::workflow::escalation::{execute_with_escalation, EscalationPolicy};
use crate::workflow::fingerprint::{button_fingerprint, field_tokens, fingerprint, page_signature};
use crate::workflow::navigation::{
    detect_terminal_page, find_submit_button, navigation_candidates, turnover, NavigationHeuristic,
};
use crate::workflow::planner::{merge_matches, plan_actions};
use crate::workflow::sections::group_sections;
use crate::workflow::verify::values_match;
use crate::workflow::RunContext;

/// 轮询参数：最多 `attempts` 次，每次之前等待 `interval`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(500),
        }
    }
}

/// 编排器配置
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// 页数硬上限
    pub max_pages: usize,
    /// 连续多少次页面签名不变视为卡死
    pub stuck_threshold: usize,
    /// 条件字段发现的最大轮数
    pub max_discovery_passes: usize,
    /// 参与匹配的层数（从最便宜的开始）
    pub max_match_tiers: usize,
    pub submit_poll: PollSettings,
    pub navigation_poll: PollSettings,
    pub navigation: NavigationHeuristic,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_pages: 15,
            stuck_threshold: 3,
            max_discovery_passes: 3,
            max_match_tiers: 2,
            submit_poll: PollSettings::default(),
            navigation_poll: PollSettings::default(),
            navigation: NavigationHeuristic::default(),
        }
    }
}

/// 结束本次运行的原因（包括提交成功）
enum Halt {
    Finish(RunOutcome, String),
    SessionLost(TierError),
}

impl Halt {
    /// 把层错误转换为停止原因，`context` 描述出错的步骤
    fn from_tier(err: TierError, context: &str) -> Self {
        match err.category {
            c if c.is_session_fatal() => Halt::SessionLost(err),
            ErrorCategory::BudgetExceeded => {
                Halt::Finish(RunOutcome::BudgetExhausted, format!("{}: {}", context, err))
            }
            ErrorCategory::BlockerDetected => {
                Halt::Finish(RunOutcome::Blocked, format!("{}: {}", context, err))
            }
            _ => Halt::Finish(RunOutcome::NavigationFailed, format!("{}: {}", context, err)),
        }
    }
}

/// 点击后的确认方式
enum Confirmation {
    Submit {
        url_before: String,
    },
    Navigation {
        url_before: String,
        tokens_before: HashMap<String, usize>,
    },
}

/// 翻页与提交动作在动作日志中的分区名
const NAVIGATION_SECTION: &str = "navigation";

/// 单页处理结果
enum PageStep {
    /// 已确认离开当前页
    Advanced,
    /// 点击了翻页但未能确认，交给卡死检测决定
    Unconfirmed,
}

/// 一次运行的可变状态
struct RunState {
    result: RunResult,
    /// 本次运行中是否有过校验通过的填写
    any_verified_fill: bool,
    last_signature: Option<String>,
    unchanged: usize,
}

/// 页面编排器
pub struct PageOrchestrator {
    ladder: Vec<Arc<dyn ExecutionTier>>,
    policy: EscalationPolicy,
    config: OrchestratorConfig,
}

impl PageOrchestrator {
    /// 按策略解析阶梯；没有可用层时返回 `RunError::NoTiers`
    pub fn new(
        tiers: &[Arc<dyn ExecutionTier>],
        policy: EscalationPolicy,
        config: OrchestratorConfig,
    ) -> Result<Self, RunError> {
        let ladder = policy.resolve_ladder(tiers);
        if ladder.is_empty() {
            return Err(RunError::NoTiers);
        }
        Ok(Self {
            ladder,
            policy,
            config,
        })
    }

    /// 解析后的阶梯，位置 0 最便宜
    pub fn ladder(&self) -> &[Arc<dyn ExecutionTier>] {
        &self.ladder
    }

    /// 运行完整的页面流程
    pub async fn run(&self, ctx: &mut RunContext) -> Result<RunResult, RunError> {
        let mut state = RunState {
            result: RunResult::new(&ctx.job_id),
            any_verified_fill: false,
            last_signature: None,
            unchanged: 0,
        };

        info!(
            "{} 🚀 开始运行，预算 ${:.4}，阶梯: {}",
            ctx,
            ctx.budget.remaining(),
            ladder_summary(&self.ladder)
        );

        let halt = if ctx.budget.is_exhausted() {
            Some(Halt::Finish(
                RunOutcome::BudgetExhausted,
                "开始时预算已耗尽".to_string(),
            ))
        } else {
            self.run_pages(ctx, &mut state).await
        };

        match halt {
            Some(Halt::Finish(outcome, reason)) => state.result.finish(outcome, reason),
            Some(Halt::SessionLost(err)) => {
                warn!("{} 🔌 浏览器会话已断开: {}", ctx, err);
                return Err(RunError::SessionLost(err));
            }
            None => state.result.finish(
                RunOutcome::PageLimitExceeded,
                format!("超过页数上限 {}", self.config.max_pages),
            ),
        }

        state.result.total_cost = ctx.budget.spent();
        log_run_finished(ctx, &state.result);
        Ok(state.result)
    }

    /// 逐页循环，返回 `None` 表示达到页数上限
    async fn run_pages(&self, ctx: &mut RunContext, state: &mut RunState) -> Option<Halt> {
        for page in 1..=self.config.max_pages {
            state.result.pages_processed = page;
            match self.process_page(ctx, state, page).await {
                Ok(PageStep::Advanced) => info!("{} ➡️ 第 {} 页完成，已翻页", ctx, page),
                Ok(PageStep::Unconfirmed) => warn!("{} ⚠️ 第 {} 页翻页未确认", ctx, page),
                Err(halt) => return Some(halt),
            }
        }
        None
    }

    async fn process_page(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
    ) -> Result<PageStep, Halt> {
        let observation = self.observe(ctx).await?;

        let signature = page_signature(&observation);
        if state.last_signature.as_deref() == Some(signature.as_str()) {
            state.unchanged += 1;
            debug!("{} 页面签名未变化 ({} 次)", ctx, state.unchanged);
            if state.unchanged >= self.config.stuck_threshold {
                return Err(Halt::Finish(
                    RunOutcome::Stuck,
                    format!("页面连续 {} 次没有变化: {}", state.unchanged, observation.url),
                ));
            }
        } else {
            state.unchanged = 0;
            state.last_signature = Some(signature);
        }

        info!(
            "{} 📄 第 {} 页: {} ({} 个字段, {} 个按钮)",
            ctx,
            page,
            observation.url,
            observation.fields.len(),
            observation.buttons.len()
        );

        let mut known: HashSet<String> = observation.fields.iter().map(fingerprint).collect();
        let mut handled: HashSet<String> = HashSet::new();
        let mut latest = observation;

        // 扫描索引每次观察都会重新分配，分区总是从最新的观察构建，已处理的指纹不再重复
        while let Some((section, pending)) = next_section(&latest, &handled) {
            handled.extend(pending.iter().map(fingerprint));
            let verified = self
                .process_section(ctx, state, page, &section, pending, &latest)
                .await?;
            if verified > 0 {
                let fresh = self
                    .discover_conditional_fields(ctx, state, page, &section, &mut known, &mut handled)
                    .await?;
                if let Some(fresh) = fresh {
                    latest = fresh;
                }
            }
        }

        // 填写可能改变了按钮状态，重新观察后再判断终点页
        let current = self.observe(ctx).await?;
        if detect_terminal_page(&current.buttons, state.any_verified_fill) {
            return self.submit(ctx, state, page, &current).await;
        }
        self.navigate(ctx, state, page, &current).await
    }

    /// 用最便宜的层观察页面：先做预算投影，观察后立即扣费，发现阻断即停止
    async fn observe(&self, ctx: &mut RunContext) -> Result<Observation, Halt> {
        let tier = &self.ladder[0];
        let projected = tier.cost_per_action();
        if !ctx.budget.can_afford(projected) {
            return Err(Halt::Finish(
                RunOutcome::BudgetExhausted,
                format!(
                    "预算不足以观察页面 (需要 ${:.4}, 剩余 ${:.4})",
                    projected,
                    ctx.budget.remaining()
                ),
            ));
        }

        let observation = tier
            .observe(ctx)
            .await
            .map_err(|e| Halt::from_tier(e, "观察页面失败"))?;
        ctx.budget.charge(observation.cost);

        if !observation.blockers.is_empty() {
            let kinds: Vec<String> = observation
                .blockers
                .iter()
                .map(|b| format!("{} ({})", b.kind, b.detail))
                .collect();
            warn!("{} 🛑 检测到阻断: {}", ctx, kinds.join(", "));
            return Err(Halt::Finish(
                RunOutcome::Blocked,
                format!("检测到阻断: {}", kinds.join(", ")),
            ));
        }

        Ok(observation)
    }

    /// 处理一个分区中待填的字段，返回校验通过的填写数
    ///
    /// `fields` 必须来自 `observation`。
    async fn process_section(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
        section: &str,
        fields: Vec<Field>,
        observation: &Observation,
    ) -> Result<usize, Halt> {
        let session = ctx.session.clone();
        let mut live = Vec::new();
        for field in fields {
            let live_state = session.live_state(&field).await;
            match live_state {
                Ok(Some(s)) if s.visible && s.enabled => live.push(field),
                Ok(_) => debug!("{} 字段 '{}' 已隐藏或禁用，本轮跳过", ctx, field.label),
                Err(e) if e.is_session_fatal() => return Err(Halt::SessionLost(e)),
                Err(e) => debug!("{} 字段 '{}' 状态复查失败: {}", ctx, field.label, e),
            }
        }

        if live.is_empty() {
            return Ok(0);
        }

        debug!("{} 分区 '{}': {} 个待填字段", ctx, section, live.len());
        self.fill_fields(ctx, state, page, section, live, observation)
            .await
    }

    /// 匹配 → 规划 → 升级执行 → 定点回读，返回校验通过的填写数
    async fn fill_fields(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
        section: &str,
        fields: Vec<Field>,
        observation: &Observation,
    ) -> Result<usize, Halt> {
        let matches = self.match_fields(ctx, fields, observation).await?;
        if matches.is_empty() {
            debug!("{} 分区 '{}' 没有匹配到任何字段", ctx, section);
            return Ok(0);
        }

        let session = ctx.session.clone();
        let mut verified_count = 0;

        for mut action in plan_actions(&matches, self.ladder.len()) {
            let escalation = execute_with_escalation(&self.ladder, &self.policy, ctx, &mut action).await;

            let outcome = match escalation {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.record(state, page, section, &action, None, false, false);
                    return Err(Halt::from_tier(e, "执行动作失败"));
                }
            };

            let mut verified = false;
            if outcome.success {
                if let Some(field) = action.target.as_field() {
                    match session.read_value(field).await {
                        Ok(actual) => {
                            verified = values_match(action.verb, &action.value, actual.as_deref())
                        }
                        Err(e) if e.is_session_fatal() => return Err(Halt::SessionLost(e)),
                        Err(e) => debug!("{} 回读 '{}' 失败: {}", ctx, field.label, e),
                    }
                }
            }

            if verified {
                verified_count += 1;
                state.any_verified_fill = true;
                info!(
                    "{} ✓ {} = '{}'",
                    ctx,
                    action.target.label(),
                    truncate_text(&action.value, 40)
                );
            } else {
                warn!(
                    "{} ✗ '{}' 未能完成: {}",
                    ctx,
                    action.target.label(),
                    outcome
                        .last_error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "回读值不一致".to_string())
                );
            }

            self.record(state, page, section, &action, outcome.tier, outcome.success, verified);
        }

        Ok(verified_count)
    }

    /// 从最便宜的层开始匹配；后面的层只处理前面没匹配上的字段
    async fn match_fields(
        &self,
        ctx: &mut RunContext,
        fields: Vec<Field>,
        observation: &Observation,
    ) -> Result<Vec<FieldMatch>, Halt> {
        let wanted: HashSet<String> = fields.iter().map(fingerprint).collect();
        let mut merged: Vec<FieldMatch> = Vec::new();

        for tier in self.ladder.iter().take(self.config.max_match_tiers.max(1)) {
            let matched: HashSet<String> = merged.iter().map(|m| fingerprint(&m.field)).collect();
            let remaining: Vec<Field> = fields
                .iter()
                .filter(|f| !matched.contains(&fingerprint(f)))
                .cloned()
                .collect();
            if remaining.is_empty() {
                break;
            }

            let cost = tier.cost_per_action();
            if !ctx.budget.can_afford(cost) {
                debug!("{} 预算不足，跳过 {} 层匹配", ctx, tier.name());
                break;
            }

            let subset = observation.with_fields(remaining);
            let result = tier.match_fields(ctx, &subset).await;
            ctx.budget.charge(cost);

            match result {
                Ok(found) => {
                    let found: Vec<FieldMatch> = found
                        .into_iter()
                        .filter(|m| wanted.contains(&fingerprint(&m.field)))
                        .collect();
                    debug!("{} {} 层匹配到 {} 个字段", ctx, tier.name(), found.len());
                    merge_matches(&mut merged, found);
                }
                Err(e) if e.is_session_fatal() => return Err(Halt::SessionLost(e)),
                Err(e) => warn!("{} {} 层匹配失败: {}", ctx, tier.name(), e),
            }
        }

        Ok(merged)
    }

    /// 重新观察并处理新出现的条件字段，某一轮没有校验通过的填写即停止
    ///
    /// 返回最后一次观察；新出现的字段记入 `handled`。
    async fn discover_conditional_fields(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
        section: &str,
        known: &mut HashSet<String>,
        handled: &mut HashSet<String>,
    ) -> Result<Option<Observation>, Halt> {
        let mut latest = None;
        for pass in 1..=self.config.max_discovery_passes {
            let observation = self.observe(ctx).await?;

            let revealed: Vec<Field> = observation
                .fields
                .iter()
                .filter(|f| !known.contains(&fingerprint(f)))
                .filter(|f| f.is_actionable() && f.is_blank())
                .cloned()
                .collect();
            known.extend(observation.fields.iter().map(fingerprint));
            handled.extend(revealed.iter().map(fingerprint));

            if revealed.is_empty() {
                latest = Some(observation);
                break;
            }

            info!(
                "{} 🔍 第 {} 轮发现 {} 个新字段 (分区 '{}')",
                ctx,
                pass,
                revealed.len(),
                section
            );
            let verified = self
                .fill_fields(ctx, state, page, section, revealed, &observation)
                .await?;
            latest = Some(observation);
            if verified == 0 {
                break;
            }
        }
        Ok(latest)
    }

    /// 点击提交并轮询确认
    async fn submit(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
        observation: &Observation,
    ) -> Result<PageStep, Halt> {
        let Some(button) = find_submit_button(&observation.buttons) else {
            return Err(Halt::Finish(
                RunOutcome::NavigationFailed,
                "终点页上没有可用的提交按钮".to_string(),
            ));
        };

        info!("{} 📤 点击提交: '{}'", ctx, button.label);
        let confirmation = Confirmation::Submit {
            url_before: observation.url.clone(),
        };
        let (clicked, confirmed) = self
            .click_and_confirm(ctx, state, page, button, &confirmation)
            .await?;

        if confirmed {
            info!("{} ✅ 提交已确认", ctx);
            return Err(Halt::Finish(
                RunOutcome::Submitted,
                format!("第 {} 页提交已确认", page),
            ));
        }

        let reason = if clicked {
            "提交按钮已点击，但轮询未能确认提交".to_string()
        } else {
            "点击提交按钮失败".to_string()
        };
        Err(Halt::Finish(RunOutcome::NavigationFailed, reason))
    }

    /// 按确定的回退顺序点击翻页按钮并轮询确认
    async fn navigate(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
        observation: &Observation,
    ) -> Result<PageStep, Halt> {
        let candidates: Vec<Button> = navigation_candidates(&observation.buttons)
            .into_iter()
            .cloned()
            .collect();
        if candidates.is_empty() {
            let reason = if find_submit_button(&observation.buttons).is_some() {
                "只有提交按钮，但运行中还没有校验通过的填写"
            } else {
                "没有可用的翻页或提交按钮"
            };
            return Err(Halt::Finish(RunOutcome::NavigationFailed, reason.to_string()));
        }

        let confirmation = Confirmation::Navigation {
            url_before: observation.url.clone(),
            tokens_before: field_tokens(&observation.fields),
        };

        for button in &candidates {
            info!("{} 👉 点击翻页: '{}'", ctx, button.label);
            let (_, confirmed) = self
                .click_and_confirm(ctx, state, page, button, &confirmation)
                .await?;
            if confirmed {
                return Ok(PageStep::Advanced);
            }
        }

        Ok(PageStep::Unconfirmed)
    }

    /// 带升级地点击按钮；点击成功后轮询确认，返回 (已点击, 已确认)
    async fn click_and_confirm(
        &self,
        ctx: &mut RunContext,
        state: &mut RunState,
        page: usize,
        button: &Button,
        confirmation: &Confirmation,
    ) -> Result<(bool, bool), Halt> {
        let mut action = PlannedAction::click(button, 0);
        let outcome = match execute_with_escalation(&self.ladder, &self.policy, ctx, &mut action).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record(state, page, NAVIGATION_SECTION, &action, None, false, false);
                return Err(Halt::from_tier(e, "点击按钮失败"));
            }
        };

        if !outcome.success {
            self.record(state, page, NAVIGATION_SECTION, &action, outcome.tier, false, false);
            return Ok((false, false));
        }

        let fp = button_fingerprint(button);
        let confirmed = match confirmation {
            Confirmation::Submit { url_before } => self.poll_submit(ctx, url_before, &fp).await?,
            Confirmation::Navigation {
                url_before,
                tokens_before,
            } => {
                self.poll_navigation(ctx, url_before, tokens_before, &fp)
                    .await?
            }
        };
        self.record(state, page, NAVIGATION_SECTION, &action, outcome.tier, true, confirmed);
        Ok((true, confirmed))
    }

    /// 提交确认：URL 变化或提交按钮消失
    async fn poll_submit(&self, ctx: &mut RunContext, url_before: &str, button_fp: &str) -> Result<bool, Halt> {
        let poll = self.config.submit_poll;
        for attempt in 1..=poll.attempts {
            tokio::time::sleep(poll.interval).await;

            if self.url_changed(ctx, url_before).await? {
                debug!("{} 提交后 URL 已变化 (第 {} 次轮询)", ctx, attempt);
                return Ok(true);
            }
            let observation = self.observe(ctx).await?;
            if !button_present(&observation.buttons, button_fp) {
                debug!("{} 提交按钮已消失 (第 {} 次轮询)", ctx, attempt);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 翻页确认：URL 变化、翻页按钮消失，或字段指纹更替连续多次超过阈值
    async fn poll_navigation(
        &self,
        ctx: &mut RunContext,
        url_before: &str,
        tokens_before: &HashMap<String, usize>,
        button_fp: &str,
    ) -> Result<bool, Halt> {
        let poll = self.config.navigation_poll;
        let heuristic = self.config.navigation;
        let mut streak = 0;

        for attempt in 1..=poll.attempts {
            tokio::time::sleep(poll.interval).await;

            if self.url_changed(ctx, url_before).await? {
                debug!("{} 翻页后 URL 已变化 (第 {} 次轮询)", ctx, attempt);
                return Ok(true);
            }
            let observation = self.observe(ctx).await?;
            if !button_present(&observation.buttons, button_fp) {
                debug!("{} 翻页按钮已消失 (第 {} 次轮询)", ctx, attempt);
                return Ok(true);
            }

            let ratio = turnover(tokens_before, &field_tokens(&observation.fields));
            if ratio.is_some_and(|r| r > heuristic.turnover_ratio) {
                streak += 1;
                if streak >= heuristic.stable_polls {
                    debug!("{} 字段指纹更替已连续 {} 次超过阈值", ctx, streak);
                    return Ok(true);
                }
            } else {
                streak = 0;
            }
        }
        Ok(false)
    }

    async fn url_changed(&self, ctx: &RunContext, url_before: &str) -> Result<bool, Halt> {
        match ctx.session.current_url().await {
            Ok(url) => Ok(url != url_before),
            Err(e) if e.is_session_fatal() => Err(Halt::SessionLost(e)),
            Err(e) => {
                debug!("{} 读取 URL 失败: {}", ctx, e);
                Ok(false)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        state: &mut RunState,
        page: usize,
        section: &str,
        action: &PlannedAction,
        tier: Option<usize>,
        success: bool,
        verified: bool,
    ) {
        let fingerprint = match &action.target {
            ActionTarget::Field(f) => fingerprint(f),
            ActionTarget::Button(b) => button_fingerprint(b),
        };
        state.result.record(ActionRecord {
            page,
            section: section.to_string(),
            fingerprint,
            label: action.target.label().to_string(),
            verb: action.verb,
            value: action.value.clone(),
            tier: tier.and_then(|i| self.ladder.get(i)).map(|t| t.name().to_string()),
            success,
            verified,
            cost: action.history.iter().map(|a| a.cost).sum(),
            history: action.history.clone(),
        });
    }
}

/// 最新观察中第一个还有未处理空字段的分区，返回 (分区名, 待填字段)
fn next_section(observation: &Observation, handled: &HashSet<String>) -> Option<(String, Vec<Field>)> {
    group_sections(&observation.fields, &observation.buttons)
        .into_iter()
        .filter(|s| !s.all_filled)
        .find_map(|s| {
            let pending: Vec<Field> = s
                .unfilled_fields()
                .filter(|f| !handled.contains(&fingerprint(f)))
                .cloned()
                .collect();
            if pending.is_empty() {
                None
            } else {
                Some((s.name, pending))
            }
        })
}

fn button_present(buttons: &[Button], fp: &str) -> bool {
    buttons
        .iter()
        .any(|b| b.visible && button_fingerprint(b) == fp)
}

/// 阶梯描述，依赖推理服务的层带 🤖 标记
fn ladder_summary(ladder: &[Arc<dyn ExecutionTier>]) -> String {
    ladder
        .iter()
        .map(|t| {
            if t.requires_inference() {
                format!("{}🤖(${:.4}/次)", t.name(), t.cost_per_action())
            } else {
                t.name().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" → ")
}

fn log_run_finished(ctx: &RunContext, result: &RunResult) {
    let icon = if result.success { "✅" } else { "❌" };
    info!(
        "{} {} 运行结束: {} | 页数 {} | 动作 {} (校验通过 {}, 失败 {}) | 花费 ${:.4}",
        ctx,
        icon,
        result.outcome,
        result.pages_processed,
        result.actions_executed,
        result.actions_verified,
        result.actions_failed,
        result.total_cost
    );
    for reason in &result.stop_reasons {
        info!("{}   原因: {}", ctx, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TierResult;
    use crate::models::{ExecutionResult, ReviewResult};
    use async_trait::async_trait;

    struct NamedTier(&'static str, f64, bool);

    #[async_trait]
    impl ExecutionTier for NamedTier {
        fn name(&self) -> &str {
            self.0
        }

        fn cost_per_action(&self) -> f64 {
            self.1
        }

        fn requires_inference(&self) -> bool {
            self.2
        }

        async fn observe(&self, _ctx: &RunContext) -> TierResult<Observation> {
            Ok(Observation::default())
        }

        async fn match_fields(&self, _ctx: &RunContext, _obs: &Observation) -> TierResult<Vec<FieldMatch>> {
            Ok(Vec::new())
        }

        async fn execute(&self, _ctx: &RunContext, _actions: &[PlannedAction]) -> TierResult<Vec<ExecutionResult>> {
            Ok(Vec::new())
        }

        async fn review(
            &self,
            _ctx: &RunContext,
            _actions: &[PlannedAction],
            _results: &[ExecutionResult],
        ) -> TierResult<Vec<ReviewResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_ladder_summary_marks_inference_tiers() {
        let ladder: Vec<Arc<dyn ExecutionTier>> = vec![
            Arc::new(NamedTier("dom", 0.0, false)),
            Arc::new(NamedTier("llm", 0.01, true)),
        ];
        assert_eq!(ladder_summary(&ladder), "dom → llm🤖($0.0100/次)");
    }
}

//! 集成测试共用的假页面、假会话和可编排的假执行层
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apply_flow::error::{ErrorCategory, TierError, TierResult};
use apply_flow::infrastructure::PageSession;
use apply_flow::models::{
    ActionTarget, ActionVerb, Blocker, BlockerKind, BoundingBox, Button, DomHints, ExecutionResult,
    Field, FieldMatch, LiveState, Observation, PlannedAction, Profile, ReviewResult,
};
use apply_flow::orchestrator::{OrchestratorConfig, PollSettings};
use apply_flow::tiers::ExecutionTier;
use apply_flow::workflow::RunContext;

/// 一个脚本化的页面
#[derive(Clone, Default)]
pub struct FakePage {
    pub url: String,
    pub fields: Vec<Field>,
    pub buttons: Vec<Button>,
    pub blockers: Vec<Blocker>,
    /// 按钮标签 → 点击后跳转到的页面下标
    pub on_click: HashMap<String, usize>,
    /// (触发字段 id, 字段)：触发字段有值后才出现
    pub conditional: Vec<(String, Field)>,
    /// 字段 id → 复查时报告的实时状态（与观察结果不同）
    pub live: HashMap<String, LiveState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn field(mut self, id: &str, label: &str) -> Self {
        let y = 100.0 + 40.0 * self.fields.len() as f64;
        self.fields.push(Field {
            id: id.to_string(),
            selector: format!("[data-af-idx=\"{}\"]", id),
            stable_selector: Some(format!("#{}", id)),
            label: label.to_string(),
            required: true,
            bbox: BoundingBox::new(20.0, y, 300.0, 30.0),
            visible: true,
            ..Default::default()
        });
        self
    }

    /// 只有扫描索引、没有稳定属性的字段，位于具名容器 `container` 中
    pub fn scan_field(mut self, id: &str, label: &str, container: &str) -> Self {
        let field = self.scan_template(id, label, container);
        self.fields.push(field);
        self
    }

    /// 在 `trigger` 字段被填写后出现的新字段
    pub fn revealed_by(mut self, trigger: &str, id: &str, label: &str) -> Self {
        let mut holder = FakePage::default().field(id, label);
        let mut field = holder.fields.remove(0);
        field.bbox.y = self.next_y();
        self.conditional.push((trigger.to_string(), field));
        self
    }

    /// 在 `trigger` 字段被填写后出现的扫描字段
    pub fn scan_revealed_by(mut self, trigger: &str, id: &str, label: &str, container: &str) -> Self {
        let field = self.scan_template(id, label, container);
        self.conditional.push((trigger.to_string(), field));
        self
    }

    /// 观察时正常，复查实时状态时报告为隐藏
    pub fn hidden_on_recheck(mut self, id: &str) -> Self {
        self.live.insert(
            id.to_string(),
            LiveState {
                visible: false,
                enabled: true,
            },
        );
        self
    }

    /// 观察时正常，复查实时状态时报告为禁用
    pub fn disabled_on_recheck(mut self, id: &str) -> Self {
        self.live.insert(
            id.to_string(),
            LiveState {
                visible: true,
                enabled: false,
            },
        );
        self
    }

    fn next_y(&self) -> f64 {
        100.0 + 40.0 * (self.fields.len() + self.conditional.len()) as f64
    }

    fn scan_template(&self, id: &str, label: &str, container: &str) -> Field {
        let siblings = self
            .fields
            .iter()
            .chain(self.conditional.iter().map(|(_, f)| f))
            .filter(|f| f.hints.container.as_deref() == Some(container))
            .count();
        Field {
            id: id.to_string(),
            selector: String::new(),
            stable_selector: None,
            label: label.to_string(),
            required: true,
            bbox: BoundingBox::new(20.0, self.next_y(), 300.0, 30.0),
            visible: true,
            hints: DomHints {
                depth: 5,
                sibling_index: siblings as u32,
                container: Some(container.to_string()),
            },
            ..Default::default()
        }
    }

    pub fn button(mut self, label: &str, goes_to: Option<usize>) -> Self {
        let id = format!("btn-{}", self.buttons.len());
        self.buttons.push(Button {
            id: id.clone(),
            selector: format!("[data-af-btn=\"{}\"]", id),
            stable_selector: None,
            label: label.to_string(),
            is_submit_type: label.to_lowercase().contains("submit"),
            bbox: BoundingBox::new(20.0, 600.0, 120.0, 36.0),
            visible: true,
            disabled: false,
        });
        if let Some(target) = goes_to {
            self.on_click.insert(label.to_string(), target);
        }
        self
    }

    /// 给最后添加的按钮加上稳定属性选择器
    pub fn stable(mut self, selector: &str) -> Self {
        if let Some(button) = self.buttons.last_mut() {
            button.stable_selector = Some(selector.to_string());
        }
        self
    }

    pub fn blocker(mut self, kind: BlockerKind) -> Self {
        self.blockers.push(Blocker {
            kind,
            detail: "iframe[src*=recaptcha]".to_string(),
        });
        self
    }
}

#[derive(Default)]
struct BrowserState {
    pages: Vec<FakePage>,
    current: usize,
    values: HashMap<String, String>,
    clicks: Vec<String>,
    /// 每次观察都重新分配扫描索引
    reindex: bool,
    observes: usize,
    /// 最近一次观察的扫描选择器 → 字段 id
    scan_map: HashMap<String, String>,
}

impl BrowserState {
    /// 当前页上可见的字段（含已被触发的条件字段）
    fn present_fields(&self) -> Vec<Field> {
        let page = &self.pages[self.current];
        let mut fields = page.fields.clone();
        fields.extend(
            page.conditional
                .iter()
                .filter(|(trigger, _)| self.values.get(trigger).is_some_and(|v| !v.is_empty()))
                .map(|(_, f)| f.clone()),
        );
        fields
    }

    /// 按选择器找到当前页上的字段 id：稳定选择器优先，否则查最近一次观察的扫描索引
    fn resolve(&self, field: &Field) -> Option<String> {
        let present = self.present_fields();
        match field.stable_selector.as_deref() {
            Some(stable) => present
                .iter()
                .find(|f| f.stable_selector.as_deref() == Some(stable))
                .map(|f| f.id.clone()),
            None => self
                .scan_map
                .get(&field.selector)
                .filter(|id| present.iter().any(|f| &f.id == *id))
                .cloned(),
        }
    }
}

/// 多个页面组成的假浏览器，执行层和会话共享它
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl FakeBrowser {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrowserState {
                pages,
                ..Default::default()
            })),
        }
    }

    /// 每次观察都重新分配扫描索引，旧选择器会指向别的字段
    pub fn reindexing(self) -> Self {
        self.state.lock().unwrap().reindex = true;
        self
    }

    pub fn observes(&self) -> usize {
        self.state.lock().unwrap().observes
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn value(&self, field_id: &str) -> Option<String> {
        self.state.lock().unwrap().values.get(field_id).cloned()
    }

    pub fn current_page(&self) -> usize {
        self.state.lock().unwrap().current
    }

    fn observe(&self) -> Observation {
        let mut state = self.state.lock().unwrap();
        let present = state.present_fields();
        let offset = if state.reindex { state.observes } else { 0 };
        state.observes += 1;

        let mut scan_map = HashMap::new();
        let mut fields = Vec::with_capacity(present.len());
        for (position, template) in present.iter().enumerate() {
            let idx = (position + offset) % present.len();
            let mut f = template.clone();
            f.selector = format!("[data-af-idx=\"{}\"]", idx);
            if f.stable_selector.is_none() {
                f.id = format!("f{}", idx);
            }
            f.value = state.values.get(&template.id).cloned().unwrap_or_default();
            scan_map.insert(f.selector.clone(), template.id.clone());
            fields.push(f);
        }
        state.scan_map = scan_map;

        let page = &state.pages[state.current];
        Observation {
            url: page.url.clone(),
            fields,
            buttons: page.buttons.clone(),
            blockers: page.blockers.clone(),
            cost: 0.0,
            fingerprint: String::new(),
        }
    }

    fn live_state(&self, field: &Field) -> Option<LiveState> {
        let state = self.state.lock().unwrap();
        let id = state.resolve(field)?;
        if let Some(live) = state.pages[state.current].live.get(&id) {
            return Some(*live);
        }
        state
            .present_fields()
            .into_iter()
            .find(|f| f.id == id)
            .map(|f| LiveState {
                visible: f.visible,
                enabled: !f.disabled,
            })
    }

    /// 按选择器回读字段值，找不到元素时为 `None`
    pub fn read(&self, field: &Field) -> Option<String> {
        let state = self.state.lock().unwrap();
        let id = state.resolve(field)?;
        Some(state.values.get(&id).cloned().unwrap_or_default())
    }

    fn perform(&self, action: &PlannedAction) -> TierResult<()> {
        let mut state = self.state.lock().unwrap();
        match &action.target {
            ActionTarget::Field(field) => {
                let Some(id) = state.resolve(field) else {
                    return Err(TierError::not_found(format!("no element {}", field.selector)));
                };
                state.values.insert(id, action.value.clone());
            }
            ActionTarget::Button(button) => {
                let target = state.pages[state.current].on_click.get(&button.label).copied();
                state.clicks.push(button.label.clone());
                if let Some(next) = target {
                    state.current = next;
                }
            }
        }
        Ok(())
    }
}

/// 基于假浏览器的会话
pub struct FakeSession {
    browser: FakeBrowser,
}

impl FakeSession {
    pub fn new(browser: FakeBrowser) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn current_url(&self) -> TierResult<String> {
        Ok(self.browser.observe().url)
    }

    async fn live_state(&self, field: &Field) -> TierResult<Option<LiveState>> {
        Ok(self.browser.live_state(field))
    }

    async fn read_value(&self, field: &Field) -> TierResult<Option<String>> {
        Ok(self.browser.read(field))
    }
}

/// 可编排的假执行层
///
/// 字段标签转成 snake_case 后与档案键相同即匹配；
/// `failures` 中的错误按顺序消耗，`always_fail` 则每次都失败。
pub struct FakeTier {
    name: String,
    cost: f64,
    browser: FakeBrowser,
    pub confidence: f64,
    pub matches: bool,
    pub always_fail: Option<ErrorCategory>,
    failures: Mutex<VecDeque<ErrorCategory>>,
    pub execute_calls: AtomicUsize,
    pub match_calls: AtomicUsize,
}

impl FakeTier {
    pub fn new(name: &str, cost: f64, browser: &FakeBrowser) -> Self {
        Self {
            name: name.to_string(),
            cost,
            browser: browser.clone(),
            confidence: 0.95,
            matches: true,
            always_fail: None,
            failures: Mutex::new(VecDeque::new()),
            execute_calls: AtomicUsize::new(0),
            match_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn without_matching(mut self) -> Self {
        self.matches = false;
        self
    }

    pub fn always_failing(mut self, category: ErrorCategory) -> Self {
        self.always_fail = Some(category);
        self
    }

    pub fn failing_first(self, categories: &[ErrorCategory]) -> Self {
        self.failures.lock().unwrap().extend(categories.iter().copied());
        self
    }

    pub fn executes(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> Option<ErrorCategory> {
        self.always_fail
            .or_else(|| self.failures.lock().unwrap().pop_front())
    }
}

pub fn snake_case(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[async_trait]
impl ExecutionTier for FakeTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_per_action(&self) -> f64 {
        self.cost
    }

    fn requires_inference(&self) -> bool {
        self.cost > 0.0
    }

    async fn observe(&self, _ctx: &RunContext) -> TierResult<Observation> {
        Ok(self.browser.observe())
    }

    async fn match_fields(
        &self,
        ctx: &RunContext,
        observation: &Observation,
    ) -> TierResult<Vec<FieldMatch>> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        if !self.matches {
            return Ok(Vec::new());
        }
        Ok(observation
            .fields
            .iter()
            .filter_map(|f| {
                let key = snake_case(&f.label);
                ctx.profile.get(&key).map(|value| FieldMatch {
                    field: f.clone(),
                    profile_key: key.clone(),
                    value: value.to_string(),
                    confidence: self.confidence,
                    method: "fake".to_string(),
                })
            })
            .collect())
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        actions: &[PlannedAction],
    ) -> TierResult<Vec<ExecutionResult>> {
        let mut results = Vec::new();
        for action in actions {
            self.execute_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(category) = self.next_failure() {
                let err = TierError::new(category, format!("{} failed on {}", self.name, action.target.label()));
                if err.is_session_fatal() {
                    return Err(err);
                }
                results.push(ExecutionResult::failed(self.cost, Duration::ZERO, err));
                continue;
            }
            match self.browser.perform(action) {
                Ok(()) => results.push(ExecutionResult::ok(self.cost, Duration::ZERO)),
                Err(e) => results.push(ExecutionResult::failed(self.cost, Duration::ZERO, e)),
            }
        }
        Ok(results)
    }

    async fn review(
        &self,
        _ctx: &RunContext,
        actions: &[PlannedAction],
        _results: &[ExecutionResult],
    ) -> TierResult<Vec<ReviewResult>> {
        Ok(actions
            .iter()
            .map(|action| match (&action.target, action.verb) {
                (ActionTarget::Field(f), ActionVerb::Fill) => {
                    let actual = self.browser.read(f).unwrap_or_default();
                    if actual == action.value {
                        ReviewResult::passed(&action.value, actual, 0.0)
                    } else {
                        ReviewResult::mismatch(&action.value, Some(actual), "value differs", 0.0)
                    }
                }
                _ => ReviewResult::passed(&action.value, "", 0.0),
            })
            .collect())
    }
}

/// 测试用配置：轮询不等待
pub fn fast_config() -> OrchestratorConfig {
    let poll = PollSettings {
        attempts: 3,
        interval: Duration::ZERO,
    };
    OrchestratorConfig {
        submit_poll: poll,
        navigation_poll: poll,
        ..OrchestratorConfig::default()
    }
}

pub fn context(browser: &FakeBrowser, profile: Profile, budget: f64) -> RunContext {
    RunContext::new(
        Arc::new(FakeSession::new(browser.clone())),
        profile,
        "job-test",
        budget,
    )
}

pub fn tiers(list: Vec<Arc<FakeTier>>) -> Vec<Arc<dyn ExecutionTier>> {
    list.into_iter()
        .map(|t| t as Arc<dyn ExecutionTier>)
        .collect()
}

//! DOM 脚本
//!
//! 观察、动作、回读和实时状态四类脚本。脚本总是返回一个对象，
//! 失败时返回 `{ ok: false, error: "<错误码>: <说明>" }`。

use serde::Deserialize;

use crate::error::{ErrorCategory, TierError, TierResult};
use crate::infrastructure::JsExecutor;
use crate::models::{ActionVerb, Field, FieldKind, LiveState, Observation, PlannedAction};

/// 扫描页面上的字段、按钮和阻断
///
/// 每次扫描都会重新分配 `data-af-idx`，因此它只能作为临时选择器。
const OBSERVE_JS: &str = r#"
(() => {
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    const s = getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
  };
  const stableSelector = (el) => {
    const tid = el.getAttribute('data-testid');
    if (tid) return `[data-testid="${tid}"]`;
    const aid = el.getAttribute('data-automation-id');
    if (aid) return `[data-automation-id="${aid}"]`;
    if (el.id && !/\d{3,}|^[a-f0-9-]{16,}$|^:r/.test(el.id)) return `#${CSS.escape(el.id)}`;
    return null;
  };
  const labelOf = (el) => {
    if (el.getAttribute('aria-label')) return el.getAttribute('aria-label');
    const by = el.getAttribute('aria-labelledby');
    if (by) {
      const t = by.split(/\s+/).map((id) => document.getElementById(id)?.innerText || '').join(' ').trim();
      if (t) return t;
    }
    if (el.id) {
      const l = document.querySelector(`label[for="${CSS.escape(el.id)}"]`);
      if (l) return l.innerText.trim();
    }
    const wrap = el.closest('label');
    if (wrap) return wrap.innerText.trim();
    return el.getAttribute('placeholder') || el.getAttribute('name') || '';
  };
  const containerOf = (el) => {
    const c = el.parentElement && el.parentElement.closest('[data-automation-id],fieldset[id],section[id],div[id],form[id]');
    if (!c) return null;
    return c.getAttribute('data-automation-id') || c.id || null;
  };
  const depthOf = (el) => { let d = 0; for (let p = el.parentElement; p; p = p.parentElement) d++; return d; };
  const kindOf = (el) => {
    const tag = el.tagName.toLowerCase();
    if (tag === 'select') return 'select';
    if (tag === 'textarea') return 'textarea';
    const t = (el.getAttribute('type') || 'text').toLowerCase();
    return ['text','email','tel','number','date','checkbox','radio','file'].includes(t) ? t : (t === 'search' || t === 'url' ? 'text' : 'other');
  };
  const valueOf = (el, kind) => {
    if (kind === 'checkbox') return el.checked ? 'true' : '';
    if (kind === 'radio') {
      const group = el.name ? document.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`) : [el];
      const hit = Array.from(group).find((r) => r.checked);
      return hit ? (hit.value || 'true') : '';
    }
    if (kind === 'select') return el.selectedIndex > 0 ? el.options[el.selectedIndex].text.trim() : '';
    if (kind === 'file') return el.files && el.files.length ? el.files[0].name : '';
    return el.value || '';
  };
  // 已打过标记的元素沿用原索引，新元素从页面级计数器取号
  const mark = (el, attr, counter) => {
    let v = el.getAttribute(attr);
    if (v === null) {
      v = String(window[counter] = (window[counter] || 0) + 1);
      el.setAttribute(attr, v);
    }
    return v;
  };
  const box = (el) => { const r = el.getBoundingClientRect(); return { x: r.x, y: r.y + window.scrollY, width: r.width, height: r.height }; };

  const inputs = Array.from(document.querySelectorAll('input, select, textarea'))
    .filter((el) => !['hidden','submit','button','reset','image'].includes((el.getAttribute('type') || '').toLowerCase()));
  const seenRadio = new Set();
  const fields = [];
  const perDepth = {};
  inputs.forEach((el) => {
    const kind = kindOf(el);
    if (kind === 'radio' && el.name) {
      if (seenRadio.has(el.name)) return;
      seenRadio.add(el.name);
    }
    const i = mark(el, 'data-af-idx', '__afFieldSeq');
    const container = containerOf(el);
    const depth = depthOf(el);
    const key = `${container}|${depth}|${kind}`;
    perDepth[key] = (perDepth[key] || 0) + 1;
    fields.push({
      id: `f${i}`,
      selector: `[data-af-idx="${i}"]`,
      stableSelector: stableSelector(el),
      name: el.getAttribute('name'),
      kind,
      label: labelOf(el),
      required: el.required || el.getAttribute('aria-required') === 'true',
      value: valueOf(el, kind),
      bbox: box(el),
      visible: visible(el),
      disabled: !!el.disabled || el.getAttribute('aria-disabled') === 'true',
      hints: { depth, sibling_index: perDepth[key] - 1, container },
      options: kind === 'select' ? Array.from(el.options).map((o) => o.text.trim()).filter(Boolean)
        : (kind === 'radio' && el.name ? Array.from(document.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`)).map((r) => labelOf(r)) : []),
    });
  });

  const buttons = Array.from(document.querySelectorAll('button, input[type="submit"], input[type="button"], a[role="button"], [role="button"]'))
    .map((el) => {
      const i = mark(el, 'data-af-btn', '__afButtonSeq');
      return {
        id: `b${i}`,
        selector: `[data-af-btn="${i}"]`,
        stableSelector: stableSelector(el),
        label: (el.innerText || el.value || el.getAttribute('aria-label') || '').trim(),
        isSubmitType: (el.getAttribute('type') || '').toLowerCase() === 'submit',
        bbox: box(el),
        visible: visible(el),
        disabled: !!el.disabled || el.getAttribute('aria-disabled') === 'true',
      };
    });

  const text = (document.body ? document.body.innerText : '').toLowerCase();
  const blockers = [];
  if (document.querySelector('iframe[src*="recaptcha"], iframe[src*="hcaptcha"], .g-recaptcha, .h-captcha, iframe[src*="turnstile"]'))
    blockers.push({ kind: 'captcha', detail: 'captcha widget' });
  if (/verify you are human|are you a robot|checking your browser/.test(text))
    blockers.push({ kind: 'bot_check', detail: 'bot check interstitial' });
  if (document.querySelector('input[type="password"]') && /sign in|log in|login/.test(text))
    blockers.push({ kind: 'login', detail: 'login wall' });
  if (/verification code|two-factor|2fa|authenticator app/.test(text))
    blockers.push({ kind: 'two_factor', detail: 'second factor prompt' });
  if (/too many requests|rate limit/.test(text))
    blockers.push({ kind: 'rate_limit', detail: 'rate limited' });

  return { url: location.href, fields, buttons, blockers, cost: 0, fingerprint: '' };
})()
"#;

/// 对单个元素执行动作
const PERFORM_JS: &str = r#"
((selector, verb, value) => {
  const el = document.querySelector(selector);
  if (!el) return { ok: false, error: `element_not_found: ${selector}` };
  const r = el.getBoundingClientRect();
  if (r.width === 0 && r.height === 0) return { ok: false, error: `element_not_visible: ${selector}` };
  if (el.disabled || el.getAttribute('aria-disabled') === 'true') return { ok: false, error: `element_not_interactable: ${selector} is disabled` };
  el.scrollIntoView({ block: 'center' });
  const fire = (node) => {
    node.dispatchEvent(new Event('input', { bubbles: true }));
    node.dispatchEvent(new Event('change', { bubbles: true }));
    node.dispatchEvent(new Event('blur', { bubbles: true }));
  };
  const norm = (s) => (s || '').trim().toLowerCase();
  if (verb === 'click') { el.click(); return { ok: true }; }
  if (verb === 'check' || verb === 'uncheck') {
    if (el.checked !== (verb === 'check')) el.click();
    return { ok: true };
  }
  if (verb === 'select') {
    if (el.tagName.toLowerCase() === 'select') {
      const opt = Array.from(el.options).find((o) => norm(o.text) === norm(value) || norm(o.value) === norm(value))
        || Array.from(el.options).find((o) => norm(o.text).includes(norm(value)));
      if (!opt) return { ok: false, error: `value_mismatch: no option '${value}'` };
      el.value = opt.value;
      fire(el);
      return { ok: true };
    }
    if (el.type === 'radio' && el.name) {
      const radios = Array.from(document.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`));
      const hit = radios.find((x) => norm(x.value) === norm(value)
        || norm((x.labels && x.labels[0] && x.labels[0].innerText) || '') === norm(value));
      if (!hit) return { ok: false, error: `value_mismatch: no radio '${value}'` };
      hit.click();
      return { ok: true };
    }
    return { ok: false, error: `element_not_interactable: ${selector} is not selectable` };
  }
  if (verb === 'upload') return { ok: false, error: 'element_not_interactable: file inputs need a native file chooser' };
  el.focus();
  const proto = el.tagName.toLowerCase() === 'textarea' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
  if (setter && setter.set) setter.set.call(el, value); else el.value = value;
  fire(el);
  return { ok: true };
})
"#;

/// 回读单个字段的当前值
const READ_VALUE_JS: &str = r#"
((selector, kind) => {
  const el = document.querySelector(selector);
  if (!el) return { found: false, value: null };
  if (kind === 'checkbox') return { found: true, value: el.checked ? 'true' : 'false' };
  if (kind === 'radio' && el.name) {
    const hit = Array.from(document.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`)).find((r) => r.checked);
    return { found: true, value: hit ? ((hit.labels && hit.labels[0] && hit.labels[0].innerText.trim()) || hit.value) : '' };
  }
  if (el.tagName.toLowerCase() === 'select') return { found: true, value: el.selectedIndex >= 0 ? el.options[el.selectedIndex].text.trim() : '' };
  return { found: true, value: el.value || '' };
})
"#;

/// 字段实时可见 / 可用状态
const LIVE_STATE_JS: &str = r#"
((selector) => {
  const el = document.querySelector(selector);
  if (!el) return { found: false, visible: false, enabled: false };
  const r = el.getBoundingClientRect();
  const s = getComputedStyle(el);
  return {
    found: true,
    visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none',
    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
  };
})
"#;

#[derive(Debug, Deserialize)]
struct ScriptOutcome {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadBack {
    found: bool,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiveReading {
    found: bool,
    visible: bool,
    enabled: bool,
}

fn verb_code(verb: ActionVerb) -> &'static str {
    match verb {
        ActionVerb::Fill => "fill",
        ActionVerb::Select => "select",
        ActionVerb::Check => "check",
        ActionVerb::Uncheck => "uncheck",
        ActionVerb::Upload => "upload",
        ActionVerb::Click => "click",
    }
}

fn js_arg(value: &str) -> TierResult<String> {
    serde_json::to_string(value)
        .map_err(|e| TierError::new(ErrorCategory::Unknown, format!("参数序列化失败: {}", e)))
}

/// 扫描当前页面
pub async fn observe(executor: &JsExecutor) -> TierResult<Observation> {
    executor.eval_tier(OBSERVE_JS).await
}

/// 执行单个动作
pub async fn perform(executor: &JsExecutor, action: &PlannedAction) -> TierResult<()> {
    let js_code = format!(
        "{}({}, {}, {})",
        PERFORM_JS.trim(),
        js_arg(action.target.selector())?,
        js_arg(verb_code(action.verb))?,
        js_arg(&action.value)?
    );
    let outcome: ScriptOutcome = executor.eval_tier(js_code).await?;
    if outcome.ok {
        Ok(())
    } else {
        let message = outcome.error.unwrap_or_else(|| "unknown: 脚本未说明原因".to_string());
        let code = message.split(':').next().unwrap_or_default();
        Err(TierError::new(ErrorCategory::from_code(code), message))
    }
}

/// 回读字段当前值；元素不存在时返回 `None`
pub async fn read_value(executor: &JsExecutor, field: &Field) -> TierResult<Option<String>> {
    let selector = field.stable_selector.as_deref().unwrap_or(&field.selector);
    let kind = match field.kind {
        FieldKind::Checkbox => "checkbox",
        FieldKind::Radio => "radio",
        _ => "value",
    };
    let js_code = format!(
        "{}({}, {})",
        READ_VALUE_JS.trim(),
        js_arg(selector)?,
        js_arg(kind)?
    );
    let read: ReadBack = executor.eval_tier(js_code).await?;
    Ok(if read.found { read.value } else { None })
}

/// 查询字段实时状态；元素已脱离文档时返回 `None`
pub async fn live_state(executor: &JsExecutor, field: &Field) -> TierResult<Option<LiveState>> {
    let selector = field.stable_selector.as_deref().unwrap_or(&field.selector);
    let js_code = format!("{}({})", LIVE_STATE_JS.trim(), js_arg(selector)?);
    let reading: LiveReading = executor.eval_tier(js_code).await?;
    Ok(reading.found.then_some(LiveState {
        visible: reading.visible,
        enabled: reading.enabled,
    }))
}

/// 当前页面地址
pub async fn current_url(executor: &JsExecutor) -> TierResult<String> {
    executor.eval_tier("location.href").await
}

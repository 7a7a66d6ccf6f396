//! 页面信号：终点页判定、翻页按钮选择、指纹更替
//!
//! 全部是纯函数，编排器在轮询时反复调用。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::models::Button;

const NEXT_LABEL: &str = r"(?i)^\s*(next|continue|next step|save and continue|save & continue|continue to next step|proceed)\s*(>|›|→)?\s*$";
const NAV_WORDS: &str = r"(?i)\b(next|continue|proceed)\b";
const SUBMIT_LABEL: &str = r"(?i)\b(submit|send application|apply now|finish|complete application)\b";
const NAV_ATTRIBUTE: &str = r#"(?i)(next|continue|bottom-navigation-next|pagefooternextbutton)"#;

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn pattern_matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    regex(cell, pattern).is_some_and(|re| re.is_match(text))
}

/// 标签是否为 "Next / Continue" 类翻页按钮
pub fn is_next_label(label: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern_matches(&RE, NEXT_LABEL, label)
}

/// 标签中是否含有翻页词
fn has_nav_words(label: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    pattern_matches(&RE, NAV_WORDS, label)
}

/// 标签是否为提交按钮
pub fn is_submit_label(label: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    !has_nav_words(label) && pattern_matches(&RE, SUBMIT_LABEL, label)
}

fn has_nav_attribute(button: &Button) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    button
        .stable_selector
        .as_deref()
        .is_some_and(|s| pattern_matches(&RE, NAV_ATTRIBUTE, s))
}

/// 终点页判定
///
/// 没有标签为 Next/Continue 的可用按钮、有可用的提交按钮、且本页或之前的页面
/// 至少有一次校验通过的填写。只看标签：翻页属性可能挂在最后的提交按钮上。
/// 禁用的按钮在两个方向上都被忽略。
pub fn detect_terminal_page(buttons: &[Button], has_verified_fill: bool) -> bool {
    let has_next = buttons
        .iter()
        .any(|b| b.is_enabled() && is_next_label(&b.label));
    let has_submit = buttons
        .iter()
        .any(|b| b.is_enabled() && is_submit_label(&b.label));
    !has_next && has_submit && has_verified_fill
}

/// 可用的提交按钮
pub fn find_submit_button(buttons: &[Button]) -> Option<&Button> {
    buttons
        .iter()
        .find(|b| b.is_enabled() && is_submit_label(&b.label))
}

/// 翻页候选按钮，按确定的回退顺序排列：
///
/// 1. 稳定属性命中翻页模式，且标签不是提交
/// 2. 标签精确为 Next/Continue
/// 3. `type="submit"` 且标签含翻页词（最后手段，避免误点 Save / Add）
pub fn navigation_candidates(buttons: &[Button]) -> Vec<&Button> {
    let enabled: Vec<&Button> = buttons.iter().filter(|b| b.is_enabled()).collect();
    let mut ordered: Vec<&Button> = Vec::new();

    for b in enabled
        .iter()
        .copied()
        .filter(|b| has_nav_attribute(b) && !is_submit_label(&b.label))
    {
        push_unique(&mut ordered, b);
    }
    for b in enabled.iter().copied().filter(|b| is_next_label(&b.label)) {
        push_unique(&mut ordered, b);
    }
    for b in enabled
        .iter()
        .copied()
        .filter(|b| b.is_submit_type && has_nav_words(&b.label))
    {
        push_unique(&mut ordered, b);
    }

    ordered
}

fn push_unique<'a>(out: &mut Vec<&'a Button>, button: &'a Button) {
    if !out
        .iter()
        .any(|o| o.id == button.id && o.selector == button.selector)
    {
        out.push(button);
    }
}

/// 翻页判定的启发式参数
///
/// 阈值是针对真实表单平台调出来的经验值，可覆盖。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationHeuristic {
    /// 上一页字段指纹消失的比例超过该值视为换页
    pub turnover_ratio: f64,
    /// 连续多少次轮询都满足才确认
    pub stable_polls: u32,
}

impl Default for NavigationHeuristic {
    fn default() -> Self {
        Self {
            turnover_ratio: 0.5,
            stable_polls: 2,
        }
    }
}

/// 上一页的字段指纹中，当前已不存在的比例（按多重集计数）
///
/// 上一页没有字段时返回 `None`，此时更替比例没有意义。
pub fn turnover(previous: &HashMap<String, usize>, current: &HashMap<String, usize>) -> Option<f64> {
    let total: usize = previous.values().sum();
    if total == 0 {
        return None;
    }
    let missing: usize = previous
        .iter()
        .map(|(token, count)| count.saturating_sub(current.get(token).copied().unwrap_or(0)))
        .sum();
    Some(missing as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(label: &str, enabled: bool) -> Button {
        Button {
            id: label.to_string(),
            selector: format!("[data-scan-idx=\"{}\"]", label.len()),
            label: label.to_string(),
            visible: true,
            disabled: !enabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_next_button_blocks_terminal() {
        let buttons = vec![button("Next", true), button("Submit Application", true)];
        assert!(!detect_terminal_page(&buttons, true));
    }

    #[test]
    fn test_disabled_buttons_ignored_both_ways() {
        let submit_only_disabled = vec![button("Submit", false)];
        assert!(!detect_terminal_page(&submit_only_disabled, true));

        let disabled_next = vec![button("Continue", false), button("Submit Application", true)];
        assert!(detect_terminal_page(&disabled_next, true));
    }

    #[test]
    fn test_terminal_requires_verified_fill() {
        let buttons = vec![button("Submit Application", true)];
        assert!(!detect_terminal_page(&buttons, false));
        assert!(detect_terminal_page(&buttons, true));
    }

    #[test]
    fn test_label_classification() {
        assert!(is_next_label("Next"));
        assert!(is_next_label("  Save and Continue "));
        assert!(!is_next_label("Save"));
        assert!(!is_next_label("Add Another"));
        assert!(is_submit_label("Submit Application"));
        assert!(!is_submit_label("Continue to submit"));
    }

    #[test]
    fn test_navigation_fallback_order() {
        let mut attr = button("Go", true);
        attr.stable_selector = Some("[data-automation-id=\"pageFooterNextButton\"]".to_string());
        let mut submit_typed = button("Save & Next Step please", true);
        submit_typed.is_submit_type = true;
        let save = button("Save", true);
        let next = button("Next", true);

        let buttons = vec![submit_typed.clone(), save, next.clone(), attr.clone()];
        let candidates = navigation_candidates(&buttons);
        let order: Vec<&str> = candidates
            .iter()
            .map(|b| b.label.as_str())
            .collect();
        assert_eq!(order, vec!["Go", "Next", "Save & Next Step please"]);
    }

    #[test]
    fn test_submit_with_next_attribute_is_terminal() {
        let mut submit = button("Submit", true);
        submit.stable_selector =
            Some("[data-automation-id=\"bottom-navigation-next-button\"]".to_string());
        let buttons = vec![submit];

        assert!(detect_terminal_page(&buttons, true));
        assert!(navigation_candidates(&buttons).is_empty());
        assert_eq!(find_submit_button(&buttons).map(|b| b.label.as_str()), Some("Submit"));
    }

    #[test]
    fn test_turnover_ratio() {
        let prev: HashMap<String, usize> =
            [("a".to_string(), 1), ("b".to_string(), 1), ("c".to_string(), 2)]
                .into_iter()
                .collect();
        let same = prev.clone();
        assert_eq!(turnover(&prev, &same), Some(0.0));

        let revealed: HashMap<String, usize> = prev
            .clone()
            .into_iter()
            .chain([("d".to_string(), 3)])
            .collect();
        assert_eq!(turnover(&prev, &revealed), Some(0.0));

        let next_page: HashMap<String, usize> = [("a".to_string(), 1), ("x".to_string(), 1)]
            .into_iter()
            .collect();
        assert_eq!(turnover(&prev, &next_page), Some(0.75));
        assert_eq!(turnover(&HashMap::new(), &next_page), None);
    }
}

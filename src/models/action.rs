//! 匹配、计划动作与执行结果

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ErrorCategory, TierError};
use crate::models::field::{Button, Field, FieldKind};

/// 字段与档案数据的匹配结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: Field,
    pub profile_key: String,
    pub value: String,
    /// 取值范围 [0, 1]
    pub confidence: f64,
    /// 产生该匹配的方式（如 `label_exact`、`llm`）
    pub method: String,
}

/// 动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionVerb {
    Fill,
    Select,
    Check,
    Uncheck,
    Upload,
    Click,
}

impl ActionVerb {
    /// 根据字段类型和要写入的值推断动作
    pub fn for_field(kind: FieldKind, value: &str) -> Self {
        match kind {
            FieldKind::Select | FieldKind::Radio => ActionVerb::Select,
            FieldKind::Checkbox => {
                if is_truthy(value) {
                    ActionVerb::Check
                } else {
                    ActionVerb::Uncheck
                }
            }
            FieldKind::File => ActionVerb::Upload,
            _ => ActionVerb::Fill,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "on" | "checked"
    )
}

/// 动作作用的目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionTarget {
    Field(Field),
    Button(Button),
}

impl ActionTarget {
    pub fn selector(&self) -> &str {
        match self {
            ActionTarget::Field(f) => f.stable_selector.as_deref().unwrap_or(&f.selector),
            ActionTarget::Button(b) => b.stable_selector.as_deref().unwrap_or(&b.selector),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ActionTarget::Field(f) => &f.label,
            ActionTarget::Button(b) => &b.label,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            ActionTarget::Field(f) => Some(f),
            ActionTarget::Button(_) => None,
        }
    }
}

/// 某一层的一次尝试记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAttempt {
    pub tier: String,
    pub attempt: u32,
    pub success: bool,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 待执行的动作
///
/// 升级过程中原地更新 `tier`、`attempts` 和 `history`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub target: ActionTarget,
    pub verb: ActionVerb,
    pub value: String,
    /// 在执行层阶梯中的位置
    pub tier: usize,
    pub attempts: u32,
    pub history: Vec<TierAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_key: Option<String>,
}

impl PlannedAction {
    pub fn from_match(m: &FieldMatch, tier: usize) -> Self {
        Self {
            verb: ActionVerb::for_field(m.field.kind, &m.value),
            target: ActionTarget::Field(m.field.clone()),
            value: m.value.clone(),
            tier,
            attempts: 0,
            history: Vec::new(),
            confidence: Some(m.confidence),
            profile_key: Some(m.profile_key.clone()),
        }
    }

    pub fn click(button: &Button, tier: usize) -> Self {
        Self {
            target: ActionTarget::Button(button.clone()),
            verb: ActionVerb::Click,
            value: String::new(),
            tier,
            attempts: 0,
            history: Vec::new(),
            confidence: None,
            profile_key: None,
        }
    }
}

/// 一次 execute 调用的结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub cost: f64,
    pub duration: Duration,
    pub error: Option<TierError>,
}

impl ExecutionResult {
    pub fn ok(cost: f64, duration: Duration) -> Self {
        Self {
            success: true,
            cost,
            duration,
            error: None,
        }
    }

    pub fn failed(cost: f64, duration: Duration, error: TierError) -> Self {
        Self {
            success: false,
            cost,
            duration,
            error: Some(error),
        }
    }
}

/// 一次 review 调用的结果（只读校验）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewResult {
    pub success: bool,
    pub cost: f64,
    pub duration: Duration,
    pub expected: String,
    pub actual: Option<String>,
    pub reason: Option<String>,
}

impl ReviewResult {
    pub fn passed(expected: impl Into<String>, actual: impl Into<String>, cost: f64) -> Self {
        Self {
            success: true,
            cost,
            duration: Duration::ZERO,
            expected: expected.into(),
            actual: Some(actual.into()),
            reason: None,
        }
    }

    pub fn mismatch(
        expected: impl Into<String>,
        actual: Option<String>,
        reason: impl Into<String>,
        cost: f64,
    ) -> Self {
        Self {
            success: false,
            cost,
            duration: Duration::ZERO,
            expected: expected.into(),
            actual,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_follows_field_kind() {
        assert_eq!(ActionVerb::for_field(FieldKind::Text, "Ada"), ActionVerb::Fill);
        assert_eq!(ActionVerb::for_field(FieldKind::Select, "US"), ActionVerb::Select);
        assert_eq!(ActionVerb::for_field(FieldKind::Radio, "Yes"), ActionVerb::Select);
        assert_eq!(ActionVerb::for_field(FieldKind::Checkbox, "Yes"), ActionVerb::Check);
        assert_eq!(ActionVerb::for_field(FieldKind::Checkbox, "no"), ActionVerb::Uncheck);
        assert_eq!(ActionVerb::for_field(FieldKind::File, "/tmp/cv.pdf"), ActionVerb::Upload);
    }

    #[test]
    fn test_target_prefers_stable_selector() {
        let field = Field {
            selector: "[data-scan-idx=\"4\"]".to_string(),
            stable_selector: Some("#email".to_string()),
            ..Default::default()
        };
        assert_eq!(ActionTarget::Field(field).selector(), "#email");
    }
}

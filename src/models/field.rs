//! 页面元素模型
//!
//! 一次观察（observe）产生的字段与按钮。观察之后不再原地修改，
//! 下一次观察会产生新的实例，跨观察的身份只通过指纹建立。

use serde::{Deserialize, Serialize};

/// 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Number,
    Date,
    Textarea,
    Select,
    Checkbox,
    Radio,
    File,
    Other,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::File => "file",
            FieldKind::Other => "other",
        }
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Text
    }
}

/// 元素在页面中的位置
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// DOM 结构提示
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomHints {
    /// 元素在 DOM 树中的深度
    pub depth: u32,
    /// 同一深度下同类型兄弟元素中的序号
    pub sibling_index: u32,
    /// 最近的具名容器（id / data-automation-id 等）
    pub container: Option<String>,
}

/// 可交互字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// 本次观察内的标识
    pub id: String,
    /// 执行动作时使用的选择器（可能是扫描时分配的临时选择器）
    pub selector: String,
    /// 基于稳定属性的选择器（id / data-testid / data-automation-id）
    #[serde(default)]
    pub stable_selector: Option<String>,
    /// name 属性
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hints: DomHints,
    /// 下拉框 / 单选组的可选项
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Field {
    /// 当前值是否为空白
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn is_actionable(&self) -> bool {
        self.visible && !self.disabled
    }
}

/// 页面按钮
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: String,
    pub selector: String,
    #[serde(default)]
    pub stable_selector: Option<String>,
    #[serde(default)]
    pub label: String,
    /// `type="submit"` 的元素
    #[serde(default)]
    pub is_submit_type: bool,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl Button {
    pub fn is_enabled(&self) -> bool {
        self.visible && !self.disabled
    }
}

/// 字段的实时状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    pub visible: bool,
    pub enabled: bool,
}

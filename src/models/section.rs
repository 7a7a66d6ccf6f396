use serde::{Deserialize, Serialize};

use crate::models::field::{Button, Field};

/// 逻辑分区
///
/// 每次观察都会重新构建，不做持久化。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub fields: Vec<Field>,
    pub buttons: Vec<Button>,
    pub y_start: f64,
    pub y_end: f64,
    /// 所有字段都已有非空值
    pub all_filled: bool,
}

impl Section {
    pub fn unfilled_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_blank())
    }
}

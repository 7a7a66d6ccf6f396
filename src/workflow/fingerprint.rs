//! 字段指纹
//!
//! 扫描时分配的索引在 DOM 变化后会被重新分配，不能作为身份。
//! 指纹按以下优先级计算，第一个命中者生效：
//!
//! 1. 基于稳定属性的选择器，原样使用
//! 2. `name` 属性
//! 3. 结构组合键：标签 + 类型 + 最近具名容器 + 深度 + 同类兄弟序号

use std::collections::HashMap;

use crate::models::{Button, Field, Observation};

/// 计算字段指纹
pub fn fingerprint(field: &Field) -> String {
    if let Some(stable) = field.stable_selector.as_deref() {
        if !stable.trim().is_empty() {
            return stable.to_string();
        }
    }

    if let Some(name) = field.name.as_deref() {
        let name = name.trim();
        if !name.is_empty() {
            return format!("name:{}", name);
        }
    }

    format!(
        "field:{}|{}|{}|d{}|i{}",
        normalize_label(&field.label),
        field.kind.as_str(),
        field.hints.container.as_deref().unwrap_or("-"),
        field.hints.depth,
        field.hints.sibling_index
    )
}

/// 按钮身份，用于日志与动作记录
pub fn button_fingerprint(button: &Button) -> String {
    match button.stable_selector.as_deref() {
        Some(stable) if !stable.trim().is_empty() => stable.to_string(),
        _ => format!("button:{}", normalize_label(&button.label)),
    }
}

/// 页面结构签名：URL + 字段指纹的有序多重集
pub fn page_signature(observation: &Observation) -> String {
    let mut tokens: Vec<String> = observation.fields.iter().map(fingerprint).collect();
    tokens.sort();
    format!("{}#{}", observation.url, tokens.join(","))
}

/// 字段指纹多重集
pub fn field_tokens(fields: &[Field]) -> HashMap<String, usize> {
    let mut tokens = HashMap::new();
    for field in fields {
        *tokens.entry(fingerprint(field)).or_insert(0) += 1;
    }
    tokens
}

/// 归一化标签：合并空白、去掉结尾的必填标记、小写
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['*', ':'])
        .trim()
        .to_lowercase()
}

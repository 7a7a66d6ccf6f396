//! 动作规划
//!
//! 根据匹配置信度为每个匹配分配起始执行层。阶梯中的位置 0 是最便宜的层。

use std::collections::HashSet;

use crate::models::{FieldMatch, PlannedAction};
use crate::workflow::fingerprint::fingerprint;

/// 高置信度下限：直接交给最便宜的层
pub const HIGH_CONFIDENCE: f64 = 0.8;
/// 中置信度下限：交给次便宜的层
pub const MEDIUM_CONFIDENCE: f64 = 0.6;

/// 为给定置信度选择阶梯位置，结果总是落在 `0..ladder_len` 内
///
/// `ladder_len` 为 0 时返回 0，调用方需保证至少有一层。
pub fn tier_for_confidence(confidence: f64, ladder_len: usize) -> usize {
    if ladder_len == 0 {
        return 0;
    }
    let last = ladder_len - 1;

    if confidence >= HIGH_CONFIDENCE {
        0
    } else if confidence >= MEDIUM_CONFIDENCE {
        1.min(last)
    } else {
        last
    }
}

/// 把匹配转成计划动作，同一字段只保留第一个匹配
pub fn plan_actions(matches: &[FieldMatch], ladder_len: usize) -> Vec<PlannedAction> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter(|m| seen.insert(fingerprint(&m.field)))
        .map(|m| PlannedAction::from_match(m, tier_for_confidence(m.confidence, ladder_len)))
        .collect()
}

/// 按字段指纹合并匹配：已有的匹配不会被后来的层覆盖
pub fn merge_matches(existing: &mut Vec<FieldMatch>, incoming: Vec<FieldMatch>) {
    let known: HashSet<String> = existing.iter().map(|m| fingerprint(&m.field)).collect();
    let mut added = HashSet::new();
    for m in incoming {
        let fp = fingerprint(&m.field);
        if !known.contains(&fp) && added.insert(fp) {
            existing.push(m);
        }
    }
}

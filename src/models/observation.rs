//! 观察结果模型

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::field::{Button, Field};

/// 阻断类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    Captcha,
    Login,
    TwoFactor,
    BotCheck,
    RateLimit,
}

impl fmt::Display for BlockerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockerKind::Captcha => "captcha",
            BlockerKind::Login => "login",
            BlockerKind::TwoFactor => "two_factor",
            BlockerKind::BotCheck => "bot_check",
            BlockerKind::RateLimit => "rate_limit",
        };
        f.write_str(s)
    }
}

/// 检测到的阻断（验证码、登录墙等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    pub kind: BlockerKind,
    #[serde(default)]
    pub detail: String,
}

/// 一次观察的完整结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub url: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub blockers: Vec<Blocker>,
    /// 本次观察产生的费用
    #[serde(default)]
    pub cost: f64,
    /// 执行层给出的页面指纹（可为空，编排器会自行计算）
    #[serde(default)]
    pub fingerprint: String,
}

impl Observation {
    /// 只保留给定字段的副本，用于按字段子集调用匹配
    pub fn with_fields(&self, fields: Vec<Field>) -> Self {
        Self {
            url: self.url.clone(),
            fields,
            buttons: self.buttons.clone(),
            blockers: self.blockers.clone(),
            cost: 0.0,
            fingerprint: self.fingerprint.clone(),
        }
    }
}

//! 运行上下文
//!
//! 封装"我正在为哪个作业、用哪个页面、还剩多少钱"这一信息

use std::fmt::Display;
use std::sync::Arc;

use crate::infrastructure::PageSession;
use crate::models::Profile;

/// 预算计数器
///
/// 只有本次运行的单一控制流会修改它，每笔费用发生后立即扣除。
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    remaining: f64,
    spent: f64,
}

impl Budget {
    pub fn new(limit: f64) -> Self {
        Self {
            remaining: limit.max(0.0),
            spent: 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn spent(&self) -> f64 {
        self.spent
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0.0
    }

    /// 预计花费 `cost` 后余额是否仍不为负
    pub fn can_afford(&self, cost: f64) -> bool {
        self.remaining - cost >= -f64::EPSILON
    }

    /// 扣除已发生的费用，余额最低为零
    pub fn charge(&mut self, cost: f64) {
        if cost <= 0.0 {
            return;
        }
        self.spent += cost;
        self.remaining = (self.remaining - cost).max(0.0);
    }
}

/// 运行上下文
///
/// 包含一次运行中所有执行层共享的信息
pub struct RunContext {
    /// 页面 / 会话句柄，运行内不可并发使用
    pub session: Arc<dyn PageSession>,
    /// 申请人档案
    pub profile: Profile,
    /// 作业 ID
    pub job_id: String,
    /// 剩余预算
    pub budget: Budget,
    /// 平台提示（如 workday / greenhouse）
    pub platform: Option<String>,
}

impl RunContext {
    /// 创建新的运行上下文
    pub fn new(
        session: Arc<dyn PageSession>,
        profile: Profile,
        job_id: impl Into<String>,
        budget: f64,
    ) -> Self {
        Self {
            session,
            profile,
            job_id: job_id.into(),
            budget: Budget::new(budget),
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

impl Display for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[作业 {}]", self.job_id)
    }
}

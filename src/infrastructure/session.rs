//! 页面会话句柄
//!
//! 编排器通过它读取地址、确认字段实时状态、回读单个字段。
//! 一次运行内只有一个控制流使用它，不支持并发调用。

use async_trait::async_trait;

use crate::error::TierResult;
use crate::infrastructure::{dom_scripts, JsExecutor};
use crate::models::{Field, LiveState};

/// 页面会话
#[async_trait]
pub trait PageSession: Send + Sync {
    /// 当前页面地址
    async fn current_url(&self) -> TierResult<String>;

    /// 字段的实时可见 / 可用状态，元素已不存在时返回 `None`
    async fn live_state(&self, field: &Field) -> TierResult<Option<LiveState>>;

    /// 回读单个字段的值，元素已不存在时返回 `None`
    async fn read_value(&self, field: &Field) -> TierResult<Option<String>>;
}

/// 基于 chromiumoxide 页面的会话
#[derive(Clone)]
pub struct BrowserSession {
    executor: JsExecutor,
}

impl BrowserSession {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }
}

#[async_trait]
impl PageSession for BrowserSession {
    async fn current_url(&self) -> TierResult<String> {
        dom_scripts::current_url(&self.executor).await
    }

    async fn live_state(&self, field: &Field) -> TierResult<Option<LiveState>> {
        dom_scripts::live_state(&self.executor, field).await
    }

    async fn read_value(&self, field: &Field) -> TierResult<Option<String>> {
        dom_scripts::read_value(&self.executor, field).await
    }
}

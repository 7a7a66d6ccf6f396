//! # Apply Flow
//!
//! 一个多页申请表自动填写的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `BrowserSession` - 编排器使用的页面句柄（URL / 实时状态 / 回读）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `LlmService` - LLM 字段匹配能力
//! - `ReportWriter` - 写运行报告能力
//!
//! ### ③ 执行层（Tiers）
//! - `tiers/` - 按成本排列的自动化策略，实现同一个 `ExecutionTier` 契约
//! - `DomTier` - 零成本 DOM 脚本
//! - `LlmTier` - LLM 匹配，按动作计费
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 纯逻辑：指纹、分区、规划、升级执行、翻页判定、回读校验
//! - `RunContext` - 一次运行的上下文（会话、档案、作业 ID、预算）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/page_orchestrator` - 单次运行的页面状态机
//! - `orchestrator/job_runner` - 批量作业运行器，管理资源和并发
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod tiers;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, ErrorCategory, RunError, TierError};
pub use infrastructure::{BrowserSession, JsExecutor, PageSession};
pub use models::{JobSpec, Profile, RunOutcome, RunResult};
pub use orchestrator::{App, OrchestratorConfig, PageOrchestrator};
pub use tiers::{DomTier, ExecutionTier, LlmTier};
pub use workflow::{Budget, EscalationPolicy, RunContext};

//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和单次运行的页面流程，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `job_runner` - 作业运行器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载作业（Vec<JobSpec>）
//! - 控制并发数量（Semaphore）与单作业超时
//! - 管理浏览器资源，为每个作业打开标签页
//! - 写运行报告，输出全局统计信息
//!
//! ### `page_orchestrator` - 页面编排器
//! - 一次运行：从入口页走到提交确认
//! - 分区、匹配、规划、升级执行、回读、翻页
//!
//! ## 层次关系
//!
//! ```text
//! job_runner (处理 Vec<JobSpec>)
//!     ↓
//! page_orchestrator (处理一个作业的所有页面)
//!     ↓
//! workflow (纯逻辑：指纹 / 分区 / 规划 / 升级 / 翻页判定)
//!     ↓
//! tiers (执行层：dom / llm)
//!     ↓
//! services + infrastructure (LLM 调用、JsExecutor)
//! ```

pub mod job_runner;
pub mod page_orchestrator;

pub use job_runner::App;
pub use page_orchestrator::{OrchestratorConfig, PageOrchestrator, PollSettings};

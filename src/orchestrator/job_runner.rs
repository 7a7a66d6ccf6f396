//! 作业运行器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量作业的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、连接或启动浏览器
//! 2. **批量加载**：扫描并加载所有待处理的作业（`Vec<JobSpec>`）
//! 3. **并发控制**：使用 Semaphore 限制同时运行的作业数
//! 4. **单作业装配**：每个作业一个标签页、一组执行层、一个 `RunContext`
//! 5. **超时控制**：每个作业包在 `tokio::time::timeout` 中
//! 6. **全局统计**：汇总结果并写入运行报告

use anyhow::Result;
use chromiumoxide::Browser;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{BrowserSession, JsExecutor};
use crate::models::{load_all_jobs, JobSpec, RunResult};
use crate::orchestrator::PageOrchestrator;
use crate::services::{LlmService, ReportWriter};
use crate::tiers::{DomTier, ExecutionTier, LlmTier};
use crate::utils::logging::{init_log_file, log_jobs_loaded, log_startup, print_final_stats};
use crate::workflow::{EscalationPolicy, RunContext};

/// 应用主结构
pub struct App {
    config: Config,
    browser: Browser,
    llm: Option<Arc<LlmService>>,
    reports: Arc<ReportWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(config.max_concurrent_jobs, config.use_headless);

        let browser = if config.use_headless {
            browser::launch_headless_browser(config.headless_executable.as_deref()).await?
        } else {
            browser::connect_to_browser(config.browser_debug_port).await?
        };

        let llm = if config.llm_api_key.trim().is_empty() {
            warn!("⚠️ 未配置 LLM_API_KEY，只使用 DOM 层");
            None
        } else {
            Some(Arc::new(LlmService::new(&config)))
        };

        let reports = Arc::new(ReportWriter::with_path(&config.report_file));

        Ok(Self {
            config,
            browser,
            llm,
            reports,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在扫描待处理的作业...");
        let jobs = load_all_jobs(&self.config.jobs_folder).await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到待处理的作业文件，程序结束");
            return Ok(());
        }

        log_jobs_loaded(jobs.len(), self.config.max_concurrent_jobs);

        let stats = self.run_all_jobs(jobs).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total_cost,
            &self.config.output_log_file,
        );
        info!("📝 运行报告: {}", self.reports.path());

        Ok(())
    }

    /// 并发运行所有作业
    async fn run_all_jobs(&self, jobs: Vec<JobSpec>) -> Result<RunStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs));
        let mut handles = Vec::new();

        for job in jobs {
            let permit = semaphore.clone().acquire_owned().await?;

            let page = match browser::open_job_page(&self.browser, &job.url).await {
                Ok(page) => page,
                Err(e) => {
                    error!("[作业 {}] ❌ 打开页面失败: {}", job.job_id, e);
                    handles.push((job.job_id.clone(), None));
                    continue;
                }
            };

            let executor = JsExecutor::new(page);
            let tiers = self.build_tiers(&executor);
            let config = self.config.clone();
            let reports = self.reports.clone();
            let job_id = job.job_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = run_job(&config, tiers, executor.clone(), job).await;
                if let Some(run) = &result {
                    if let Err(e) = reports.write(run).await {
                        warn!("[作业 {}] 写入运行报告失败: {}", run.job_id, e);
                    }
                }
                if let Err(e) = executor.page().clone().close().await {
                    warn!("关闭页面失败: {}", e);
                }
                result
            });
            handles.push((job_id, Some(handle)));
        }

        let mut stats = RunStats::default();
        for (job_id, handle) in handles {
            let result = match handle {
                Some(h) => match h.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("[作业 {}] 任务执行失败: {}", job_id, e);
                        None
                    }
                },
                None => None,
            };

            match result {
                Some(run) => {
                    stats.total_cost += run.total_cost;
                    if run.success {
                        stats.success += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
                None => stats.failed += 1,
            }
        }

        Ok(stats)
    }

    /// 为一个作业组装执行层，按成本从低到高
    fn build_tiers(&self, executor: &JsExecutor) -> Vec<Arc<dyn ExecutionTier>> {
        let mut tiers: Vec<Arc<dyn ExecutionTier>> = vec![Arc::new(DomTier::new(executor.clone()))];
        if let Some(llm) = &self.llm {
            tiers.push(Arc::new(LlmTier::new(
                executor.clone(),
                llm.clone(),
                self.config.llm_cost_per_action,
            )));
        }
        tiers
    }
}

/// 运行单个作业；超时或会话丢失时返回 `None`
async fn run_job(
    config: &Config,
    tiers: Vec<Arc<dyn ExecutionTier>>,
    executor: JsExecutor,
    job: JobSpec,
) -> Option<RunResult> {
    let orchestrator = match PageOrchestrator::new(&tiers, EscalationPolicy::default(), config.orchestrator()) {
        Ok(o) => o,
        Err(e) => {
            error!("[作业 {}] ❌ {}", job.job_id, e);
            return None;
        }
    };

    let session = Arc::new(BrowserSession::new(executor));
    let mut ctx = RunContext::new(session, job.profile, job.job_id, job.budget);
    if let Some(platform) = job.platform {
        ctx = ctx.with_platform(platform);
    }

    let outcome = tokio::time::timeout(config.run_timeout(), orchestrator.run(&mut ctx)).await;
    match outcome {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => {
            error!("{} ❌ {}", ctx, AppError::from(e));
            None
        }
        Err(_) => {
            error!(
                "{} ⏱️ 运行超时 ({} 秒)，已花费 ${:.4}",
                ctx,
                config.run_timeout_secs,
                ctx.budget.spent()
            );
            None
        }
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct RunStats {
    success: usize,
    failed: usize,
    total_cost: f64,
}

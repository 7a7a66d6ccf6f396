use std::str::FromStr;
use std::time::Duration;

use crate::orchestrator::{OrchestratorConfig, PollSettings};
use crate::workflow::NavigationHeuristic;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的作业数量
    pub max_concurrent_jobs: usize,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 使用无头浏览器而不是连接已打开的浏览器
    pub use_headless: bool,
    /// 无头浏览器可执行文件，为空时由 chromiumoxide 自行查找
    pub headless_executable: Option<String>,
    /// 作业 TOML 文件存放目录
    pub jobs_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 运行报告文件（JSON lines）
    pub report_file: String,
    /// 单个作业的运行时长上限（秒）
    pub run_timeout_secs: u64,
    // --- 页面流程 ---
    pub max_pages: usize,
    pub stuck_threshold: usize,
    pub max_discovery_passes: usize,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// LLM 层单次动作成本（美元）
    pub llm_cost_per_action: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            browser_debug_port: 9222,
            use_headless: false,
            headless_executable: None,
            jobs_folder: "jobs".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            report_file: "report.jsonl".to_string(),
            run_timeout_secs: 600,
            max_pages: 15,
            stuck_threshold: 3,
            max_discovery_passes: 3,
            poll_attempts: 10,
            poll_interval_ms: 500,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_cost_per_action: 0.01,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let parsed = |key: &str| Parsed(lookup(key));
        Self {
            max_concurrent_jobs: parsed("MAX_CONCURRENT_JOBS").or(default.max_concurrent_jobs).max(1),
            browser_debug_port: parsed("BROWSER_DEBUG_PORT").or(default.browser_debug_port),
            use_headless: parsed("USE_HEADLESS").or(default.use_headless),
            headless_executable: lookup("HEADLESS_EXECUTABLE").or(default.headless_executable),
            jobs_folder: lookup("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            verbose_logging: parsed("VERBOSE_LOGGING").or(default.verbose_logging),
            output_log_file: lookup("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            report_file: lookup("REPORT_FILE").unwrap_or(default.report_file),
            run_timeout_secs: parsed("RUN_TIMEOUT_SECS").or(default.run_timeout_secs),
            max_pages: parsed("MAX_PAGES").or(default.max_pages),
            stuck_threshold: parsed("STUCK_THRESHOLD").or(default.stuck_threshold),
            max_discovery_passes: parsed("MAX_DISCOVERY_PASSES").or(default.max_discovery_passes),
            poll_attempts: parsed("POLL_ATTEMPTS").or(default.poll_attempts),
            poll_interval_ms: parsed("POLL_INTERVAL_MS").or(default.poll_interval_ms),
            llm_api_key: lookup("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_cost_per_action: parsed("LLM_COST_PER_ACTION").or(default.llm_cost_per_action),
        }
    }

    /// 单个作业的运行时长上限
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// 页面编排器配置
    pub fn orchestrator(&self) -> OrchestratorConfig {
        let poll = PollSettings {
            attempts: self.poll_attempts.max(1),
            interval: Duration::from_millis(self.poll_interval_ms),
        };
        OrchestratorConfig {
            max_pages: self.max_pages,
            stuck_threshold: self.stuck_threshold,
            max_discovery_passes: self.max_discovery_passes,
            submit_poll: poll,
            navigation_poll: poll,
            navigation: NavigationHeuristic::default(),
            ..OrchestratorConfig::default()
        }
    }
}

/// 环境变量原始值，按需解析为目标类型，解析失败时回退默认值
struct Parsed(Option<String>);

impl Parsed {
    fn or<T: FromStr>(self, default: T) -> T {
        self.0.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_and_fallbacks() {
        let env: HashMap<&str, &str> = [
            ("MAX_CONCURRENT_JOBS", "0"),
            ("USE_HEADLESS", "true"),
            ("MAX_PAGES", "not-a-number"),
            ("LLM_COST_PER_ACTION", "0.05"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.max_concurrent_jobs, 1);
        assert!(config.use_headless);
        assert_eq!(config.max_pages, 15);
        assert_eq!(config.llm_cost_per_action, 0.05);
        assert_eq!(config.jobs_folder, "jobs");
    }

    #[test]
    fn test_orchestrator_defaults() {
        let orchestrator = Config::default().orchestrator();
        assert_eq!(orchestrator.max_pages, 15);
        assert_eq!(orchestrator.stuck_threshold, 3);
        assert_eq!(orchestrator.max_discovery_passes, 3);
        assert_eq!(orchestrator.navigation.turnover_ratio, 0.5);
        assert_eq!(orchestrator.navigation.stable_polls, 2);
        assert_eq!(orchestrator.submit_poll.interval, Duration::from_millis(500));
    }
}

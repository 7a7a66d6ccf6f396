use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 统一错误分类
///
/// 所有执行层（tier）都必须把自己的失败归入以下类别，
/// 升级策略只根据类别做决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ElementNotFound,
    ElementNotVisible,
    ElementNotInteractable,
    ValueMismatch,
    Timeout,
    NavigationFailed,
    BlockerDetected,
    BudgetExceeded,
    BrowserDisconnected,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ElementNotFound => "element_not_found",
            ErrorCategory::ElementNotVisible => "element_not_visible",
            ErrorCategory::ElementNotInteractable => "element_not_interactable",
            ErrorCategory::ValueMismatch => "value_mismatch",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::NavigationFailed => "navigation_failed",
            ErrorCategory::BlockerDetected => "blocker_detected",
            ErrorCategory::BudgetExceeded => "budget_exceeded",
            ErrorCategory::BrowserDisconnected => "browser_disconnected",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// 从脚本返回的错误码解析类别
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "element_not_found" => ErrorCategory::ElementNotFound,
            "element_not_visible" => ErrorCategory::ElementNotVisible,
            "element_not_interactable" => ErrorCategory::ElementNotInteractable,
            "value_mismatch" => ErrorCategory::ValueMismatch,
            "timeout" => ErrorCategory::Timeout,
            "navigation_failed" => ErrorCategory::NavigationFailed,
            "blocker_detected" => ErrorCategory::BlockerDetected,
            "budget_exceeded" => ErrorCategory::BudgetExceeded,
            "browser_disconnected" => ErrorCategory::BrowserDisconnected,
            _ => ErrorCategory::Unknown,
        }
    }

    /// 会话已不可用，必须中止整个运行
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ErrorCategory::BrowserDisconnected)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 执行层返回的错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct TierError {
    pub category: ErrorCategory,
    pub message: String,
}

impl TierError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ElementNotFound, message)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::BrowserDisconnected, message)
    }

    pub fn budget_exceeded(needed: f64, remaining: f64) -> Self {
        Self::new(
            ErrorCategory::BudgetExceeded,
            format!("需要 ${:.4}，剩余 ${:.4}", needed, remaining),
        )
    }

    pub fn is_session_fatal(&self) -> bool {
        self.category.is_session_fatal()
    }
}

/// 执行层结果类型
pub type TierResult<T> = Result<T, TierError>;

/// 一次运行无法用 `RunOutcome` 表达的失败
#[derive(Debug, Error)]
pub enum RunError {
    /// 浏览器会话已断开，运行无法继续
    #[error("浏览器会话已断开: {0}")]
    SessionLost(TierError),
    /// 没有注册任何可用的执行层
    #[error("没有可用的执行层")]
    NoTiers,
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 作业文件错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 运行错误
    #[error("运行错误: {0}")]
    Run(#[from] RunError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容无法解析
    #[error("无法解析LLM返回的匹配结果: {response}")]
    UnparsableResponse { response: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_code_round_trip_through_serde() {
        let json = serde_json::to_string(&ErrorCategory::ElementNotInteractable).unwrap();
        assert_eq!(json, "\"element_not_interactable\"");
        assert_eq!(
            ErrorCategory::from_code("element_not_interactable"),
            ErrorCategory::ElementNotInteractable
        );
        assert_eq!(ErrorCategory::from_code("garbage"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_only_disconnect_is_session_fatal() {
        assert!(TierError::disconnected("ws closed").is_session_fatal());
        assert!(!TierError::not_found("#email").is_session_fatal());
        assert!(!TierError::budget_exceeded(1.0, 0.5).is_session_fatal());
    }
}

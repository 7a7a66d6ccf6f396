//! 运行报告写入服务 - 业务能力层
//!
//! 只负责"写 report.jsonl"能力，不关心流程

use anyhow::Result;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::error::{AppError, FileError};
use crate::models::RunResult;

#[derive(Serialize)]
struct ReportLine<'a> {
    finished_at: String,
    #[serde(flatten)]
    result: &'a RunResult,
}

/// 运行报告写入服务
///
/// 每个作业一行 JSON，追加写入。
pub struct ReportWriter {
    report_file_path: String,
}

impl ReportWriter {
    /// 使用默认路径 `report.jsonl`
    pub fn new() -> Self {
        Self {
            report_file_path: "report.jsonl".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            report_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.report_file_path
    }

    /// 追加一条运行结果
    pub async fn write(&self, result: &RunResult) -> Result<()> {
        debug!(
            "写入报告: 作业 {} | 结局 {} | 花费 ${:.4}",
            result.job_id, result.outcome, result.total_cost
        );

        let line = serde_json::to_string(&ReportLine {
            finished_at: chrono::Local::now().to_rfc3339(),
            result,
        })?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_file_path)
            .and_then(|mut file| writeln!(file, "{}", line))
            .map_err(|e| {
                AppError::File(FileError::WriteFailed {
                    path: self.report_file_path.clone(),
                    source: Box::new(e),
                })
            })?;

        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

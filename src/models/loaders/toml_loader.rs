use crate::error::{AppError, FileError};
use crate::models::profile::JobSpec;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载单个作业
pub async fn load_job(toml_file_path: &Path) -> Result<JobSpec> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(toml_file_path.display().to_string(), e))?;

    let mut job = parse_job(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    // 设置文件路径
    job.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(job)
}

/// 解析 TOML 文本为作业
pub fn parse_job(content: &str) -> Result<JobSpec, AppError> {
    toml::from_str(content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(),
            source: Box::new(e),
        })
    })
}

/// 从文件夹中加载所有作业，按文件名排序
pub async fn load_all_jobs(folder_path: &str) -> Result<Vec<JobSpec>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        })
        .into());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut jobs = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_job(&path).await {
            Ok(job) => {
                tracing::info!("成功加载作业 {} ({} 个档案字段)", job.job_id, job.profile.len());
                jobs.push(job);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job_with_profile_table() {
        let job = parse_job(
            r#"
            job_id = "acme-42"
            url = "https://jobs.example.com/apply/42"
            budget = 0.5
            platform = "workday"

            [profile]
            first_name = "Ada"
            email = "ada@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(job.job_id, "acme-42");
        assert_eq!(job.platform.as_deref(), Some("workday"));
        assert_eq!(job.profile.get("first_name"), Some("Ada"));
        assert_eq!(job.profile.len(), 2);
        assert!(job.file_path.is_none());
    }

    #[test]
    fn test_parse_job_rejects_missing_budget() {
        let err = parse_job("job_id = \"x\"\nurl = \"https://x\"\n").unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[tokio::test]
    async fn test_load_all_jobs_missing_folder() {
        let result = load_all_jobs("definitely-not-a-folder-7f3a").await;
        assert!(result.is_err());
    }
}

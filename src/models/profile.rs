//! 申请人档案与作业描述

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 申请人档案
///
/// 对编排器来说是不透明的键值表，只有匹配环节会读取。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    values: BTreeMap<String, String>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 一个待处理的申请作业（来自 TOML 文件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: String,
    /// 申请表入口地址
    pub url: String,
    /// 本作业允许花费的上限（美元）
    pub budget: f64,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub profile: Profile,
    /// 来源文件路径（加载后设置）
    #[serde(skip)]
    pub file_path: Option<String>,
}

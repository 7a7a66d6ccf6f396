//! LLM 服务 - 业务能力层
//!
//! 只负责"LLM 判断"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::{Field, Profile};

/// LLM 给出的单条字段匹配
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmFieldMatch {
    pub field_id: String,
    pub profile_key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// LLM 服务
///
/// 职责：
/// - 提供通用的 LLM 调用接口
/// - 把一页上的字段匹配到档案键
/// - 不关心页面、预算和升级顺序
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    ///
    /// 其他所有 LLM 相关功能都基于此函数。
    ///
    /// # 示例
    /// ```no_run
    /// # use apply_flow::services::LlmService;
    /// # async fn example(service: &LlmService) -> anyhow::Result<()> {
    /// let response = service.send_to_llm("你好", Some("你是一个简洁的助手")).await?;
    /// println!("LLM 响应: {}", response);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_to_llm(&self, user_message: &str, system_message: Option<&str>) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(2048u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    /// 把一页上的字段匹配到档案键
    pub async fn match_fields(&self, fields: &[Field], profile: &Profile) -> Result<Vec<LlmFieldMatch>> {
        if fields.is_empty() || profile.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "开始 LLM 字段匹配，字段数量: {}, 模型: {}",
            fields.len(),
            self.model_name
        );

        let (user_message, system_message) = build_match_messages(fields, profile);
        let response = self.send_to_llm(&user_message, Some(system_message)).await?;
        let matches = parse_match_response(&response)?;

        debug!("LLM 返回 {} 条匹配", matches.len());
        Ok(matches)
    }
}

const MATCH_SYSTEM_PROMPT: &str = "你是一个表单填写助手。根据申请人档案判断表单上每个字段应填写哪个档案键。\
只返回 JSON 数组，不要返回任何其他内容。";

/// 构建字段匹配消息
///
/// 返回 (user_message, system_message)
fn build_match_messages(fields: &[Field], profile: &Profile) -> (String, &'static str) {
    let field_list: Vec<serde_json::Value> = fields
        .iter()
        .map(|f| {
            let mut entry = serde_json::json!({
                "field_id": f.id,
                "label": f.label,
                "kind": f.kind.as_str(),
                "required": f.required,
            });
            if let Some(name) = &f.name {
                entry["name"] = serde_json::json!(name);
            }
            if !f.options.is_empty() {
                entry["options"] = serde_json::json!(f.options);
            }
            entry
        })
        .collect();

    let profile_list: Vec<serde_json::Value> = profile
        .iter()
        .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
        .collect();

    let user_message = format!(
        r#"表单字段：
{}

申请人档案：
{}

【要求】
- 只匹配能确定对应关系的字段，无法判断的字段不要返回
- 下拉框 / 单选组的 value 必须取自 options 中的一项
- confidence 取值 0 到 1

返回格式：
[{{"field_id": "...", "profile_key": "...", "value": "...", "confidence": 0.9}}]"#,
        serde_json::to_string_pretty(&field_list).unwrap_or_default(),
        serde_json::to_string_pretty(&profile_list).unwrap_or_default(),
    );

    (user_message, MATCH_SYSTEM_PROMPT)
}

/// 解析字段匹配响应
///
/// 允许响应被代码块包裹或前后带有说明文字。
fn parse_match_response(response: &str) -> Result<Vec<LlmFieldMatch>, LlmError> {
    let unparsable = || LlmError::UnparsableResponse {
        response: response.chars().take(200).collect(),
    };

    let start = response.find('[').ok_or_else(unparsable)?;
    let end = response.rfind(']').ok_or_else(unparsable)?;
    if end < start {
        return Err(unparsable());
    }

    let mut matches: Vec<LlmFieldMatch> =
        serde_json::from_str(&response[start..=end]).map_err(|_| unparsable())?;

    matches.retain(|m| !m.field_id.is_empty() && !m.profile_key.is_empty());
    for m in &mut matches {
        m.confidence = if m.confidence.is_finite() {
            m.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    Ok(matches)
}

#![allow(dead_code)]

use anyhow::anyhow;
use archgraph_ai::{
    GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message, MessageRole,
    ProviderCharacteristics,
};
use archgraph_core::RelationshipSample;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Replays canned completions in order and records every user prompt.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        _config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        if let Some(user) = messages.iter().find(|m| m.role == MessageRole::User) {
            self.prompts.lock().push(user.content.clone());
        }
        let content = self
            .responses
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("completion service unavailable"))?;
        Ok(LLMResponse {
            content,
            total_tokens: None,
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: Some("stop".to_string()),
            model: "scripted".to_string(),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: 8192,
            avg_latency_ms: 0,
            rpm_limit: None,
            supports_streaming: false,
        }
    }
}

pub fn sample(from: &str, to: &str) -> RelationshipSample {
    RelationshipSample {
        from_symbol: from.to_string(),
        to_symbol: to.to_string(),
        kind: "calls".to_string(),
        description: None,
    }
}

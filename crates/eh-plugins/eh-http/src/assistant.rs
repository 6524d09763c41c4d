use async_trait::async_trait;
use eh_core::{AssistantApi, ChatMessage};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

const CHAT_PATH: &str = "user/chat-support";

pub struct HttpAssistantApi {
    client: ApiClient,
}

impl HttpAssistantApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    reply: Option<String>,
}

#[async_trait]
impl AssistantApi for HttpAssistantApi {
    async fn chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let request = self.client.post(CHAT_PATH).json(&ChatRequest { messages });
        let resp = self.client.send(request).await?;
        let body: ChatResponse = ApiClient::parse(resp).await?;
        Ok(body.reply.unwrap_or_default())
    }
}

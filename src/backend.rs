use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::history::Turn;

#[derive(Serialize)]
struct ChatRequest<'a> {
    history: &'a [Turn],
    message: &'a str,
    system_instruction: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// Client for the remote chat backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send one user message together with the prior history and the
    /// grounding instruction. Non-2xx statuses and transport errors are
    /// reported uniformly; the caller turns either into a visible error turn.
    pub async fn send(
        &self,
        history: &[Turn],
        message: &str,
        system_instruction: &str,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest { history, message, system_instruction };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("chat request failed with status: {}", response.status()));
        }

        let reply: ChatResponse = response.json().await?;
        Ok(reply.response)
    }
}

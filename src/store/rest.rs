//! REST key-value store backend (Upstash / Vercel KV protocol).
//!
//! Each command is one `POST <base>` whose body is the command as a JSON
//! array of strings, authenticated with `Authorization: Bearer <token>`. The
//! store replies `{"result": ...}` on success and `{"error": "..."}` when it
//! refuses the command.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{KvStore, StoreError, StoreResult};

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// `KvStore` backed by an Upstash-compatible REST endpoint.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl RestStore {
    /// Creates a store client. `timeout` bounds every individual command.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout,
        }
    }

    async fn command(&self, args: &[&str]) -> StoreResult<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .json(args)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(StoreError::Unavailable(format!("HTTP {status}")));
        }

        let reply: RestReply = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedReply(format!("HTTP {status}: {e}")))?;

        if let Some(error) = reply.error {
            return Err(StoreError::Rejected(error));
        }
        if !status.is_success() {
            return Err(StoreError::Rejected(format!("HTTP {status}")));
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl KvStore for RestStore {
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let result = self.command(&["INCR", key]).await?;
        let count = match &result {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        count.ok_or_else(|| StoreError::UnexpectedReply(format!("INCR returned {result}")))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let secs = ttl.as_secs().to_string();
        self.command(&["EXPIRE", key, &secs]).await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        match ttl {
            Some(ttl) => {
                let secs = ttl.as_secs().to_string();
                self.command(&["SET", key, value, "EX", &secs]).await?
            }
            None => self.command(&["SET", key, value]).await?,
        };
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

//! Upstash REST client
//!
//! Each Redis command is sent as a JSON array (`["INCR", "key"]`) in a POST
//! to the database URL with a bearer token. Replies are
//! `{"result": ...}` or `{"error": "..."}`.

use super::{KvError, KvStore};
use async_trait::async_trait;
use reqwest::Client;
use reso_common::LogArea;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Default timeout for key-value requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

/// [`KvStore`] backed by an Upstash (Redis over REST) database
#[derive(Debug, Clone)]
pub struct UpstashKv {
    http_client: Client,
    rest_url: String,
    rest_token: String,
}

impl UpstashKv {
    pub fn new(rest_url: impl Into<String>, rest_token: impl Into<String>) -> Result<Self, KvError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| KvError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            rest_token: rest_token.into(),
        })
    }

    async fn command(&self, args: Value) -> Result<Value, KvError> {
        debug!(area = %LogArea::ExtKv, command = %args, "Sending key-value command");

        let response = self
            .http_client
            .post(&self.rest_url)
            .bearer_auth(&self.rest_token)
            .json(&args)
            .send()
            .await
            .map_err(|e| KvError::Network(e.to_string()))?;

        let status = response.status();
        let reply: CommandReply = response
            .json()
            .await
            .map_err(|e| KvError::Api(format!("Unreadable reply ({}): {}", status, e)))?;

        if let Some(error) = reply.error {
            return Err(KvError::Api(error));
        }
        if !status.is_success() {
            return Err(KvError::Api(format!("HTTP {}", status)));
        }

        Ok(reply.result)
    }
}

/// Interpret an integer reply; Upstash may return numbers or numeric strings
fn reply_as_i64(value: &Value) -> Result<i64, KvError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| KvError::Value(format!("non-integer reply {}", n))),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| KvError::Value(format!("non-integer reply '{}'", s))),
        other => Err(KvError::Value(format!("unexpected reply {}", other))),
    }
}

#[async_trait]
impl KvStore for UpstashKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        let args = match ttl {
            Some(ttl) => json!(["SET", key, value, "EX", ttl.as_secs().max(1)]),
            None => json!(["SET", key, value]),
        };
        self.command(args).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let reply = self.command(json!(["INCR", key])).await?;
        reply_as_i64(&reply)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let reply = self
            .command(json!(["EXPIRE", key, ttl.as_secs().max(1)]))
            .await?;
        Ok(reply_as_i64(&reply)? == 1)
    }

    async fn del(&self, key: &str) -> Result<bool, KvError> {
        let reply = self.command(json!(["DEL", key])).await?;
        Ok(reply_as_i64(&reply)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_incr_sends_command_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!(["INCR", "ratelimit:1.2.3.4:/api/recommendations"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 4 })))
            .expect(1)
            .mount(&server)
            .await;

        let kv = UpstashKv::new(server.uri(), "secret").unwrap();
        let count = kv.incr("ratelimit:1.2.3.4:/api/recommendations").await.unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;

        let kv = UpstashKv::new(server.uri(), "secret").unwrap();
        assert!(kv.get("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_with_ttl_uses_ex() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!(["SET", "k", "v", "EX", 60])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "OK" })))
            .expect(1)
            .mount(&server)
            .await;

        let kv = UpstashKv::new(server.uri(), "secret").unwrap();
        kv.set("k", "v", Some(Duration::from_secs(60))).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_reply_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "WRONGTYPE" })),
            )
            .mount(&server)
            .await;

        let kv = UpstashKv::new(server.uri(), "secret").unwrap();
        match kv.incr("k").await {
            Err(KvError::Api(msg)) => assert_eq!(msg, "WRONGTYPE"),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_reply_as_i64_accepts_strings() {
        assert_eq!(reply_as_i64(&json!("12")).unwrap(), 12);
        assert_eq!(reply_as_i64(&json!(7)).unwrap(), 7);
        assert!(reply_as_i64(&json!(null)).is_err());
    }
}

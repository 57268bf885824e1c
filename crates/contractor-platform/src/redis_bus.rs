use anyhow::{Context, Result};
use async_trait::async_trait;
use contractor_core::{BrokerError, BrokerMessage, MessageBroker};
use redis::{Client, RedisError, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tracing::warn;

/// Redis Streams broker. A message counts as confirmed once `XADD` returns
/// the stream entry id.
pub struct RedisBus {
    client: Client,
    stream: String,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisBus {
    pub fn connect(redis_url: &str, stream: impl Into<String>) -> Result<Self> {
        let client = Client::open(redis_url).context("invalid REDIS_URL")?;
        Ok(Self {
            client,
            stream: stream.into(),
            connection: Mutex::new(None),
        })
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    async fn connection(&self) -> Result<MultiplexedConnection, RedisError> {
        let mut cached = self.connection.lock().await;
        if let Some(connection) = cached.as_ref() {
            return Ok(connection.clone());
        }

        let connection = self.client.get_multiplexed_async_connection().await?;
        *cached = Some(connection.clone());
        Ok(connection)
    }

    async fn reset_connection(&self) {
        self.connection.lock().await.take();
    }
}

#[async_trait]
impl MessageBroker for RedisBus {
    async fn publish_confirmed(&self, message: &BrokerMessage) -> Result<String, BrokerError> {
        let mut connection = self.connection().await.map_err(classify)?;

        let entry: Result<String, RedisError> = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg("message_id")
            .arg(message.message_id.to_string())
            .arg("event_type")
            .arg(message.event_type.as_str())
            .arg("payload")
            .arg(&message.payload)
            .query_async(&mut connection)
            .await;

        match entry {
            Ok(entry_id) => Ok(entry_id),
            Err(err) => {
                let err = classify(err);
                if matches!(err, BrokerError::Transport(_)) {
                    warn!(stream = %self.stream, "dropping redis connection after transport error");
                    self.reset_connection().await;
                }
                Err(err)
            }
        }
    }
}

fn classify(err: RedisError) -> BrokerError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        BrokerError::Transport(err.to_string())
    } else {
        BrokerError::Rejected(err.to_string())
    }
}

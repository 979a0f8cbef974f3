use super::{IndexOp, RankingIndex};
use crate::error::IndexError;
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, Script};
use tracing::{debug, info};

/// Collects the keys matching `ARGV[1]`, appends the remaining arguments as
/// literal keys and deletes all of them. `unpack` is bounded by the Lua stack,
/// hence the chunks.
const CLEAR_NAMESPACE_SCRIPT: &str = r"
local keys = redis.call('KEYS', ARGV[1])
for i = 2, #ARGV do
    table.insert(keys, ARGV[i])
end
local deleted = 0
for i = 1, #keys, 5000 do
    deleted = deleted + redis.call('DEL', unpack(keys, i, math.min(i + 4999, #keys)))
end
return deleted
";

#[derive(Clone)]
pub struct RedisRankingIndex {
    connection: MultiplexedConnection
}

impl RedisRankingIndex {
    pub async fn connect(url: &str) -> Result<Self, IndexError> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Connected to the ranking index");

        Ok(RedisRankingIndex { connection })
    }
}

#[async_trait]
impl RankingIndex for RedisRankingIndex {
    async fn clear_namespace(&self, prefix: &str, extra_keys: &[&str]) -> Result<u64, IndexError> {
        let mut connection = self.connection.clone();
        let script = Script::new(CLEAR_NAMESPACE_SCRIPT);

        let mut invocation = script.prepare_invoke();
        invocation.arg(format!("{}:*", prefix));
        for key in extra_keys {
            invocation.arg(*key);
        }

        let deleted: u64 = invocation.invoke_async(&mut connection).await?;
        debug!(prefix, deleted, "Cleared ranking namespace");

        Ok(deleted)
    }

    async fn apply(&self, ops: &[IndexOp]) -> Result<(), IndexError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut connection = self.connection.clone();
        let mut pipe = redis::pipe();
        for op in ops {
            match op {
                IndexOp::AddMember { key, member, score } => pipe.zadd(key, member, *score).ignore(),
                IndexOp::IncrementMember { key, member, by } => pipe.zincr(key, member, *by).ignore()
            };
        }

        let _: () = pipe.query_async(&mut connection).await?;
        Ok(())
    }

    async fn set_value(&self, key: &str, value: i64) -> Result<(), IndexError> {
        let mut connection = self.connection.clone();
        let _: () = connection.set(key, value).await?;

        Ok(())
    }
}

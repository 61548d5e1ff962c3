use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns `true` while `subject` is within `limit` requests
    /// for the current window.
    pub async fn check_rate_limit(
        &self,
        subject: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = rate_limit_key(subject, chrono::Utc::now().timestamp(), window_seconds);

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

fn rate_limit_key(subject: &str, now: i64, window_seconds: i64) -> String {
    let window = now / window_seconds.max(1);
    format!("rate:{}:{}", subject, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_buckets_by_window() {
        assert_eq!(rate_limit_key("10.0.0.1", 120, 60), "rate:10.0.0.1:2");
        assert_eq!(rate_limit_key("10.0.0.1", 179, 60), "rate:10.0.0.1:2");
        assert_eq!(rate_limit_key("10.0.0.1", 180, 60), "rate:10.0.0.1:3");
        assert_eq!(rate_limit_key("10.0.0.1", 5, 0), "rate:10.0.0.1:5");
    }
}

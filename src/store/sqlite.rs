// src/store/sqlite.rs
// SQLite-backed transcript store

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::{EventRecord, EventType, SessionMetadata, TranscriptStore};

pub struct SqliteTranscriptStore {
    pool: SqlitePool,
}

fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SqliteTranscriptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn insert_session(
        &self,
        session_id: &str,
        user_id: &str,
        start_time: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_metadata (session_id, user_id, start_time)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(start_time)
        .execute(&self.pool)
        .await?;

        debug!(session_id = %session_id, "Inserted open session record");
        Ok(())
    }

    async fn append_event(
        &self,
        session_id: &str,
        event_type: EventType,
        content: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_log (session_id, event_type, content, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(event_type.as_str())
        .bind(content)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_session_close(
        &self,
        session_id: &str,
        end_time: i64,
        summary: &str,
        duration_seconds: i64,
    ) -> Result<()> {
        // The end_time guard keeps the open -> closed transition one-way;
        // a redelivered close is a no-op.
        let result = sqlx::query(
            r#"
            UPDATE session_metadata
            SET end_time = ?, session_summary = ?, duration_seconds = ?
            WHERE session_id = ? AND end_time IS NULL
            "#,
        )
        .bind(end_time)
        .bind(summary)
        .bind(duration_seconds)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(session_id = %session_id, "Session close skipped (already closed or unknown)");
        }

        Ok(())
    }

    async fn fetch_events(&self, session_id: &str) -> Result<Vec<EventRecord>> {
        // id is the tiebreak for events logged within the same second
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT event_type, content, timestamp
            FROM event_log
            WHERE session_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let events = rows
            .into_iter()
            .filter_map(|(event_type, content, timestamp)| {
                EventType::from_str(&event_type).map(|event_type| EventRecord {
                    event_type,
                    content,
                    timestamp,
                })
            })
            .collect();

        Ok(events)
    }

    async fn fetch_session(&self, session_id: &str) -> Result<Option<SessionMetadata>> {
        let row: Option<(String, String, i64, Option<i64>, Option<String>, Option<i64>)> =
            sqlx::query_as(
                r#"
                SELECT session_id, user_id, start_time, end_time, session_summary, duration_seconds
                FROM session_metadata
                WHERE session_id = ?
                "#,
            )
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(
            |(session_id, user_id, start_time, end_time, session_summary, duration_seconds)| {
                SessionMetadata {
                    session_id,
                    user_id,
                    start_time,
                    end_time,
                    session_summary,
                    duration_seconds,
                }
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteTranscriptStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        SqliteTranscriptStore::new(pool)
    }

    #[tokio::test]
    async fn insert_creates_open_record() {
        let store = test_store().await;

        store.insert_session("s1", "client-1", 1000).await.unwrap();

        let meta = store.fetch_session("s1").await.unwrap().unwrap();
        assert_eq!(meta.user_id, "client-1");
        assert_eq!(meta.start_time, 1000);
        assert!(meta.end_time.is_none());
        assert!(meta.session_summary.is_none());
        assert!(meta.duration_seconds.is_none());
    }

    #[tokio::test]
    async fn events_read_back_in_append_order() {
        let store = test_store().await;

        store
            .append_event("s1", EventType::UserMessage, "hello")
            .await
            .unwrap();
        store
            .append_event("s1", EventType::AiResponse, "Hi there")
            .await
            .unwrap();
        store
            .append_event("s1", EventType::UserMessage, "more")
            .await
            .unwrap();
        store
            .append_event("s2", EventType::UserMessage, "other session")
            .await
            .unwrap();

        let events = store.fetch_events("s1").await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, EventType::UserMessage);
        assert_eq!(events[0].content, "hello");
        assert_eq!(events[1].event_type, EventType::AiResponse);
        assert_eq!(events[1].content, "Hi there");
        assert_eq!(events[2].content, "more");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let store = test_store().await;

        store.insert_session("s1", "client-1", 1000).await.unwrap();
        store
            .update_session_close("s1", 1060, "first summary", 60)
            .await
            .unwrap();
        store
            .update_session_close("s1", 9999, "second summary", 8999)
            .await
            .unwrap();

        let meta = store.fetch_session("s1").await.unwrap().unwrap();
        assert_eq!(meta.end_time, Some(1060));
        assert_eq!(meta.session_summary.as_deref(), Some("first summary"));
        assert_eq!(meta.duration_seconds, Some(60));
    }

    #[tokio::test]
    async fn close_of_unknown_session_is_not_an_error() {
        let store = test_store().await;

        store
            .update_session_close("missing", 1060, "summary", 60)
            .await
            .unwrap();

        assert!(store.fetch_session("missing").await.unwrap().is_none());
    }

    #[test]
    fn event_type_round_trips() {
        assert_eq!(
            EventType::from_str(EventType::UserMessage.as_str()),
            Some(EventType::UserMessage)
        );
        assert_eq!(
            EventType::from_str(EventType::AiResponse.as_str()),
            Some(EventType::AiResponse)
        );
        assert_eq!(EventType::from_str("tool_call"), None);
    }
}

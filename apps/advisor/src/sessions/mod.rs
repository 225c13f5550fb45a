//! Conversation bookkeeping: sessions, transcripts and recommendations.
//!
//! The advisor writes here but never reads back: history travels with each
//! request. Failures are the orchestrator's to log and swallow.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::conversation::Role;

pub mod postgres;

pub use postgres::PgConversationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

/// Longest user agent kept with a session, in characters.
const MAX_USER_AGENT_CHARS: usize = 255;

/// Who opened the session, as seen by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: Option<&str>) -> Self {
        let user_agent = user_agent
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_CHARS).collect());
        Self {
            ip: Some(ip.into()),
            user_agent,
        }
    }
}

/// Mints a new session id: `bw_` followed by 32 alphanumeric characters.
pub fn new_session_id() -> String {
    format!("bw_{}", Uuid::new_v4().simple())
}

/// Write side of the conversation log.
///
/// Carried in `AppState` as `Arc<dyn ConversationStore>`.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Records the session once; later calls for the same id are no-ops.
    async fn save_session(&self, session_id: &str, client: &ClientInfo) -> Result<(), AppError>;

    async fn save_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        tokens_used: u32,
    ) -> Result<(), AppError>;

    async fn save_recommendation(&self, session_id: &str, product_id: i64)
        -> Result<(), AppError>;

    async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), AppError>;

    /// Marks a recommended product as clicked. Returns false when the session
    /// never had that product recommended.
    async fn track_product_click(&self, session_id: &str, product_id: i64)
        -> Result<bool, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub status: SessionStatus,
    pub client: ClientInfo,
    pub messages: Vec<StoredMessage>,
    pub recommendations: Vec<i64>,
    pub clicked: Vec<i64>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            status: SessionStatus::Active,
            client: ClientInfo::default(),
            messages: Vec::new(),
            recommendations: Vec::new(),
            clicked: Vec::new(),
        }
    }
}

/// Process-local store. Sessions that were never saved are created on first write.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, session_id: &str) -> Option<SessionRecord> {
        self.lock().get(session_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionRecord>> {
        // A poisoned map is still a valid map; keep serving it.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn save_session(&self, session_id: &str, client: &ClientInfo) -> Result<(), AppError> {
        self.lock()
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord {
                client: client.clone(),
                ..SessionRecord::default()
            });
        Ok(())
    }

    async fn save_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        tokens_used: u32,
    ) -> Result<(), AppError> {
        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .messages
            .push(StoredMessage {
                role,
                content: content.to_string(),
                tokens_used,
            });
        Ok(())
    }

    async fn save_recommendation(
        &self,
        session_id: &str,
        product_id: i64,
    ) -> Result<(), AppError> {
        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .recommendations
            .push(product_id);
        Ok(())
    }

    async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), AppError> {
        self.lock().entry(session_id.to_string()).or_default().status = status;
        Ok(())
    }

    async fn track_product_click(
        &self,
        session_id: &str,
        product_id: i64,
    ) -> Result<bool, AppError> {
        let mut sessions = self.lock();
        let Some(record) = sessions.get_mut(session_id) else {
            return Ok(false);
        };
        if !record.recommendations.contains(&product_id) {
            return Ok(false);
        }
        if !record.clicked.contains(&product_id) {
            record.clicked.push(product_id);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_format() {
        let id = new_session_id();
        assert!(id.starts_with("bw_"));
        assert_eq!(id.len(), 35);
        assert!(id[3..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, new_session_id());
    }

    #[tokio::test]
    async fn test_in_memory_store_records_transcript() {
        let store = InMemoryConversationStore::new();
        store.save_session("bw_1", &ClientInfo::default()).await.unwrap();
        store
            .save_message("bw_1", Role::User, "knie", 0)
            .await
            .unwrap();
        store
            .save_message("bw_1", Role::Assistant, "{}", 120)
            .await
            .unwrap();
        store.save_recommendation("bw_1", 12).await.unwrap();
        store
            .update_session_status("bw_1", SessionStatus::Completed)
            .await
            .unwrap();

        let record = store.session("bw_1").unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.messages[1].tokens_used, 120);
        assert_eq!(record.recommendations, vec![12]);
    }

    #[tokio::test]
    async fn test_new_session_is_active() {
        let store = InMemoryConversationStore::new();
        store.save_session("bw_2", &ClientInfo::default()).await.unwrap();
        assert_eq!(store.session("bw_2").unwrap().status, SessionStatus::Active);
        assert!(store.session("bw_3").is_none());
    }

    #[tokio::test]
    async fn test_first_save_keeps_client_info() {
        let store = InMemoryConversationStore::new();
        let first = ClientInfo::new("203.0.113.7", Some("Mozilla/5.0"));
        store.save_session("bw_4", &first).await.unwrap();
        store
            .save_session("bw_4", &ClientInfo::new("192.0.2.1", None))
            .await
            .unwrap();
        assert_eq!(store.session("bw_4").unwrap().client, first);
    }

    #[test]
    fn test_client_info_trims_user_agent() {
        let long = "a".repeat(1000);
        let info = ClientInfo::new("192.0.2.1", Some(&long));
        assert_eq!(info.user_agent.unwrap().len(), 255);
        assert_eq!(ClientInfo::new("192.0.2.1", Some("  ")).user_agent, None);
    }

    #[tokio::test]
    async fn test_click_only_counts_recommended_products() {
        let store = InMemoryConversationStore::new();
        store.save_session("bw_5", &ClientInfo::default()).await.unwrap();
        store.save_recommendation("bw_5", 12).await.unwrap();

        assert!(store.track_product_click("bw_5", 12).await.unwrap());
        assert!(store.track_product_click("bw_5", 12).await.unwrap());
        assert!(!store.track_product_click("bw_5", 13).await.unwrap());
        assert!(!store.track_product_click("bw_missing", 12).await.unwrap());
        assert_eq!(store.session("bw_5").unwrap().clicked, vec![12]);
    }
}

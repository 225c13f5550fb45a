use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::conversation::Role;
use crate::sessions::{ClientInfo, ConversationStore, SessionStatus};

/// Conversation log in Postgres. Tables are created by `migrations/`.
#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn save_session(&self, session_id: &str, client: &ClientInfo) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO advisor_sessions (session_id, status, user_ip, user_agent)
            VALUES ($1, 'active', $2, $3)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(client.ip.as_deref())
        .bind(client.user_agent.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        tokens_used: u32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO advisor_messages (session_id, role, content, tokens_used)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(i64::from(tokens_used))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_recommendation(
        &self,
        session_id: &str,
        product_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO advisor_recommendations (session_id, product_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(session_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE advisor_sessions
            SET status = $2, updated_at = NOW()
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn track_product_click(
        &self,
        session_id: &str,
        product_id: i64,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE advisor_recommendations
            SET clicked = TRUE, clicked_at = NOW()
            WHERE session_id = $1 AND product_id = $2
            "#,
        )
        .bind(session_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

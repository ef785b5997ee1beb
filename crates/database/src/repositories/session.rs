use crate::error::{RepositoryError, Result};
use crate::pool::DbPool;
use domain::session::{Session, SessionKind, SessionStatus, TranscriptTurn};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: &Session) -> Result<Session> {
        let client = self.pool.get().await?;
        let transcript = serde_json::to_value(&session.transcript)
            .map_err(|e| RepositoryError::Pool(e.to_string()))?;
        let row = client
            .query_one(
                r#"
                INSERT INTO sessions (id, owner_id, avatar_id, kind, language, started_at, status, transcript)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
                &[
                    &session.id,
                    &session.owner_id,
                    &session.avatar_id,
                    &session.kind.to_string(),
                    &session.language,
                    &session.started_at,
                    &session.status.to_string(),
                    &transcript,
                ],
            )
            .await?;
        self.row_to_session(row)
    }

    pub async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE sessions SET status = $2 WHERE id = $1",
                &[&id, &status.to_string()],
            )
            .await?;
        Ok(())
    }

    pub async fn append_turn(&self, id: Uuid, turn: &TranscriptTurn) -> Result<()> {
        let client = self.pool.get().await?;
        let turn_json =
            serde_json::to_value(turn).map_err(|e| RepositoryError::Pool(e.to_string()))?;
        client
            .execute(
                "UPDATE sessions SET transcript = transcript || $2::jsonb WHERE id = $1",
                &[&id, &serde_json::json!([turn_json])],
            )
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Session>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM sessions WHERE id = $1", &[&id])
            .await?;
        row.map(|r| self.row_to_session(r)).transpose()
    }

    fn row_to_session(&self, row: tokio_postgres::Row) -> Result<Session> {
        let kind_str: String = row.try_get("kind")?;
        let kind = SessionKind::from_str(&kind_str).map_err(|_| {
            RepositoryError::UnrecognizedEnum {
                field: "kind",
                value: kind_str,
            }
        })?;
        let status_str: String = row.try_get("status")?;
        let status = SessionStatus::from_str(&status_str).map_err(|_| {
            RepositoryError::UnrecognizedEnum {
                field: "status",
                value: status_str,
            }
        })?;
        let transcript_json: serde_json::Value = row.try_get("transcript")?;
        let transcript: Vec<TranscriptTurn> =
            serde_json::from_value(transcript_json).map_err(|e| RepositoryError::Pool(e.to_string()))?;

        Ok(Session {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            avatar_id: row.try_get("avatar_id")?,
            kind,
            language: row.try_get("language")?,
            started_at: row.try_get("started_at")?,
            status,
            transcript,
        })
    }
}

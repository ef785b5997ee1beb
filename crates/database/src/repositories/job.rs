use crate::error::{RepositoryError, Result};
use crate::pool::DbPool;
use chrono::Utc;
use domain::job::{GenerationJob, InputMode, JobKind, JobStatus, Quality};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct JobRepository {
    pool: DbPool,
}

impl JobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job: &GenerationJob) -> Result<GenerationJob> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO generation_jobs (
                    id, owner_id, avatar_id, kind, input_mode, script_text,
                    source_audio_url, quality, language, upstream_task_id,
                    audio_url, result_url, status, progress, error_message,
                    created_at, completed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                RETURNING *
                "#,
                &[
                    &job.id,
                    &job.owner_id,
                    &job.avatar_id,
                    &job.kind.to_string(),
                    &job.input_mode.to_string(),
                    &job.script_text,
                    &job.source_audio_url,
                    &job.quality.as_str(),
                    &job.language,
                    &job.upstream_task_id,
                    &job.audio_url,
                    &job.result_url,
                    &job.status.to_string(),
                    &(job.progress as i16),
                    &job.error_message,
                    &job.created_at,
                    &job.completed_at,
                ],
            )
            .await?;
        debug!(job_id = %job.id, "created generation job");
        self.row_to_job(row)
    }

    /// Internal lookup used by the scheduler/runners, which only ever see a
    /// `job_id` (ownership was already checked at the HTTP boundary when the
    /// job was created).
    pub async fn get_by_id_unchecked(&self, id: Uuid) -> Result<Option<GenerationJob>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM generation_jobs WHERE id = $1", &[&id])
            .await?;
        row.map(|r| self.row_to_job(r)).transpose()
    }

    /// Looks a job up by the task id the video worker was handed at enqueue
    /// time, used by `/worker/callback` (`spec.md` §4.10) which only knows
    /// that id, not the job's own UUID.
    pub async fn get_by_upstream_task_id(&self, task_id: &str) -> Result<Option<GenerationJob>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM generation_jobs WHERE upstream_task_id = $1",
                &[&task_id],
            )
            .await?;
        row.map(|r| self.row_to_job(r)).transpose()
    }

    pub async fn get_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<Option<GenerationJob>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM generation_jobs WHERE id = $1 AND owner_id = $2",
                &[&id, &owner_id],
            )
            .await?;
        row.map(|r| self.row_to_job(r)).transpose()
    }

    /// Applies a validated state transition. The set of source statuses
    /// allowed to reach `next_status` is derived from
    /// `JobStatus::can_transition_to` (`spec.md` §4.3), plus `next_status`
    /// itself when it is non-terminal (runners re-issue `Processing` with an
    /// updated `progress` many times over a single job's life; that is a
    /// progress update, not a state change, so it stays legal). Checked in
    /// the same atomic `UPDATE ... WHERE status = ANY(...)`, so a concurrent
    /// caller cannot race a row past a transition the state graph forbids
    /// (e.g. `queued -> completed` directly, or leaving a terminal state).
    /// Returns `Ok(None)` if the row vanished or no longer sits in one of
    /// those source statuses.
    pub async fn transition(
        &self,
        id: Uuid,
        next_status: JobStatus,
        progress: Option<u8>,
        result_url: Option<String>,
        error_message: Option<String>,
        completed_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<Option<GenerationJob>> {
        let mut allowed_sources: Vec<String> = [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::TimedOut,
        ]
        .into_iter()
        .filter(|source| source.can_transition_to(next_status))
        .map(|source| source.to_string())
        .collect();

        if !next_status.is_terminal() {
            let reentrant = next_status.to_string();
            if !allowed_sources.contains(&reentrant) {
                allowed_sources.push(reentrant);
            }
        }

        if allowed_sources.is_empty() {
            return Ok(None);
        }

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE generation_jobs
                SET status = $2,
                    progress = COALESCE($3, progress),
                    result_url = COALESCE($4, result_url),
                    error_message = COALESCE($5, error_message),
                    completed_at = COALESCE($6, completed_at)
                WHERE id = $1
                  AND status = ANY($7)
                RETURNING *
                "#,
                &[
                    &id,
                    &next_status.to_string(),
                    &progress.map(|p| p as i16),
                    &result_url,
                    &error_message,
                    &completed_at,
                    &allowed_sources,
                ],
            )
            .await?;
        row.map(|r| self.row_to_job(r)).transpose()
    }

    pub async fn set_upstream_task_id(&self, id: Uuid, task_id: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE generation_jobs SET upstream_task_id = $2 WHERE id = $1",
                &[&id, &task_id],
            )
            .await?;
        Ok(())
    }

    /// Jobs stuck in `processing` with no activity past `stale_after`, used by
    /// the reaper (`spec.md` §5) to requeue orphaned work after a crash.
    pub async fn list_stale_processing(
        &self,
        stale_after: chrono::DateTime<Utc>,
    ) -> Result<Vec<GenerationJob>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM generation_jobs WHERE status = 'processing' AND created_at < $1",
                &[&stale_after],
            )
            .await?;
        rows.into_iter().map(|r| self.row_to_job(r)).collect()
    }

    /// Deletes the row. Returns whether a row was actually removed, so the
    /// route layer can 404 on an unknown/foreign id (`spec.md` §6.1).
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let rows = client
            .execute(
                "DELETE FROM generation_jobs WHERE id = $1 AND owner_id = $2",
                &[&id, &owner_id],
            )
            .await?;
        Ok(rows > 0)
    }

    pub async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GenerationJob>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT * FROM generation_jobs
                WHERE owner_id = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
                &[&owner_id, &limit, &offset],
            )
            .await?;
        rows.into_iter().map(|r| self.row_to_job(r)).collect()
    }

    fn row_to_job(&self, row: tokio_postgres::Row) -> Result<GenerationJob> {
        let kind_str: String = row.try_get("kind")?;
        let kind = JobKind::from_str(&kind_str).map_err(|_| RepositoryError::UnrecognizedEnum {
            field: "kind",
            value: kind_str,
        })?;

        let input_mode_str: String = row.try_get("input_mode")?;
        let input_mode =
            InputMode::from_str(&input_mode_str).map_err(|_| RepositoryError::UnrecognizedEnum {
                field: "input_mode",
                value: input_mode_str,
            })?;

        let quality_str: String = row.try_get("quality")?;
        let quality =
            Quality::from_str(&quality_str).map_err(|_| RepositoryError::UnrecognizedEnum {
                field: "quality",
                value: quality_str,
            })?;

        let status_str: String = row.try_get("status")?;
        let status =
            JobStatus::from_str(&status_str).map_err(|_| RepositoryError::UnrecognizedEnum {
                field: "status",
                value: status_str,
            })?;

        let progress: i16 = row.try_get("progress")?;

        Ok(GenerationJob {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            avatar_id: row.try_get("avatar_id")?,
            kind,
            input_mode,
            script_text: row.try_get("script_text")?,
            source_audio_url: row.try_get("source_audio_url")?,
            quality,
            language: row.try_get("language")?,
            upstream_task_id: row.try_get("upstream_task_id")?,
            audio_url: row.try_get("audio_url")?,
            result_url: row.try_get("result_url")?,
            status,
            progress: progress as u8,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

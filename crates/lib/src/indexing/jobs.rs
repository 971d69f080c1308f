use super::{IndexError, IndexReport, IndexRequest};
use crate::{
    errors::ProviderError,
    providers::db::sqlite::{integer, now_timestamp, opt_text, parse_timestamp, text},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;
use turso::{params, Connection, Database, Row};
use uuid::Uuid;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lifecycle state of an indexing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// The persisted intent to index one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexJob {
    pub id: String,
    pub item_id: String,
    pub request: IndexRequest,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub outcome: Option<IndexReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str = "id, item_id, request, status, attempts, max_attempts, last_error, outcome, created_at, updated_at";

fn job_from_row(row: &Row) -> Result<IndexJob, IndexError> {
    let id = text(row, 0)?;
    let invalid = |reason: String| IndexError::InvalidJob {
        id: id.clone(),
        reason,
    };
    let request = serde_json::from_str(&text(row, 2)?).map_err(|e| invalid(e.to_string()))?;
    let status = text(row, 3)?.parse().map_err(invalid)?;
    let outcome = opt_text(row, 7)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;

    Ok(IndexJob {
        item_id: text(row, 1)?,
        request,
        status,
        attempts: integer(row, 4)?.max(0) as u32,
        max_attempts: integer(row, 5)?.max(1) as u32,
        last_error: opt_text(row, 6)?,
        outcome,
        created_at: parse_timestamp(&text(row, 8)?)?,
        updated_at: parse_timestamp(&text(row, 9)?)?,
        id,
    })
}

/// Durable job records in the `index_jobs` table.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
}

impl Debug for JobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobStore").finish_non_exhaustive()
    }
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn connect(&self) -> Result<Connection, ProviderError> {
        self.db
            .connect()
            .map_err(|e| ProviderError::StorageConnection(e.to_string()))
    }

    /// Records a new pending job for `request`.
    pub async fn create(
        &self,
        request: &IndexRequest,
        max_attempts: u32,
    ) -> Result<IndexJob, IndexError> {
        let conn = self.connect()?;
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let request_json = serde_json::to_string(request).map_err(ProviderError::from)?;

        conn.execute(
            &format!("INSERT INTO index_jobs ({JOB_COLUMNS}) VALUES (?, ?, ?, ?, 0, ?, NULL, NULL, ?, ?)"),
            params![
                id.as_str(),
                request.id.as_str(),
                request_json,
                JobStatus::Pending.as_str(),
                i64::from(max_attempts.max(1)),
                now.as_str(),
                now.as_str()
            ],
        )
        .await
        .map_err(ProviderError::from)?;

        self.get(&id).await?.ok_or_else(|| IndexError::InvalidJob {
            id,
            reason: "job vanished after insert".to_string(),
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<IndexJob>, IndexError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {JOB_COLUMNS} FROM index_jobs WHERE id = ?"),
                params![id],
            )
            .await
            .map_err(ProviderError::from)?;
        match rows.next().await.map_err(ProviderError::from)? {
            Some(row) => Ok(Some(job_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Jobs newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<JobStatus>,
        limit: u32,
    ) -> Result<Vec<IndexJob>, IndexError> {
        let conn = self.connect()?;
        let mut rows = match status {
            Some(status) => conn
                .query(
                    &format!(
                        "SELECT {JOB_COLUMNS} FROM index_jobs WHERE status = ? ORDER BY created_at DESC LIMIT {limit}"
                    ),
                    params![status.as_str()],
                )
                .await
                .map_err(ProviderError::from)?,
            None => conn
                .query(
                    &format!(
                        "SELECT {JOB_COLUMNS} FROM index_jobs ORDER BY created_at DESC LIMIT {limit}"
                    ),
                    (),
                )
                .await
                .map_err(ProviderError::from)?,
        };
        collect_jobs(&mut rows).await
    }

    /// Jobs that were accepted but never finished, oldest first.
    pub async fn unfinished(&self) -> Result<Vec<IndexJob>, IndexError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM index_jobs WHERE status IN ('pending', 'running') ORDER BY created_at ASC"
                ),
                (),
            )
            .await
            .map_err(ProviderError::from)?;
        collect_jobs(&mut rows).await
    }

    /// Moves a job to `running` and counts the attempt.
    pub async fn start_attempt(&self, id: &str) -> Result<(), IndexError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE index_jobs SET status = ?, attempts = attempts + 1, updated_at = ? WHERE id = ?",
            params![JobStatus::Running.as_str(), now_timestamp(), id],
        )
        .await
        .map_err(ProviderError::from)?;
        Ok(())
    }

    pub async fn complete(&self, id: &str, outcome: &IndexReport) -> Result<(), IndexError> {
        let conn = self.connect()?;
        let outcome_json = serde_json::to_string(outcome).map_err(ProviderError::from)?;
        conn.execute(
            "UPDATE index_jobs SET status = ?, outcome = ?, last_error = NULL, updated_at = ? WHERE id = ?",
            params![JobStatus::Done.as_str(), outcome_json, now_timestamp(), id],
        )
        .await
        .map_err(ProviderError::from)?;
        Ok(())
    }

    /// Records a failed attempt. `terminal` decides between `failed` and back to `pending`.
    pub async fn record_failure(
        &self,
        id: &str,
        error: &str,
        terminal: bool,
    ) -> Result<(), IndexError> {
        let status = if terminal {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };
        let conn = self.connect()?;
        conn.execute(
            "UPDATE index_jobs SET status = ?, last_error = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), error, now_timestamp(), id],
        )
        .await
        .map_err(ProviderError::from)?;
        Ok(())
    }
}

async fn collect_jobs(rows: &mut turso::Rows) -> Result<Vec<IndexJob>, IndexError> {
    let mut jobs = Vec::new();
    while let Some(row) = rows.next().await.map_err(ProviderError::from)? {
        jobs.push(job_from_row(&row)?);
    }
    Ok(jobs)
}

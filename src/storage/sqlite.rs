use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::metrics::{LogStatus, ProcessingLogEntry};
use crate::model::{Claim, ClaimType, Evidence, VerdictLabel, Verification, Video, VideoStatus};

use super::error::StorageError;
use super::{Store, check_claim_set};
use super::types::StoredVideo;

pub const SCHEMA_VERSION: i64 = 2;

/// SQLite-backed [`Store`]. Statements run on the blocking pool behind one connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        schema_version(&self.conn.lock())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::TaskJoin(e.to_string()))?
    }
}

fn schema_version(conn: &Connection) -> Result<i64, StorageError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn migrate(conn: &Connection) -> Result<(), StorageError> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchemaVersion {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    if current < 1 {
        let sql = include_str!("../../migrations/0001_claimflow_schema.sql");
        conn.execute_batch(sql)?;
        conn.execute("PRAGMA user_version = 1", []).map(|_| ())?;
        debug!(version = 1, "Applied storage migration");
    }

    if current < 2 {
        let sql = include_str!("../../migrations/0002_verification_evidence_ids.sql");
        conn.execute_batch(sql)?;
        conn.execute("PRAGMA user_version = 2", []).map(|_| ())?;
        debug!(version = 2, "Applied storage migration");
    }

    Ok(())
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64, column: &str) -> Result<usize, StorageError> {
    usize::try_from(value)
        .map_err(|_| StorageError::Decode(format!("{column} out of range: {value}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Decode(format!("timestamp '{value}': {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|err| StorageError::Serialization(err.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, StorageError> {
    serde_json::from_str(value).map_err(|err| StorageError::Decode(err.to_string()))
}

#[async_trait]
impl Store for SqliteStore {
    async fn write_video(&self, video: &Video, status: &VideoStatus) -> Result<(), StorageError> {
        let video = video.clone();
        let status_json = to_json(status)?;
        let status = status.as_str();

        self.with_conn(move |conn| {
            conn.execute(
                "
                INSERT INTO videos (
                    video_id, transcript, duration_secs, language, status, status_json, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(video_id) DO UPDATE SET
                    transcript=excluded.transcript,
                    duration_secs=excluded.duration_secs,
                    language=excluded.language,
                    status=excluded.status,
                    status_json=excluded.status_json,
                    updated_at=excluded.updated_at
                ",
                params![
                    video.id,
                    video.transcript,
                    video.duration_secs,
                    video.language,
                    status,
                    status_json,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn replace_claims(
        &self,
        video_id: &str,
        claims: &[Claim],
        evidence: &[Evidence],
    ) -> Result<(), StorageError> {
        check_claim_set(video_id, claims, evidence)?;
        let video_id = video_id.to_string();
        let claims = claims.to_vec();
        let evidence = evidence.to_vec();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut select = tx.prepare("SELECT claim_id FROM claims WHERE video_id = ?1")?;
                let previous = select
                    .query_map(params![video_id], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                let dropped: Vec<_> = previous
                    .into_iter()
                    .filter(|id| !claims.iter().any(|c| &c.id == id))
                    .collect();

                tx.execute(
                    "DELETE FROM evidence
                     WHERE claim_id IN (SELECT claim_id FROM claims WHERE video_id = ?1)",
                    params![video_id],
                )?;
                for claim_id in &dropped {
                    tx.execute(
                        "DELETE FROM verifications WHERE claim_id = ?1",
                        params![claim_id],
                    )?;
                    tx.execute("DELETE FROM claims WHERE claim_id = ?1", params![claim_id])?;
                }
                if !dropped.is_empty() {
                    debug!(video_id = %video_id, dropped = dropped.len(), "Removed stale claims");
                }

                let mut stmt = tx.prepare(
                    "
                    INSERT INTO claims (
                        claim_id, video_id, position, text, claim_type, confidence,
                        fingerprint, duplicate_of
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(claim_id) DO UPDATE SET
                        video_id=excluded.video_id,
                        position=excluded.position,
                        text=excluded.text,
                        claim_type=excluded.claim_type,
                        confidence=excluded.confidence,
                        fingerprint=excluded.fingerprint,
                        duplicate_of=excluded.duplicate_of
                    ",
                )?;
                for claim in &claims {
                    stmt.execute(params![
                        claim.id,
                        claim.video_id,
                        to_i64(claim.position),
                        claim.text,
                        claim.claim_type.as_str(),
                        f64::from(claim.confidence),
                        claim.fingerprint,
                        claim.duplicate_of,
                    ])?;
                }

                let mut stmt = tx.prepare(
                    "
                    INSERT INTO evidence (
                        evidence_id, claim_id, title, url, snippet, relevance_score,
                        retrieval_position, rank
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ",
                )?;
                for item in &evidence {
                    stmt.execute(params![
                        item.id,
                        item.claim_id,
                        item.title,
                        item.url,
                        item.snippet,
                        f64::from(item.relevance_score),
                        to_i64(item.retrieval_position),
                        to_i64(item.rank),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn write_verifications(
        &self,
        verifications: &[Verification],
    ) -> Result<(), StorageError> {
        let rows = verifications
            .iter()
            .map(|v| {
                Ok::<_, StorageError>((
                    v.clone(),
                    to_json(&v.citations)?,
                    to_json(&v.evidence_ids)?,
                ))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "
                    INSERT INTO verifications (
                        verification_id, claim_id, label, confidence, explanation,
                        citations_json, evidence_ids_json, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ",
                )?;
                for (verification, citations_json, evidence_ids_json) in &rows {
                    stmt.execute(params![
                        verification.id,
                        verification.claim_id,
                        verification.label.as_str(),
                        f64::from(verification.confidence),
                        verification.explanation,
                        citations_json,
                        evidence_ids_json,
                        verification.created_at.to_rfc3339(),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn append_log_entries(
        &self,
        entries: &[ProcessingLogEntry],
    ) -> Result<(), StorageError> {
        let entries = entries.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "
                    INSERT INTO processing_log (
                        video_id, claim_id, component, status, message, latency_ms, attempt,
                        recorded_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ",
                )?;
                for entry in &entries {
                    stmt.execute(params![
                        entry.video_id,
                        entry.claim_id,
                        entry.component,
                        entry.status.as_str(),
                        entry.message,
                        i64::try_from(entry.latency_ms).unwrap_or(i64::MAX),
                        entry.attempt,
                        entry.recorded_at.to_rfc3339(),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn video(&self, video_id: &str) -> Result<Option<StoredVideo>, StorageError> {
        let video_id = video_id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "
                    SELECT video_id, transcript, duration_secs, language, status_json, updated_at
                    FROM videos WHERE video_id = ?1
                    ",
                    params![video_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    },
                )
                .optional()?;

            row.map(
                |(id, transcript, duration_secs, language, status_json, updated_at)| -> Result<
                    StoredVideo,
                    StorageError,
                > {
                    Ok(StoredVideo {
                        video: Video {
                            id,
                            transcript,
                            duration_secs,
                            language,
                        },
                        status: from_json(&status_json)?,
                        updated_at: parse_timestamp(&updated_at)?,
                    })
                },
            )
            .transpose()
        })
        .await
    }

    async fn claims_by_video(&self, video_id: &str) -> Result<Vec<Claim>, StorageError> {
        let video_id = video_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "
                SELECT claim_id, video_id, position, text, claim_type, confidence, fingerprint,
                       duplicate_of
                FROM claims WHERE video_id = ?1 ORDER BY position
                ",
            )?;
            let rows = stmt
                .query_map(params![video_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(
                    |(id, video_id, position, text, claim_type, confidence, fingerprint, dup)|
                     -> Result<Claim, StorageError> {
                        Ok(Claim {
                            id,
                            video_id,
                            position: to_usize(position, "position")?,
                            text,
                            claim_type: ClaimType::from_label(&claim_type),
                            confidence: confidence as f32,
                            fingerprint,
                            duplicate_of: dup,
                        })
                    },
                )
                .collect()
        })
        .await
    }

    async fn evidence_by_claim(&self, claim_id: &str) -> Result<Vec<Evidence>, StorageError> {
        let claim_id = claim_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "
                SELECT evidence_id, claim_id, title, url, snippet, relevance_score,
                       retrieval_position, rank
                FROM evidence WHERE claim_id = ?1 ORDER BY rank
                ",
            )?;
            let rows = stmt
                .query_map(params![claim_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, claim_id, title, url, snippet, score, position, rank)| -> Result<Evidence, StorageError> {
                    Ok(Evidence {
                        id,
                        claim_id,
                        title,
                        url,
                        snippet,
                        relevance_score: score as f32,
                        retrieval_position: to_usize(position, "retrieval_position")?,
                        rank: to_usize(rank, "rank")?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn verifications_by_claim(
        &self,
        claim_id: &str,
    ) -> Result<Vec<Verification>, StorageError> {
        let claim_id = claim_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "
                SELECT verification_id, claim_id, label, confidence, explanation, citations_json,
                       evidence_ids_json, created_at
                FROM verifications WHERE claim_id = ?1 ORDER BY rowid
                ",
            )?;
            let rows = stmt
                .query_map(params![claim_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(
                    |(id, claim_id, label, confidence, explanation, citations, evidence_ids, created_at)|
                     -> Result<Verification, StorageError> {
                        let label = VerdictLabel::parse(&label)
                            .ok_or_else(|| StorageError::Decode(format!("label '{label}'")))?;
                        Ok(Verification {
                            id,
                            claim_id,
                            label,
                            confidence: confidence as f32,
                            explanation,
                            citations: from_json(&citations)?,
                            evidence_ids: from_json(&evidence_ids)?,
                            created_at: parse_timestamp(&created_at)?,
                        })
                    },
                )
                .collect()
        })
        .await
    }

    async fn log_entries_by_video(
        &self,
        video_id: &str,
    ) -> Result<Vec<ProcessingLogEntry>, StorageError> {
        let video_id = video_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "
                SELECT video_id, claim_id, component, status, message, latency_ms, attempt,
                       recorded_at
                FROM processing_log WHERE video_id = ?1 ORDER BY entry_id
                ",
            )?;
            let rows = stmt
                .query_map(params![video_id], |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, u32>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(
                    |(video_id, claim_id, component, status, message, latency, attempt, at)|
                     -> Result<ProcessingLogEntry, StorageError> {
                        let status = LogStatus::parse(&status)
                            .ok_or_else(|| StorageError::Decode(format!("status '{status}'")))?;
                        Ok(ProcessingLogEntry {
                            video_id,
                            claim_id,
                            component,
                            status,
                            message,
                            latency_ms: u64::try_from(latency).unwrap_or_default(),
                            attempt,
                            recorded_at: parse_timestamp(&at)?,
                        })
                    },
                )
                .collect()
        })
        .await
    }
}

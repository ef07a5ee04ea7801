// ==========================================
// 商品同步连接器 - 持久化任务队列
// ==========================================
// 职责: 任务入队/出队、状态流转、重试计数
// 状态: PENDING → RUNNING → COMPLETED / FAILED（可重试时回到 PENDING）
// 约束: 同一 identity_key 至多一个 PENDING 任务
// ==========================================

use crate::db::SharedConnection;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::job::ConnectorJob;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    /// 等待中
    Pending,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 失败
    Failed,
    /// 已取消
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "CANCELLED" => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }
}

/// 队列中的任务
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub backend_id: i64,
    pub job: ConnectorJob,
    pub priority: i32,
    pub status: JobStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub result: Option<String>,
}

impl JobRecord {
    /// 是否可以重试
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// 队列统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending_count: u32,
    pub running_count: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    pub cancelled_count: u32,
}

const SELECT_JOB: &str = r#"
    SELECT job_id, backend_id, payload, priority, status,
           retry_count, max_retries, created_at, started_at,
           completed_at, error_message, result
    FROM connector_job
"#;

/// 持久化任务队列
#[derive(Clone)]
pub struct JobQueue {
    conn: SharedConnection,
    max_retries: i32,
}

impl JobQueue {
    /// 创建队列（确保队列表存在）
    pub fn new(conn: SharedConnection, max_retries: i32) -> JobResult<Self> {
        let queue = Self { conn, max_retries };
        queue.ensure_queue_table()?;
        Ok(queue)
    }

    fn get_conn(&self) -> JobResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| JobError::LockError(e.to_string()))
    }

    fn ensure_queue_table(&self) -> JobResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS connector_job (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL UNIQUE,
                backend_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                identity_key TEXT NOT NULL,
                payload TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 10,
                status TEXT NOT NULL DEFAULT 'PENDING',
                retry_count INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                error_message TEXT,
                result TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_connector_job_status
              ON connector_job(status, priority, seq);

            CREATE INDEX IF NOT EXISTS idx_connector_job_identity
              ON connector_job(backend_id, identity_key, status);
            "#,
        )?;
        Ok(())
    }

    /// 提交任务
    ///
    /// # 返回
    /// - 新任务 id；若同一键已有 PENDING 任务，返回已有任务 id
    pub fn enqueue(&self, backend_id: i64, job: &ConnectorJob, priority: i32) -> JobResult<String> {
        let conn = self.get_conn()?;
        let identity_key = job.identity_key();

        let existing: Option<String> = conn
            .query_row(
                r#"
                SELECT job_id FROM connector_job
                WHERE backend_id = ?1 AND identity_key = ?2 AND status = 'PENDING'
                ORDER BY seq LIMIT 1
                "#,
                params![backend_id, identity_key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(job_id) = existing {
            tracing::debug!(job_id = %job_id, key = %identity_key, "相同任务已在队列中");
            return Ok(job_id);
        }

        let job_id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(job)?;
        conn.execute(
            r#"
            INSERT INTO connector_job (
                job_id, backend_id, kind, identity_key, payload,
                priority, status, retry_count, max_retries, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDING', 0, ?7, ?8)
            "#,
            params![
                job_id,
                backend_id,
                job.kind(),
                identity_key,
                payload,
                priority,
                self.max_retries,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tracing::info!(job_id = %job_id, kind = job.kind(), priority, "任务已加入队列");
        Ok(job_id)
    }

    /// 取出下一个待执行任务并置为 RUNNING
    pub fn dequeue(&self) -> JobResult<Option<JobRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE status = 'PENDING' ORDER BY priority ASC, seq ASC LIMIT 1",
            SELECT_JOB
        );
        let row = conn.query_row(&sql, [], read_job_row).optional()?;

        let Some(raw) = row else {
            return Ok(None);
        };
        let mut record = raw.into_record()?;

        let started_at = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE connector_job SET status = 'RUNNING', started_at = ?1 WHERE job_id = ?2",
            params![started_at, record.job_id],
        )?;
        record.status = JobStatus::Running;
        record.started_at = Some(started_at);
        Ok(Some(record))
    }

    pub fn mark_completed(&self, job_id: &str, result: Option<&str>) -> JobResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            UPDATE connector_job
            SET status = 'COMPLETED', completed_at = ?1, result = ?2, error_message = NULL
            WHERE job_id = ?3
            "#,
            params![Utc::now().to_rfc3339(), result, job_id],
        )?;
        Ok(())
    }

    /// 记录失败；未达最大重试次数时回到 PENDING
    ///
    /// # 返回
    /// - 更新后的状态（PENDING 或 FAILED）
    pub fn mark_failed(&self, job_id: &str, error: &str) -> JobResult<JobStatus> {
        let conn = self.get_conn()?;
        let (retry_count, max_retries): (i32, i32) = conn
            .query_row(
                "SELECT retry_count, max_retries FROM connector_job WHERE job_id = ?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| JobError::JobNotFound(job_id.to_string()))?;

        let retry_count = retry_count + 1;
        let status = if retry_count < max_retries {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };

        conn.execute(
            r#"
            UPDATE connector_job
            SET status = ?1, error_message = ?2, retry_count = ?3,
                completed_at = CASE WHEN ?1 = 'FAILED' THEN ?4 ELSE NULL END
            WHERE job_id = ?5
            "#,
            params![status.as_str(), error, retry_count, Utc::now().to_rfc3339(), job_id],
        )?;

        match status {
            JobStatus::Pending => {
                tracing::info!(job_id, retry_count, "任务将重试");
            }
            _ => {
                tracing::error!(job_id, retry_count, error, "任务执行失败，达到最大重试次数");
            }
        }
        Ok(status)
    }

    /// 获取任务
    pub fn get_job(&self, job_id: &str) -> JobResult<Option<JobRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE job_id = ?1", SELECT_JOB);
        let row = conn.query_row(&sql, params![job_id], read_job_row).optional()?;
        row.map(RawJobRow::into_record).transpose()
    }

    /// 按状态列出任务（入队顺序）
    pub fn list_jobs(&self, status: JobStatus) -> JobResult<Vec<JobRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE status = ?1 ORDER BY seq ASC", SELECT_JOB);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![status.as_str()], read_job_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawJobRow::into_record).collect()
    }

    /// 取消任务（仅 PENDING 可取消）
    pub fn cancel_job(&self, job_id: &str) -> JobResult<bool> {
        let conn = self.get_conn()?;
        let rows_affected = conn.execute(
            "UPDATE connector_job SET status = 'CANCELLED' WHERE job_id = ?1 AND status = 'PENDING'",
            params![job_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// 将遗留的 RUNNING 任务（进程中断）放回 PENDING
    pub fn requeue_running(&self) -> JobResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE connector_job SET status = 'PENDING', started_at = NULL WHERE status = 'RUNNING'",
            [],
        )?;
        if rows > 0 {
            tracing::warn!(count = rows, "中断的任务已放回队列");
        }
        Ok(rows)
    }

    /// 获取队列统计信息
    pub fn get_queue_stats(&self) -> JobResult<QueueStats> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM connector_job GROUP BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut stats = QueueStats::default();
        for row in rows {
            let (status, count) = row?;
            let count = count as u32;
            match JobStatus::from_db(&status) {
                JobStatus::Pending => stats.pending_count = count,
                JobStatus::Running => stats.running_count = count,
                JobStatus::Completed => stats.completed_count = count,
                JobStatus::Failed => stats.failed_count += count,
                JobStatus::Cancelled => stats.cancelled_count = count,
            }
        }
        Ok(stats)
    }
}

// 原始列；负载在 into_record 中解析
struct RawJobRow {
    job_id: String,
    backend_id: i64,
    payload: String,
    priority: i32,
    status: String,
    retry_count: i32,
    max_retries: i32,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    error_message: Option<String>,
    result: Option<String>,
}

impl RawJobRow {
    fn into_record(self) -> JobResult<JobRecord> {
        Ok(JobRecord {
            job: serde_json::from_str(&self.payload)?,
            job_id: self.job_id,
            backend_id: self.backend_id,
            priority: self.priority,
            status: JobStatus::from_db(&self.status),
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error_message: self.error_message,
            result: self.result,
        })
    }
}

fn read_job_row(row: &Row<'_>) -> rusqlite::Result<RawJobRow> {
    Ok(RawJobRow {
        job_id: row.get(0)?,
        backend_id: row.get(1)?,
        payload: row.get(2)?,
        priority: row.get(3)?,
        status: row.get(4)?,
        retry_count: row.get(5)?,
        max_retries: row.get(6)?,
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
        error_message: row.get(10)?,
        result: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn image_job(image_id: &str) -> ConnectorJob {
        ConnectorJob::ImportProductImage {
            product_id: "5".to_string(),
            image_id: image_id.to_string(),
        }
    }

    #[test]
    fn test_dequeue_orders_by_priority_then_fifo() {
        let queue = JobQueue::new(open_in_memory().unwrap(), 3).unwrap();
        queue.enqueue(1, &image_job("1"), 15).unwrap();
        queue.enqueue(1, &image_job("2"), 10).unwrap();
        queue.enqueue(1, &image_job("3"), 10).unwrap();

        let order: Vec<ConnectorJob> = std::iter::from_fn(|| queue.dequeue().unwrap())
            .map(|r| r.job)
            .collect();
        assert_eq!(order, vec![image_job("2"), image_job("3"), image_job("1")]);
    }

    #[test]
    fn test_enqueue_dedupes_pending() {
        let queue = JobQueue::new(open_in_memory().unwrap(), 3).unwrap();
        let first = queue.enqueue(1, &image_job("1"), 10).unwrap();
        let second = queue.enqueue(1, &image_job("1"), 10).unwrap();
        assert_eq!(first, second);

        // 已出队（RUNNING）后允许再次入队
        queue.dequeue().unwrap();
        let third = queue.enqueue(1, &image_job("1"), 10).unwrap();
        assert_ne!(first, third);
    }

    #[test]
    fn test_retry_then_fail() {
        let queue = JobQueue::new(open_in_memory().unwrap(), 2).unwrap();
        let job_id = queue.enqueue(1, &ConnectorJob::ImportInventory, 10).unwrap();

        queue.dequeue().unwrap();
        assert_eq!(queue.mark_failed(&job_id, "boom").unwrap(), JobStatus::Pending);
        queue.dequeue().unwrap();
        assert_eq!(queue.mark_failed(&job_id, "boom").unwrap(), JobStatus::Failed);

        let record = queue.get_job(&job_id).unwrap().unwrap();
        assert_eq!(record.retry_count, 2);
        assert!(!record.can_retry());
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(queue.get_queue_stats().unwrap().failed_count, 1);
    }

    #[test]
    fn test_cancel_only_pending() {
        let queue = JobQueue::new(open_in_memory().unwrap(), 3).unwrap();
        let job_id = queue.enqueue(1, &ConnectorJob::ImportInventory, 10).unwrap();
        assert!(queue.cancel_job(&job_id).unwrap());
        assert!(!queue.cancel_job(&job_id).unwrap());
        assert!(queue.dequeue().unwrap().is_none());
    }
}

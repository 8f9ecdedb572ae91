use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use abasto_core::domain::job::{JobId, JobKind, JobState, ScheduledJob};
use abasto_core::domain::preorder::PreOrderId;

use super::{parse_timestamp, parse_u32, JobQueue, RepositoryError};
use crate::DbPool;

pub struct SqlJobQueue {
    pool: DbPool,
}

impl SqlJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JobQueue for SqlJobQueue {
    async fn enqueue(&self, job: ScheduledJob) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO job_queue (
                id, kind, pre_order_id, instance, run_at, attempts_left, state, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&job.id.0)
        .bind(job.kind.as_str())
        .bind(&job.pre_order_id.0)
        .bind(i64::from(job.instance))
        .bind(job.run_at.to_rfc3339())
        .bind(i64::from(job.attempts_left))
        .bind(job.state.as_str())
        .bind(job.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, kind, pre_order_id, instance, run_at, attempts_left, state, created_at
             FROM job_queue
             WHERE state = 'pending' AND run_at <= ?
             ORDER BY run_at, created_at",
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn complete(&self, id: &JobId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE job_queue SET state = 'done' WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail(&self, id: &JobId) -> Result<(), RepositoryError> {
        // Burns one attempt; the job only goes terminal once the budget hits
        // zero, otherwise it stays pending for the next poll.
        sqlx::query(
            "UPDATE job_queue
             SET attempts_left = MAX(attempts_left - 1, 0),
                 state = CASE WHEN attempts_left <= 1 THEN 'failed' ELSE 'pending' END
             WHERE id = ? AND state = 'pending'",
        )
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cancel_for_pre_order(
        &self,
        pre_order_id: &PreOrderId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE job_queue SET state = 'done' WHERE pre_order_id = ? AND state = 'pending'",
        )
        .bind(&pre_order_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn job_from_row(row: &SqliteRow) -> Result<ScheduledJob, RepositoryError> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = JobKind::parse(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown job kind `{kind_raw}`")))?;
    let state_raw: String = row.try_get("state")?;
    let state = JobState::parse(&state_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown job state `{state_raw}`")))?;
    Ok(ScheduledJob {
        id: JobId(row.try_get("id")?),
        kind,
        pre_order_id: PreOrderId(row.try_get("pre_order_id")?),
        instance: parse_u32("instance", row.try_get("instance")?)?,
        run_at: parse_timestamp("run_at", row.try_get("run_at")?)?,
        attempts_left: parse_u32("attempts_left", row.try_get("attempts_left")?)?,
        state,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use abasto_core::domain::job::{JobId, JobKind, JobState, ScheduledJob};
    use abasto_core::domain::preorder::PreOrderId;

    use super::SqlJobQueue;
    use crate::repositories::JobQueue;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        for (id, user) in [("c-client", "u-client"), ("c-prov", "u-prov")] {
            sqlx::query("INSERT INTO company (id, name, owner_user_id) VALUES (?, ?, ?)")
                .bind(id)
                .bind(format!("Company {id}"))
                .bind(user)
                .execute(&pool)
                .await
                .expect("insert company");
        }
        sqlx::query(
            "INSERT INTO pre_order (id, sequence, buyer_user_id, status, instance,
                                    response_deadline, client_company_id, provider_company_id,
                                    created_at, updated_at)
             VALUES ('po-1', 1, 'u-client', 'pending', 1, '2024-03-04T11:00:00+00:00',
                     'c-client', 'c-prov', '2024-03-04T10:00:00+00:00',
                     '2024-03-04T10:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .expect("insert pre-order");
        pool
    }

    fn job(id: &str, kind: JobKind, run_at: chrono::DateTime<Utc>, attempts: u32) -> ScheduledJob {
        ScheduledJob {
            id: JobId(id.to_string()),
            kind,
            pre_order_id: PreOrderId("po-1".to_string()),
            instance: 1,
            run_at,
            attempts_left: attempts,
            state: JobState::Pending,
            created_at: run_at,
        }
    }

    #[tokio::test]
    async fn due_returns_only_ripe_pending_jobs_oldest_first() {
        let pool = setup_pool().await;
        let queue = SqlJobQueue::new(pool.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        queue.enqueue(job("j-late", JobKind::Timeout, now + Duration::hours(1), 1)).await.unwrap();
        queue.enqueue(job("j-b", JobKind::Timeout, now - Duration::minutes(5), 1)).await.unwrap();
        queue
            .enqueue(job("j-a", JobKind::ProcessResponse, now - Duration::hours(1), 1))
            .await
            .unwrap();

        let due = queue.due(now).await.expect("poll due jobs");
        let ids: Vec<&str> = due.iter().map(|job| job.id.0.as_str()).collect();
        assert_eq!(ids, vec!["j-a", "j-b"]);
        pool.close().await;
    }

    #[tokio::test]
    async fn completed_jobs_leave_the_queue() {
        let pool = setup_pool().await;
        let queue = SqlJobQueue::new(pool.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        queue.enqueue(job("j-1", JobKind::ProcessResponse, now, 1)).await.unwrap();
        queue.complete(&JobId("j-1".to_string())).await.expect("complete");

        assert!(queue.due(now).await.expect("poll").is_empty());
        pool.close().await;
    }

    #[tokio::test]
    async fn failing_burns_attempts_before_going_terminal() {
        let pool = setup_pool().await;
        let queue = SqlJobQueue::new(pool.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        queue.enqueue(job("j-1", JobKind::Timeout, now, 2)).await.unwrap();
        let id = JobId("j-1".to_string());

        queue.fail(&id).await.expect("first failure");
        let still_due = queue.due(now).await.expect("poll");
        assert_eq!(still_due.len(), 1);
        assert_eq!(still_due[0].attempts_left, 1);

        queue.fail(&id).await.expect("second failure");
        assert!(queue.due(now).await.expect("poll").is_empty());
        pool.close().await;
    }

    #[tokio::test]
    async fn cancel_clears_pending_jobs_for_one_pre_order() {
        let pool = setup_pool().await;
        let queue = SqlJobQueue::new(pool.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        queue.enqueue(job("j-1", JobKind::ProcessResponse, now, 1)).await.unwrap();
        queue.enqueue(job("j-2", JobKind::Timeout, now, 1)).await.unwrap();

        queue.cancel_for_pre_order(&PreOrderId("po-1".to_string())).await.expect("cancel");
        assert!(queue.due(now).await.expect("poll").is_empty());
        pool.close().await;
    }
}

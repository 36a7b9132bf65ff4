//! Aggregate queries behind the workflow dashboards.
//!
//! Timestamps are compared through `julianday()` so rows written by SQLite
//! defaults and rows written from Rust compare correctly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Time frame a report is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    /// Current state of running workflows.
    Now(DateTime<Utc>),
    /// Activity within `[from, to]`; overdue is judged at `reference`.
    Range {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        reference: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
pub struct WorkflowCounts {
    pub started: Option<i64>,
    pub completed: Option<i64>,
    pub in_progress: i64,
    pub overdue: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct TemplateBreakdown {
    pub template_id: Uuid,
    pub template_name: String,
    pub is_active: bool,
    pub started: Option<i64>,
    pub completed: Option<i64>,
    pub in_progress: i64,
    pub overdue: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct TaskBreakdown {
    pub id: Uuid,
    pub api_name: String,
    pub name: String,
    pub number: i64,
    pub started: Option<i64>,
    pub completed: Option<i64>,
    pub in_progress: i64,
    pub overdue: i64,
}

/// Templates of account `$1` owned by user `$2`, deleted ones included.
const VISIBLE_TEMPLATES: &str = r#"SELECT t.id FROM templates t
    JOIN template_owners o ON o.template_id = t.id
    WHERE t.account_id = $1 AND o.user_id = $2"#;

/// Range-mode workflow in progress for `[$3, $4]`.
const WORKFLOW_IN_RANGE: &str = r#"w.status != 'terminated'
    AND julianday(w.date_created) <= julianday($4)
    AND (w.date_completed IS NULL OR julianday(w.date_completed) >= julianday($3))"#;

const WORKFLOW_RANGE_METRICS: &str = r#"
    COALESCE(SUM(CASE WHEN w.id IS NOT NULL AND julianday(w.date_created) >= julianday($3) THEN 1 ELSE 0 END), 0) AS started,
    COALESCE(SUM(CASE WHEN w.status = 'done' AND w.date_completed IS NOT NULL
                       AND julianday(w.date_completed) <= julianday($4) THEN 1 ELSE 0 END), 0) AS completed,
    COUNT(w.id) AS in_progress,
    COALESCE(SUM(CASE WHEN (w.due_date IS NOT NULL AND julianday(w.due_date) < julianday(COALESCE(w.date_completed, $5)))
                        OR (ct.due_date IS NOT NULL AND julianday(ct.due_date) < julianday(COALESCE(ct.date_completed, $5)))
                  THEN 1 ELSE 0 END), 0) AS overdue"#;

const WORKFLOW_NOW_METRICS: &str = r#"
    NULL AS started,
    NULL AS completed,
    COUNT(w.id) AS in_progress,
    COALESCE(SUM(CASE WHEN (w.due_date IS NOT NULL AND julianday(w.due_date) < julianday($3))
                        OR (ct.due_date IS NOT NULL AND ct.date_completed IS NULL
                            AND julianday(ct.due_date) < julianday($3))
                  THEN 1 ELSE 0 END), 0) AS overdue"#;

pub async fn workflow_overview(
    pool: &SqlitePool,
    account_id: Uuid,
    user_id: Uuid,
    window: ReportWindow,
) -> Result<WorkflowCounts, sqlx::Error> {
    match window {
        ReportWindow::Now(now) => {
            sqlx::query_as::<_, WorkflowCounts>(&format!(
                r#"SELECT {WORKFLOW_NOW_METRICS}
                   FROM workflows w
                   LEFT JOIN tasks ct ON ct.workflow_id = w.id AND ct.number = w.current_task
                   WHERE w.account_id = $1
                     AND w.status = 'running'
                     AND w.template_id IN ({VISIBLE_TEMPLATES})"#
            ))
            .bind(account_id)
            .bind(user_id)
            .bind(now)
            .fetch_one(pool)
            .await
        }
        ReportWindow::Range {
            from,
            to,
            reference,
        } => {
            sqlx::query_as::<_, WorkflowCounts>(&format!(
                r#"SELECT {WORKFLOW_RANGE_METRICS}
                   FROM workflows w
                   LEFT JOIN tasks ct ON ct.workflow_id = w.id AND ct.number = w.current_task
                   WHERE w.account_id = $1
                     AND {WORKFLOW_IN_RANGE}
                     AND w.template_id IN ({VISIBLE_TEMPLATES})"#
            ))
            .bind(account_id)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .bind(reference)
            .fetch_one(pool)
            .await
        }
    }
}

/// One row per visible template that is not deleted, empty ones included.
pub async fn template_breakdown(
    pool: &SqlitePool,
    account_id: Uuid,
    user_id: Uuid,
    window: ReportWindow,
) -> Result<Vec<TemplateBreakdown>, sqlx::Error> {
    let select = |metrics: &str, workflow_filter: &str| {
        format!(
            r#"SELECT t.id AS template_id, t.name AS template_name, t.is_active, {metrics}
               FROM templates t
               JOIN template_owners o ON o.template_id = t.id AND o.user_id = $2
               LEFT JOIN workflows w ON w.template_id = t.id AND {workflow_filter}
               LEFT JOIN tasks ct ON ct.workflow_id = w.id AND ct.number = w.current_task
               WHERE t.account_id = $1 AND t.is_deleted = 0
               GROUP BY t.id, t.name, t.is_active, t.created_at
               ORDER BY in_progress DESC, started DESC, t.created_at ASC, t.rowid ASC"#
        )
    };
    match window {
        ReportWindow::Now(now) => {
            sqlx::query_as::<_, TemplateBreakdown>(&select(
                WORKFLOW_NOW_METRICS,
                "w.status = 'running'",
            ))
            .bind(account_id)
            .bind(user_id)
            .bind(now)
            .fetch_all(pool)
            .await
        }
        ReportWindow::Range {
            from,
            to,
            reference,
        } => {
            sqlx::query_as::<_, TemplateBreakdown>(&select(
                WORKFLOW_RANGE_METRICS,
                WORKFLOW_IN_RANGE,
            ))
            .bind(account_id)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .bind(reference)
            .fetch_all(pool)
            .await
        }
    }
}

/// One row per task position of the template, in `number` order.
pub async fn task_breakdown(
    pool: &SqlitePool,
    template_id: Uuid,
    window: ReportWindow,
) -> Result<Vec<TaskBreakdown>, sqlx::Error> {
    match window {
        ReportWindow::Now(now) => {
            sqlx::query_as::<_, TaskBreakdown>(
                r#"SELECT tt.id, tt.api_name, tt.name, tt.number,
                          NULL AS started,
                          NULL AS completed,
                          COUNT(w.id) AS in_progress,
                          COALESCE(SUM(CASE WHEN (w.due_date IS NOT NULL AND julianday(w.due_date) < julianday($2))
                                              OR (ct.due_date IS NOT NULL AND julianday(ct.due_date) < julianday($2))
                                        THEN 1 ELSE 0 END), 0) AS overdue
                   FROM template_tasks tt
                   LEFT JOIN workflows w ON w.template_id = tt.template_id
                                        AND w.status = 'running'
                                        AND w.current_task = tt.number
                   LEFT JOIN tasks ct ON ct.workflow_id = w.id AND ct.number = w.current_task
                   WHERE tt.template_id = $1
                   GROUP BY tt.id, tt.api_name, tt.name, tt.number
                   ORDER BY tt.number ASC"#,
            )
            .bind(template_id)
            .bind(now)
            .fetch_all(pool)
            .await
        }
        ReportWindow::Range {
            from,
            to,
            reference,
        } => {
            sqlx::query_as::<_, TaskBreakdown>(
                r#"SELECT tt.id, tt.api_name, tt.name, tt.number,
                          COALESCE(SUM(CASE WHEN k.id IS NOT NULL AND julianday(k.first_started) >= julianday($2)
                                        THEN 1 ELSE 0 END), 0) AS started,
                          COALESCE(SUM(CASE WHEN k.date_completed IS NOT NULL
                                             AND julianday(k.date_completed) <= julianday($3)
                                        THEN 1 ELSE 0 END), 0) AS completed,
                          COUNT(k.id) AS in_progress,
                          COALESCE(SUM(CASE WHEN (k.due_date IS NOT NULL
                                                  AND julianday(k.due_date) < julianday(COALESCE(k.date_completed, $4)))
                                              OR (k.workflow_due_date IS NOT NULL
                                                  AND julianday(k.workflow_due_date) < julianday(COALESCE(k.date_completed, $4)))
                                        THEN 1 ELSE 0 END), 0) AS overdue
                   FROM template_tasks tt
                   LEFT JOIN (
                       SELECT task.id, task.number, task.due_date, task.date_completed,
                              COALESCE(task.date_first_started, task.date_started) AS first_started,
                              w.template_id, w.due_date AS workflow_due_date
                       FROM tasks task
                       JOIN workflows w ON w.id = task.workflow_id
                       WHERE w.status != 'terminated'
                         AND COALESCE(task.date_first_started, task.date_started) IS NOT NULL
                         AND julianday(COALESCE(task.date_first_started, task.date_started)) <= julianday($3)
                         AND (task.date_completed IS NULL OR julianday(task.date_completed) >= julianday($2))
                   ) k ON k.template_id = tt.template_id AND k.number = tt.number
                   WHERE tt.template_id = $1
                   GROUP BY tt.id, tt.api_name, tt.name, tt.number
                   ORDER BY tt.number ASC"#,
            )
            .bind(template_id)
            .bind(from)
            .bind(to)
            .bind(reference)
            .fetch_all(pool)
            .await
        }
    }
}

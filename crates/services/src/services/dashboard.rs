use chrono::{DateTime, Duration, Utc};
use db::models::{
    dashboard::{self, ReportWindow, TaskBreakdown, TemplateBreakdown, WorkflowCounts},
    template::Template,
    user::User,
};
use serde::{Deserialize, Deserializer, de};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Template not found")]
    TemplateNotFound,
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),
    #[error("date_from is after date_to")]
    InvalidPeriod,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Query parameters shared by the dashboard reports.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct DashboardParams {
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub now: bool,
    /// Unix seconds, fractions allowed.
    pub date_from_tsp: Option<f64>,
    pub date_to_tsp: Option<f64>,
}

struct FlagVisitor;

impl de::Visitor<'_> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a boolean flag")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(value), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(de::Unexpected::Signed(value), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
        }
    }
}

/// Accepts `true`, `True`, `1`, `yes` and their negatives, as query strings
/// from older clients spell them.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlagVisitor)
}

fn from_timestamp(timestamp: f64) -> Result<DateTime<Utc>, DashboardError> {
    if !timestamp.is_finite() {
        return Err(DashboardError::InvalidTimestamp(timestamp));
    }
    let seconds = timestamp.floor();
    let nanos = (((timestamp - seconds) * 1_000_000_000.0) as u32).min(999_999_999);
    DateTime::from_timestamp(seconds as i64, nanos).ok_or(DashboardError::InvalidTimestamp(timestamp))
}

impl DashboardParams {
    /// Range mode covers `[date_from, date_to]`. `date_to` defaults to `now`
    /// and `date_from` to one day before `date_to`. Overdue is judged at the
    /// earlier of `now` and `date_to`.
    pub fn window(&self, now: DateTime<Utc>) -> Result<ReportWindow, DashboardError> {
        if self.now {
            return Ok(ReportWindow::Now(now));
        }
        let to = self.date_to_tsp.map(from_timestamp).transpose()?.unwrap_or(now);
        let from = self
            .date_from_tsp
            .map(from_timestamp)
            .transpose()?
            .unwrap_or(to - Duration::days(1));
        if from > to {
            return Err(DashboardError::InvalidPeriod);
        }
        Ok(ReportWindow::Range {
            from,
            to,
            reference: now.min(to),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DashboardService {
    pool: SqlitePool,
}

impl DashboardService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn overview(
        &self,
        user: &User,
        params: &DashboardParams,
    ) -> Result<WorkflowCounts, DashboardError> {
        let window = params.window(Utc::now())?;
        Ok(dashboard::workflow_overview(&self.pool, user.account_id, user.id, window).await?)
    }

    pub async fn breakdown(
        &self,
        user: &User,
        params: &DashboardParams,
    ) -> Result<Vec<TemplateBreakdown>, DashboardError> {
        let window = params.window(Utc::now())?;
        Ok(dashboard::template_breakdown(&self.pool, user.account_id, user.id, window).await?)
    }

    /// Per task position of a template the user owns.
    pub async fn by_tasks(
        &self,
        user: &User,
        template_id: Uuid,
        params: &DashboardParams,
    ) -> Result<Vec<TaskBreakdown>, DashboardError> {
        let window = params.window(Utc::now())?;
        let template = Template::find_owned(&self.pool, template_id, user.account_id, user.id)
            .await?
            .ok_or(DashboardError::TemplateNotFound)?;
        Ok(dashboard::task_breakdown(&self.pool, template.id, window).await?)
    }
}

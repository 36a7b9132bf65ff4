use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "billing_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BillingPlan {
    Free,
    Premium,
    Unlimited,
    FractionalCoo,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub billing_plan: Option<BillingPlan>,
    pub plan_expiration: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateAccount {
    pub name: String,
    pub billing_plan: Option<BillingPlan>,
    pub plan_expiration: Option<DateTime<Utc>>,
}

impl Account {
    pub async fn create(pool: &SqlitePool, data: &CreateAccount) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"INSERT INTO accounts (id, name, billing_plan, plan_expiration, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, name, billing_plan, plan_expiration, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.billing_plan)
        .bind(data.plan_expiration)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"SELECT id, name, billing_plan, plan_expiration, created_at
               FROM accounts
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub fn has_billing_plan(&self) -> bool {
        self.billing_plan.is_some()
    }

    /// An account without an expiration date never expires.
    pub fn is_subscription_expired(&self, now: DateTime<Utc>) -> bool {
        self.plan_expiration.is_some_and(|expiration| expiration <= now)
    }
}

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{MySqlExecutor, MySqlPool};

use super::import::DtrSink;
use super::record::DtrSubmission;
use crate::error::is_duplicate_key;
use crate::model::dtr::DtrRecord;
use crate::model::team_status::TeamStatusRow;
use crate::model::role::Role;

const DUPLICATE_RECORD: &str = "Record already exists for this date and time in";

/// Persists submissions for one user into `dtr_records`.
pub struct MySqlDtrStore<'a> {
    pool: &'a MySqlPool,
    user_id: u64,
}

impl<'a> MySqlDtrStore<'a> {
    pub fn new(pool: &'a MySqlPool, user_id: u64) -> Self {
        Self { pool, user_id }
    }
}

impl DtrSink for MySqlDtrStore<'_> {
    async fn submit(&self, record: &DtrSubmission) -> Result<(), String> {
        match insert_record(self.pool, self.user_id, record).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(DUPLICATE_RECORD.to_string()),
            Err(e) => {
                tracing::error!(error = %e, user_id = self.user_id, "Failed to insert DTR record");
                Err("Failed to save record".to_string())
            }
        }
    }
}

/// Insert one record and return its id.
pub async fn insert_record<'e, E: MySqlExecutor<'e>>(
    executor: E,
    user_id: u64,
    record: &DtrSubmission,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO dtr_records (user_id, date, time_in, time_out, hours_worked, accomplishment)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(record.date)
    .bind(record.time_in)
    .bind(record.time_out)
    .bind(record.hours_worked)
    .bind(&record.accomplishment)
    .execute(executor)
    .await?;

    Ok(result.last_insert_id())
}

/// Insert `record` as the user's open shift unless one is already open.
///
/// The user's row is locked for the transaction, so concurrent time-ins for
/// the same user run one after the other. Returns `None` when a shift was
/// already open.
pub async fn open_shift(
    pool: &MySqlPool,
    user_id: u64,
    record: &DtrSubmission,
) -> Result<Option<u64>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM users WHERE id = ? FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

    let open = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM dtr_records WHERE user_id = ? AND time_out IS NULL LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if open.is_some() {
        tx.rollback().await?;
        return Ok(None);
    }

    let id = insert_record(&mut *tx, user_id, record).await?;
    tx.commit().await?;

    Ok(Some(id))
}

pub async fn find_open_record(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Option<DtrRecord>, sqlx::Error> {
    sqlx::query_as::<_, DtrRecord>(
        r#"
        SELECT id, user_id, date, time_in, time_out, hours_worked, accomplishment
        FROM dtr_records
        WHERE user_id = ? AND time_out IS NULL
        ORDER BY time_in DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Close an open record. Returns `false` when it was already closed.
pub async fn close_record(
    pool: &MySqlPool,
    id: u64,
    time_out: NaiveDateTime,
    hours_worked: f64,
    accomplishment: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE dtr_records
        SET time_out = ?, hours_worked = ?, accomplishment = COALESCE(?, accomplishment)
        WHERE id = ? AND time_out IS NULL
        "#,
    )
    .bind(time_out)
    .bind(hours_worked)
    .bind(accomplishment)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_records(
    pool: &MySqlPool,
    user_id: u64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM dtr_records
        WHERE user_id = ?
          AND (? IS NULL OR date >= ?)
          AND (? IS NULL OR date <= ?)
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(from)
    .bind(to)
    .bind(to)
    .fetch_one(pool)
    .await
}

pub async fn list_records(
    pool: &MySqlPool,
    user_id: u64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    limit: u32,
    offset: u32,
) -> Result<Vec<DtrRecord>, sqlx::Error> {
    sqlx::query_as::<_, DtrRecord>(
        r#"
        SELECT id, user_id, date, time_in, time_out, hours_worked, accomplishment
        FROM dtr_records
        WHERE user_id = ?
          AND (? IS NULL OR date >= ?)
          AND (? IS NULL OR date <= ?)
        ORDER BY date DESC, time_in DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(from)
    .bind(to)
    .bind(to)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Every agent joined with their records for `date`, ordered by agent.
pub async fn team_rows(pool: &MySqlPool, date: NaiveDate) -> Result<Vec<TeamStatusRow>, sqlx::Error> {
    sqlx::query_as::<_, TeamStatusRow>(
        r#"
        SELECT u.id AS user_id, u.username, d.time_in, d.time_out, d.hours_worked
        FROM users u
        LEFT JOIN dtr_records d ON d.user_id = u.id AND d.date = ?
        WHERE u.role_id = ? AND u.is_active = TRUE
        ORDER BY u.username, u.id, d.time_in
        "#,
    )
    .bind(date)
    .bind(Role::Agent.id())
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn shift_at(time_in: NaiveDateTime) -> DtrSubmission {
        DtrSubmission {
            date: time_in.date(),
            time_in,
            time_out: None,
            hours_worked: 0.0,
            accomplishment: String::new(),
        }
    }

    #[actix_web::test]
    #[ignore = "needs a MySQL database in TEST_DATABASE_URL"]
    async fn concurrent_time_ins_open_one_shift() {
        let url = std::env::var("TEST_DATABASE_URL").unwrap();
        let pool = crate::db::init_db(&url).await.unwrap();

        let username = format!("shift-{}", uuid::Uuid::new_v4());
        let user_id = sqlx::query("INSERT INTO users (username, password) VALUES (?, 'x')")
            .bind(&username)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_id();

        let now = Local::now().naive_local();
        let first = shift_at(now);
        let second = shift_at(now + chrono::Duration::seconds(1));

        let (a, b) = futures::join!(
            open_shift(&pool, user_id, &first),
            open_shift(&pool, user_id, &second)
        );
        let opened = [a.unwrap(), b.unwrap()];
        assert_eq!(opened.iter().filter(|id| id.is_some()).count(), 1);

        assert!(open_shift(&pool, user_id, &shift_at(now + chrono::Duration::seconds(2)))
            .await
            .unwrap()
            .is_none());
    }
}

use chrono::{DateTime, Utc};
use sqlx::Row;

use agora_core::domain::account::{Account, AccountId, AccountRole};

use super::{AccountRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn role_as_str(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Member => "member",
        AccountRole::Admin => "admin",
    }
}

fn parse_role(s: &str) -> Result<AccountRole, RepositoryError> {
    match s {
        "member" => Ok(AccountRole::Member),
        "admin" => Ok(AccountRole::Admin),
        other => Err(RepositoryError::Decode(format!("unknown account role `{other}`"))),
    }
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    let registered_at = DateTime::parse_from_rfc3339(&get("registered_at")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad `registered_at` timestamp: {e}")))?;
    let suspended: i64 =
        row.try_get("suspended").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Account {
        id: AccountId(get("id")?),
        display_name: get("display_name")?,
        email: get("email")?,
        role: parse_role(&get("role")?)?,
        registered_at,
        suspended: suspended != 0,
    })
}

#[async_trait::async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO account (id, display_name, email, role, registered_at, suspended)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 display_name = excluded.display_name,
                 email = excluded.email,
                 role = excluded.role,
                 suspended = excluded.suspended",
        )
        .bind(&account.id.0)
        .bind(&account.display_name)
        .bind(&account.email)
        .bind(role_as_str(account.role))
        .bind(account.registered_at.to_rfc3339())
        .bind(i64::from(account.suspended))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<Account>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, display_name, email, role, registered_at, suspended
             FROM account ORDER BY registered_at ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_account).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use agora_core::domain::account::{Account, AccountId, AccountRole};

    use super::SqlAccountRepository;
    use crate::repositories::AccountRepository;
    use crate::{connect_with_settings, migrations};

    fn sample_account(id: &str, role: AccountRole) -> Account {
        Account {
            id: AccountId(id.to_string()),
            display_name: "Dana".to_string(),
            email: format!("{id}@example.com"),
            role,
            registered_at: Utc::now(),
            suspended: false,
        }
    }

    #[tokio::test]
    async fn list_all_returns_members_and_admins() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let repo = SqlAccountRepository::new(pool);
        repo.save(sample_account("acc-1", AccountRole::Member)).await.expect("save member");
        repo.save(sample_account("acc-2", AccountRole::Admin)).await.expect("save admin");

        let accounts = repo.list_all(100).await.expect("list");
        assert_eq!(accounts.len(), 2);
        assert!(accounts.iter().any(|a| a.role == AccountRole::Admin));
    }

    #[tokio::test]
    async fn save_upserts_suspension() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let repo = SqlAccountRepository::new(pool);
        let mut account = sample_account("acc-1", AccountRole::Member);
        repo.save(account.clone()).await.expect("save");

        account.suspended = true;
        repo.save(account).await.expect("upsert");

        let accounts = repo.list_all(100).await.expect("list");
        assert!(accounts[0].suspended);
    }
}

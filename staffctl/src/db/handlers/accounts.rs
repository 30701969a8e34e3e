//! Database repository for accounts.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use crate::{
    auth::scope::TenantScope,
    db::{
        errors::{DbError, Result},
        handlers::{
            list::{push_name_filter, push_order_and_page},
            repository::Repository,
        },
        models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountFilter, AccountUpdateDBRequest},
    },
    types::{AccountId, Role},
};

pub struct Accounts<'c> {
    db: &'c mut SqliteConnection,
}

/// Role and tenant conditions shared by `list` and `count`
fn push_account_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &AccountFilter) {
    if let Some(role) = filter.role {
        query.push(" AND role = ");
        query.push_bind(role);
    }

    match filter.scope {
        TenantScope::Unrestricted => {}
        TenantScope::RestrictedTo(company_id) => {
            query.push(" AND company_id = ");
            query.push_bind(company_id);
        }
        TenantScope::Empty => {
            query.push(" AND 1 = 0");
        }
    }

    push_name_filter(query, filter.name.as_deref());
}

#[async_trait::async_trait]
impl<'c> Repository for Accounts<'c> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = AccountId;
    type Filter = AccountFilter;

    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let account = sqlx::query_as::<_, AccountDBResponse>(
            r#"
            INSERT INTO accounts (company_id, name, email, password_hash, role, phone, address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(request.company_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.role)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let account = sqlx::query_as::<_, AccountDBResponse>("SELECT * FROM accounts WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM accounts WHERE deleted_at IS NULL");
        push_account_filter(&mut query, filter);
        push_order_and_page(&mut query, &filter.sort, filter.skip, filter.limit);

        let accounts = query.build_query_as::<AccountDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(accounts)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE accounts SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let account = sqlx::query_as::<_, AccountDBResponse>(
            r#"
            UPDATE accounts SET
                company_id = COALESCE(?, company_id),
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                address = CASE WHEN ? THEN ? ELSE address END,
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(request.company_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(request.address.is_some())
        .bind(request.address.as_ref().and_then(Option::as_deref))
        .bind(&request.password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(account)
    }
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &AccountFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM accounts WHERE deleted_at IS NULL");
        push_account_filter(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Active account by e-mail, used to resolve the caller's identity and for login
    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, AccountDBResponse>("SELECT * FROM accounts WHERE email = ? AND deleted_at IS NULL")
            .bind(email.trim())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account)
    }

    /// The superadmin row, if one has been seeded. Tombstoned rows count, since the single
    /// superadmin slot is taken either way.
    #[instrument(skip(self), err)]
    pub async fn get_superadmin(&mut self) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, AccountDBResponse>("SELECT * FROM accounts WHERE role = ?")
            .bind(Role::Superadmin)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account)
    }

    /// Replace the password hash of an active account. Returns false when there is none.
    #[instrument(skip(self, password_hash), err)]
    pub async fn set_password(&mut self, id: AccountId, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET password_hash = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_account, create_test_company, create_test_pool};

    fn employee(company_id: i64, name: &str, email: &str) -> AccountCreateDBRequest {
        AccountCreateDBRequest {
            company_id: Some(company_id),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::Employee,
            phone: "0812".to_string(),
            address: None,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_create_and_lookup_by_email() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let company = create_test_company(&mut conn, "Acme").await;

        let mut repo = Accounts::new(&mut conn);
        let created = repo.create(&employee(company.id, "Eve", "eve@acme.com")).await.unwrap();
        assert_eq!(created.role, Role::Employee);
        assert_eq!(created.company_id, Some(company.id));

        let found = repo.get_by_email(" eve@acme.com ").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_by_email("nobody@acme.com").await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_tenant_check_rejects_companyless_employee() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut request = employee(1, "Eve", "eve@acme.com");
        request.company_id = None;
        let err = Accounts::new(&mut conn).create(&request).await.unwrap_err();

        assert!(matches!(err, DbError::CheckViolation { .. }), "got {err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_company_is_foreign_key_violation() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = Accounts::new(&mut conn).create(&employee(999, "Eve", "eve@acme.com")).await.unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "got {err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_only_one_superadmin() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        create_test_account(&mut conn, None, Role::Superadmin, "root@x.com").await;
        let err = Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                company_id: None,
                name: "Second".to_string(),
                email: "root2@x.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Superadmin,
                phone: "0".to_string(),
                address: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }), "got {err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_list_is_scoped_by_tenant_and_role() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let acme = create_test_company(&mut conn, "Acme").await;
        let globex = create_test_company(&mut conn, "Globex").await;

        create_test_account(&mut conn, Some(acme.id), Role::Manager, "boss@acme.com").await;
        create_test_account(&mut conn, Some(acme.id), Role::Employee, "a@acme.com").await;
        create_test_account(&mut conn, Some(acme.id), Role::Employee, "b@acme.com").await;
        create_test_account(&mut conn, Some(globex.id), Role::Employee, "c@globex.com").await;

        let mut repo = Accounts::new(&mut conn);

        let filter = AccountFilter::new(TenantScope::RestrictedTo(acme.id), 0, 20).with_role(Role::Employee);
        let emails: Vec<_> = repo.list(&filter).await.unwrap().into_iter().map(|a| a.email).collect();
        assert_eq!(emails, vec!["a@acme.com", "b@acme.com"]);
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        let filter = AccountFilter::new(TenantScope::Unrestricted, 0, 20).with_role(Role::Employee);
        assert_eq!(repo.count(&filter).await.unwrap(), 3);

        let filter = AccountFilter::new(TenantScope::Empty, 0, 20);
        assert!(repo.list(&filter).await.unwrap().is_empty());
        assert_eq!(repo.count(&filter).await.unwrap(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_update_never_touches_role() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let company = create_test_company(&mut conn, "Acme").await;
        let account = create_test_account(&mut conn, Some(company.id), Role::Employee, "e@acme.com").await;

        let updated = Accounts::new(&mut conn)
            .update(
                account.id,
                &AccountUpdateDBRequest {
                    name: Some("Renamed".to_string()),
                    address: Some(Some("1 Main St".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.address.as_deref(), Some("1 Main St"));
        assert_eq!(updated.email, "e@acme.com");
        assert_eq!(updated.role, Role::Employee);
    }

    #[test_log::test(tokio::test)]
    async fn test_update_clears_address_only_when_asked() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let company = create_test_company(&mut conn, "Acme").await;
        let account = create_test_account(&mut conn, Some(company.id), Role::Employee, "e@acme.com").await;

        let mut repo = Accounts::new(&mut conn);
        let set = AccountUpdateDBRequest {
            address: Some(Some("1 Road".to_string())),
            ..Default::default()
        };
        assert_eq!(repo.update(account.id, &set).await.unwrap().address.as_deref(), Some("1 Road"));

        let rename = AccountUpdateDBRequest {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.update(account.id, &rename).await.unwrap().address.as_deref(), Some("1 Road"));

        let clear = AccountUpdateDBRequest {
            address: Some(None),
            ..Default::default()
        };
        let cleared = repo.update(account.id, &clear).await.unwrap();
        assert_eq!(cleared.address, None);
        assert_eq!(cleared.name, "Renamed");
    }

    #[test_log::test(tokio::test)]
    async fn test_deleted_account_is_invisible() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let company = create_test_company(&mut conn, "Acme").await;
        let account = create_test_account(&mut conn, Some(company.id), Role::Employee, "e@acme.com").await;

        let mut repo = Accounts::new(&mut conn);
        assert!(repo.delete(account.id).await.unwrap());
        assert!(repo.get_by_id(account.id).await.unwrap().is_none());
        assert!(repo.get_by_email("e@acme.com").await.unwrap().is_none());
        assert!(!repo.set_password(account.id, "new-hash").await.unwrap());
        assert!(!repo.delete(account.id).await.unwrap());
    }
}

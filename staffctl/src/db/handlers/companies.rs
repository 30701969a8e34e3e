//! Database repository for companies.

use chrono::Utc;
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{
            list::{push_name_filter, push_order_and_page},
            repository::Repository,
        },
        models::companies::{CompanyCreateDBRequest, CompanyDBResponse, CompanyFilter, CompanyUpdateDBRequest},
    },
    types::CompanyId,
};

pub struct Companies<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Companies<'c> {
    type CreateRequest = CompanyCreateDBRequest;
    type UpdateRequest = CompanyUpdateDBRequest;
    type Response = CompanyDBResponse;
    type Id = CompanyId;
    type Filter = CompanyFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let company = sqlx::query_as::<_, CompanyDBResponse>(
            r#"
            INSERT INTO companies (name, email, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(company)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let company = sqlx::query_as::<_, CompanyDBResponse>("SELECT * FROM companies WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(company)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM companies WHERE deleted_at IS NULL");
        push_name_filter(&mut query, filter.name.as_deref());
        push_order_and_page(&mut query, &filter.sort, filter.skip, filter.limit);

        let companies = query.build_query_as::<CompanyDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(companies)
    }

    /// Soft deletes the company together with every active account that belongs to it.
    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let now = Utc::now();
        // Savepoint when already inside a transaction
        let mut tx = self.db.begin().await?;

        let result = sqlx::query("UPDATE companies SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let accounts = sqlx::query("UPDATE accounts SET deleted_at = ?, updated_at = ? WHERE company_id = ? AND deleted_at IS NULL")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(accounts = accounts.rows_affected(), "Soft deleted company accounts");
        Ok(true)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let company = sqlx::query_as::<_, CompanyDBResponse>(
            r#"
            UPDATE companies SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(company)
    }
}

impl<'c> Companies<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &CompanyFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM companies WHERE deleted_at IS NULL");
        push_name_filter(&mut query, filter.name.as_deref());

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::pagination::{Sort, SortDirection, SortField},
        db::handlers::Accounts,
        test_utils::{create_test_account, create_test_pool},
        types::{LifecycleState, Role},
    };

    fn company(name: &str, email: &str) -> CompanyCreateDBRequest {
        CompanyCreateDBRequest {
            name: name.to_string(),
            email: email.to_string(),
            phone: "08123456789".to_string(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_create_and_get_company() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        let created = repo.create(&company("Acme", "acme@x.com")).await.unwrap();
        assert_eq!(created.name, "Acme");
        assert_eq!(created.lifecycle(), LifecycleState::Active);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "acme@x.com");
    }

    #[test_log::test(tokio::test)]
    async fn test_duplicate_email_is_unique_violation() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        repo.create(&company("Acme", "acme@x.com")).await.unwrap();
        let err = repo.create(&company("Acme Two", "acme@x.com")).await.unwrap_err();

        match err {
            DbError::UniqueViolation { table, constraint, .. } => {
                assert_eq!(table.as_deref(), Some("companies"));
                assert_eq!(constraint.as_deref(), Some("email"));
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_list_filters_sorts_and_counts() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        repo.create(&company("Acme", "acme@x.com")).await.unwrap();
        repo.create(&company("Globex", "globex@x.com")).await.unwrap();
        repo.create(&company("Acme Labs", "labs@x.com")).await.unwrap();

        let mut filter = CompanyFilter::new(0, 20);
        filter.name = Some("acme".to_string());
        filter.sort = Sort {
            field: SortField::Name,
            direction: SortDirection::Desc,
        };

        let names: Vec<_> = repo.list(&filter).await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Acme Labs", "Acme"]);
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        filter.limit = 1;
        filter.skip = 1;
        let page = repo.list(&filter).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Acme");
    }

    #[test_log::test(tokio::test)]
    async fn test_update_changes_only_supplied_fields() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        let created = repo.create(&company("Acme", "acme@x.com")).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &CompanyUpdateDBRequest {
                    phone: Some("0800".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Acme");
        assert_eq!(updated.phone, "0800");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_is_soft_and_cascades_to_accounts() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let created = Companies::new(&mut conn).create(&company("Acme", "acme@x.com")).await.unwrap();
        let employee = create_test_account(&mut conn, Some(created.id), Role::Employee, "e@acme.com").await;

        let mut repo = Companies::new(&mut conn);
        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(matches!(repo.update(created.id, &Default::default()).await, Err(DbError::NotFound)));

        // The row is still there, tombstoned
        let row = sqlx::query_as::<_, CompanyDBResponse>("SELECT * FROM companies WHERE id = ?")
            .bind(created.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(row.lifecycle(), LifecycleState::Deleted);

        assert!(Accounts::new(&mut conn).get_by_id(employee.id).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_email_stays_taken_after_delete() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Companies::new(&mut conn);

        let created = repo.create(&company("Acme", "acme@x.com")).await.unwrap();
        repo.delete(created.id).await.unwrap();

        let err = repo.create(&company("Acme", "acme@x.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}

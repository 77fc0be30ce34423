use std::marker::PhantomData;

use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::error::{Action, StoreError};
use super::fields::{FieldValue, Fields};

/// A row type stored in one table
///
/// Every record has a generated `id BIGINT` and a `created_at TIMESTAMPTZ`.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    /// Table the record lives in
    const TABLE: &'static str;

    /// Columns selected and returned by the plain CRUD queries
    const COLUMNS: &'static str;

    /// Payload accepted by `create` (everything but id and created_at)
    type New: Fields + Send;

    /// Partial payload accepted by `update`
    type Patch: Fields + Send;
}

/// CRUD accessor bound to one table
pub struct Gateway<T> {
    pool: PgPool,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Gateway<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Gateway<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns every row, newest first
    pub async fn list_all(&self) -> Result<Vec<T>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC",
            T::COLUMNS,
            T::TABLE
        );

        sqlx::query_as::<_, T>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(T::TABLE, Action::Fetching, e))
    }

    /// Returns the row with `id`, or `None` if there is none
    pub async fn get_by_id(&self, id: i64) -> Result<Option<T>, StoreError> {
        self.find_one("id", FieldValue::BigInt(id)).await
    }

    /// Inserts a row and returns it with its generated id and timestamp
    pub async fn create(&self, new: T::New) -> Result<T, StoreError> {
        let fields = new.into_fields();
        if fields.is_empty() {
            return Err(StoreError::EmptyChangeset {
                table: T::TABLE,
                action: Action::Creating,
            });
        }

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        qb.push(T::TABLE).push(" (");
        for (i, (column, _)) in fields.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(*column);
        }
        qb.push(") VALUES (");
        for (i, (_, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(") RETURNING ").push(T::COLUMNS);

        let row = qb
            .build_query_as::<T>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database(T::TABLE, Action::Creating, e))?;

        debug!(table = T::TABLE, "Row created");
        Ok(row)
    }

    /// Writes the supplied columns onto the row with `id`
    pub async fn update(&self, id: i64, patch: T::Patch) -> Result<T, StoreError> {
        let fields = patch.into_fields();
        if fields.is_empty() {
            return Err(StoreError::EmptyChangeset {
                table: T::TABLE,
                action: Action::Updating,
            });
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(T::TABLE).push(" SET ");
        for (i, (column, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(column).push(" = ");
            push_value(&mut qb, value);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(T::COLUMNS);

        let row = qb
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database(T::TABLE, Action::Updating, e))?;

        row.ok_or(StoreError::NotFound {
            table: T::TABLE,
            action: Action::Updating,
            id,
        })
    }

    /// Removes the row with `id`. Referencing rows are left to the schema.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database(T::TABLE, Action::Deleting, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: T::TABLE,
                action: Action::Deleting,
                id,
            });
        }

        debug!(table = T::TABLE, id, "Row deleted");
        Ok(())
    }

    /// Single-row lookup on an equality filter
    ///
    /// Fails with [`StoreError::Ambiguous`] instead of picking one when more
    /// than one row matches.
    pub async fn find_one(
        &self,
        column: &'static str,
        value: FieldValue,
    ) -> Result<Option<T>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(T::COLUMNS)
            .push(" FROM ")
            .push(T::TABLE)
            .push(" WHERE ")
            .push(column)
            .push(" = ");
        push_value(&mut qb, value);
        qb.push(" LIMIT 2");

        let mut rows = qb
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(T::TABLE, Action::Fetching, e))?;

        if rows.len() > 1 {
            return Err(StoreError::Ambiguous {
                table: T::TABLE,
                column,
            });
        }

        Ok(rows.pop())
    }

    /// Rows matching an equality filter, newest first
    pub async fn find_many(
        &self,
        column: &'static str,
        value: FieldValue,
    ) -> Result<Vec<T>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(T::COLUMNS)
            .push(" FROM ")
            .push(T::TABLE)
            .push(" WHERE ")
            .push(column)
            .push(" = ");
        push_value(&mut qb, value);
        qb.push(" ORDER BY created_at DESC");

        qb.build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(T::TABLE, Action::Fetching, e))
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: FieldValue) {
    match value {
        FieldValue::Text(v) => qb.push_bind(v),
        FieldValue::Bool(v) => qb.push_bind(v),
        FieldValue::BigInt(v) => qb.push_bind(v),
        FieldValue::Double(v) => qb.push_bind(v),
    };
}

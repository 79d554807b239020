//! Drag-reorder support shared by the sortable reference tables.

use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;

/// Tables carrying a `sort_order` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortableTable {
    Hospitals,
    Departments,
    Facilities,
    Specialities,
    Memberships,
}

impl SortableTable {
    pub fn table(self) -> &'static str {
        match self {
            SortableTable::Hospitals => "hospitals",
            SortableTable::Departments => "departments",
            SortableTable::Facilities => "facilities",
            SortableTable::Specialities => "specialities",
            SortableTable::Memberships => "memberships",
        }
    }
}

/// Persist `public_ids` as sort orders `0..n`. Unknown ids abort the change.
pub(crate) async fn reorder(
    pool: &SqlitePool,
    table: SortableTable,
    public_ids: &[String],
) -> DatabaseResult<()> {
    let mut tx = pool.begin().await?;
    let now = timestamp();
    let statement = format!(
        "UPDATE {} SET sort_order = ?, updated_at = ? WHERE public_id = ?",
        table.table()
    );

    for (position, public_id) in public_ids.iter().enumerate() {
        let result = sqlx::query(&statement)
            .bind(position as i64)
            .bind(&now)
            .bind(public_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!(
                "{} {public_id}",
                table.table()
            )));
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Sort order placing a new row after every existing one.
pub(crate) async fn next_sort_order(pool: &SqlitePool, table: SortableTable) -> DatabaseResult<i64> {
    let next: i64 = sqlx::query_scalar(&format!(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM {}",
        table.table()
    ))
    .fetch_one(pool)
    .await?;
    Ok(next)
}

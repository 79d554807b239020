//! Hospitals, departments, facilities and specialities.

use crate::entities::{
    Hospital, HospitalFields, HospitalUnit, HospitalUnitFields, Speciality, SpecialityFields,
};
use crate::repos::ordering::{next_sort_order, reorder, SortableTable};
use crate::types::{DatabaseError, DatabaseResult};
use crate::{new_public_id, timestamp};
use sqlx::SqlitePool;

const HOSPITAL_COLUMNS: &str =
    "id, public_id, name, address, phone, email, description, logo, sort_order, created_at, updated_at";
const SPECIALITY_COLUMNS: &str =
    "id, public_id, name, description, sort_order, created_at, updated_at";

/// Departments and facilities share one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Department,
    Facility,
}

impl UnitKind {
    fn sortable(self) -> SortableTable {
        match self {
            UnitKind::Department => SortableTable::Departments,
            UnitKind::Facility => SortableTable::Facilities,
        }
    }

    fn table(self) -> &'static str {
        self.sortable().table()
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitKind::Department => "department",
            UnitKind::Facility => "facility",
        }
    }

    fn select(self) -> String {
        format!(
            "SELECT x.id, x.public_id, x.hospital_id, h.public_id AS hospital_public_id, x.name,
                    x.description, x.sort_order, x.created_at, x.updated_at
             FROM {} x JOIN hospitals h ON h.id = x.hospital_id",
            self.table()
        )
    }
}

#[derive(Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

impl ReferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn reorder(&self, table: SortableTable, public_ids: &[String]) -> DatabaseResult<()> {
        reorder(&self.pool, table, public_ids).await
    }

    // Hospitals

    pub async fn list_hospitals(&self) -> DatabaseResult<Vec<Hospital>> {
        let hospitals = sqlx::query_as::<_, Hospital>(&format!(
            "SELECT {HOSPITAL_COLUMNS} FROM hospitals ORDER BY sort_order, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(hospitals)
    }

    pub async fn find_hospital(&self, public_id: &str) -> DatabaseResult<Option<Hospital>> {
        let hospital = sqlx::query_as::<_, Hospital>(&format!(
            "SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hospital)
    }

    pub async fn create_hospital(&self, fields: &HospitalFields) -> DatabaseResult<Hospital> {
        let now = timestamp();
        let public_id = new_public_id();
        let sort_order = next_sort_order(&self.pool, SortableTable::Hospitals).await?;

        sqlx::query(
            "INSERT INTO hospitals (public_id, name, address, phone, email, description, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&fields.name)
        .bind(&fields.address)
        .bind(&fields.phone)
        .bind(&fields.email)
        .bind(&fields.description)
        .bind(sort_order)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_hospital(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("hospital"))
    }

    pub async fn update_hospital(
        &self,
        id: i64,
        fields: &HospitalFields,
    ) -> DatabaseResult<Hospital> {
        sqlx::query(
            "UPDATE hospitals SET name = ?, address = ?, phone = ?, email = ?, description = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&fields.name)
        .bind(&fields.address)
        .bind(&fields.phone)
        .bind(&fields.email)
        .bind(&fields.description)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let hospital = sqlx::query_as::<_, Hospital>(&format!(
            "SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        hospital.ok_or_else(|| DatabaseError::not_found("hospital"))
    }

    /// Delete a hospital with its departments and facilities.
    pub async fn delete_hospital(&self, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, "hospitals", id).await
    }

    // Departments and facilities

    pub async fn list_units(
        &self,
        kind: UnitKind,
        hospital_id: Option<i64>,
    ) -> DatabaseResult<Vec<HospitalUnit>> {
        let units = sqlx::query_as::<_, HospitalUnit>(&format!(
            "{} WHERE (?1 IS NULL OR x.hospital_id = ?1) ORDER BY x.sort_order, x.name",
            kind.select()
        ))
        .bind(hospital_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(units)
    }

    pub async fn find_unit(
        &self,
        kind: UnitKind,
        public_id: &str,
    ) -> DatabaseResult<Option<HospitalUnit>> {
        let unit = sqlx::query_as::<_, HospitalUnit>(&format!(
            "{} WHERE x.public_id = ?",
            kind.select()
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(unit)
    }

    pub async fn create_unit(
        &self,
        kind: UnitKind,
        fields: &HospitalUnitFields,
    ) -> DatabaseResult<HospitalUnit> {
        let now = timestamp();
        let public_id = new_public_id();
        let sort_order = next_sort_order(&self.pool, kind.sortable()).await?;

        sqlx::query(&format!(
            "INSERT INTO {} (public_id, hospital_id, name, description, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            kind.table()
        ))
        .bind(&public_id)
        .bind(fields.hospital_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(sort_order)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_unit(kind, &public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(kind.label()))
    }

    pub async fn update_unit(
        &self,
        kind: UnitKind,
        id: i64,
        fields: &HospitalUnitFields,
    ) -> DatabaseResult<HospitalUnit> {
        sqlx::query(&format!(
            "UPDATE {} SET hospital_id = ?, name = ?, description = ?, updated_at = ? WHERE id = ?",
            kind.table()
        ))
        .bind(fields.hospital_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let unit = sqlx::query_as::<_, HospitalUnit>(&format!("{} WHERE x.id = ?", kind.select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        unit.ok_or_else(|| DatabaseError::not_found(kind.label()))
    }

    pub async fn delete_unit(&self, kind: UnitKind, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, kind.table(), id).await
    }

    // Specialities

    pub async fn list_specialities(&self) -> DatabaseResult<Vec<Speciality>> {
        let specialities = sqlx::query_as::<_, Speciality>(&format!(
            "SELECT {SPECIALITY_COLUMNS} FROM specialities ORDER BY sort_order, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(specialities)
    }

    pub async fn find_speciality(&self, public_id: &str) -> DatabaseResult<Option<Speciality>> {
        let speciality = sqlx::query_as::<_, Speciality>(&format!(
            "SELECT {SPECIALITY_COLUMNS} FROM specialities WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(speciality)
    }

    pub async fn create_speciality(&self, fields: &SpecialityFields) -> DatabaseResult<Speciality> {
        let now = timestamp();
        let public_id = new_public_id();
        let sort_order = next_sort_order(&self.pool, SortableTable::Specialities).await?;

        sqlx::query(
            "INSERT INTO specialities (public_id, name, description, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(sort_order)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_speciality(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("speciality"))
    }

    pub async fn update_speciality(
        &self,
        id: i64,
        fields: &SpecialityFields,
    ) -> DatabaseResult<Speciality> {
        sqlx::query("UPDATE specialities SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        let speciality = sqlx::query_as::<_, Speciality>(&format!(
            "SELECT {SPECIALITY_COLUMNS} FROM specialities WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        speciality.ok_or_else(|| DatabaseError::not_found("speciality"))
    }

    pub async fn delete_speciality(&self, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, "specialities", id).await
    }

    /// Resolve speciality public ids, failing on the first unknown one.
    pub async fn resolve_speciality_ids(&self, public_ids: &[String]) -> DatabaseResult<Vec<i64>> {
        let mut ids = Vec::with_capacity(public_ids.len());
        for public_id in public_ids {
            let id: Option<i64> =
                sqlx::query_scalar("SELECT id FROM specialities WHERE public_id = ?")
                    .bind(public_id)
                    .fetch_optional(&self.pool)
                    .await?;
            ids.push(id.ok_or_else(|| DatabaseError::not_found(format!("speciality {public_id}")))?);
        }
        Ok(ids)
    }
}

pub(crate) async fn delete_row(pool: &SqlitePool, table: &str, id: i64) -> DatabaseResult<()> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found(table));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;

    fn hospital(name: &str) -> HospitalFields {
        HospitalFields {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_hospitals_are_appended() {
        let (pool, _dir) = test_pool().await;
        let repo = ReferenceRepository::new(pool);

        let first = repo.create_hospital(&hospital("General")).await.unwrap();
        let second = repo.create_hospital(&hospital("St. Mary")).await.unwrap();
        assert_eq!(first.sort_order, 0);
        assert_eq!(second.sort_order, 1);

        let err = repo.create_hospital(&hospital("General")).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_reorder_hospitals() {
        let (pool, _dir) = test_pool().await;
        let repo = ReferenceRepository::new(pool);

        let a = repo.create_hospital(&hospital("A")).await.unwrap();
        let b = repo.create_hospital(&hospital("B")).await.unwrap();
        let c = repo.create_hospital(&hospital("C")).await.unwrap();

        repo.reorder(
            SortableTable::Hospitals,
            &[c.public_id.clone(), a.public_id.clone(), b.public_id.clone()],
        )
        .await
        .unwrap();

        let names: Vec<_> = repo
            .list_hospitals()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);

        let err = repo
            .reorder(
                SortableTable::Hospitals,
                &[a.public_id.clone(), "missing".to_string()],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
        // Nothing from the failed reorder was applied.
        let names: Vec<_> = repo
            .list_hospitals()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_units_belong_to_hospital() {
        let (pool, _dir) = test_pool().await;
        let repo = ReferenceRepository::new(pool);

        let general = repo.create_hospital(&hospital("General")).await.unwrap();
        let other = repo.create_hospital(&hospital("Other")).await.unwrap();

        let fields = HospitalUnitFields {
            hospital_id: general.id,
            name: "Cardiology".into(),
            description: None,
        };
        let unit = repo.create_unit(UnitKind::Department, &fields).await.unwrap();
        assert_eq!(unit.hospital_public_id, general.public_id);

        // Same name is fine in another hospital but not twice in one.
        let err = repo.create_unit(UnitKind::Department, &fields).await.unwrap_err();
        assert!(err.is_duplicate());
        repo.create_unit(
            UnitKind::Department,
            &HospitalUnitFields {
                hospital_id: other.id,
                ..fields.clone()
            },
        )
        .await
        .unwrap();

        assert_eq!(
            repo.list_units(UnitKind::Department, Some(general.id))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(repo
            .list_units(UnitKind::Facility, None)
            .await
            .unwrap()
            .is_empty());

        repo.delete_hospital(general.id).await.unwrap();
        assert!(repo
            .find_unit(UnitKind::Department, &unit.public_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resolve_speciality_ids() {
        let (pool, _dir) = test_pool().await;
        let repo = ReferenceRepository::new(pool);

        let speciality = repo
            .create_speciality(&SpecialityFields {
                name: "Neurology".into(),
                description: None,
            })
            .await
            .unwrap();

        let ids = repo
            .resolve_speciality_ids(&[speciality.public_id.clone()])
            .await
            .unwrap();
        assert_eq!(ids, vec![speciality.id]);

        assert!(repo
            .resolve_speciality_ids(&["nope".to_string()])
            .await
            .is_err());
    }
}

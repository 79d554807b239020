//! Pharmacy reference data.

use crate::entities::{Manufacturer, NamedItem, PharmaCode, PharmaCodeFields};
use crate::repos::reference_repository::delete_row;
use crate::types::{DatabaseError, DatabaseResult};
use crate::{new_public_id, timestamp};
use sqlx::SqlitePool;

const CODE_SELECT: &str = "SELECT c.id, c.public_id, c.code, c.strength,
        b.public_id AS brand_public_id, b.name AS brand_name,
        m.public_id AS manufacturer_public_id, m.name AS manufacturer_name,
        f.public_id AS medication_form_public_id, f.name AS medication_form_name,
        c.created_at, c.updated_at
     FROM pharma_codes c
     JOIN pharma_brands b ON b.id = c.brand_id
     JOIN pharma_manufacturers m ON m.id = c.manufacturer_id
     JOIN medication_forms f ON f.id = c.medication_form_id";

/// Pharmacy tables whose rows only carry a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTable {
    Brands,
    MedicationForms,
}

impl NamedTable {
    fn table(self) -> &'static str {
        match self {
            NamedTable::Brands => "pharma_brands",
            NamedTable::MedicationForms => "medication_forms",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NamedTable::Brands => "brand",
            NamedTable::MedicationForms => "medication form",
        }
    }
}

#[derive(Clone)]
pub struct PharmaRepository {
    pool: SqlitePool,
}

impl PharmaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Brands and medication forms

    pub async fn list_named(&self, table: NamedTable) -> DatabaseResult<Vec<NamedItem>> {
        let items = sqlx::query_as::<_, NamedItem>(&format!(
            "SELECT id, public_id, name, created_at, updated_at FROM {} ORDER BY name",
            table.table()
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn find_named(
        &self,
        table: NamedTable,
        public_id: &str,
    ) -> DatabaseResult<Option<NamedItem>> {
        let item = sqlx::query_as::<_, NamedItem>(&format!(
            "SELECT id, public_id, name, created_at, updated_at FROM {} WHERE public_id = ?",
            table.table()
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn create_named(&self, table: NamedTable, name: &str) -> DatabaseResult<NamedItem> {
        let now = timestamp();
        let public_id = new_public_id();

        sqlx::query(&format!(
            "INSERT INTO {} (public_id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            table.table()
        ))
        .bind(&public_id)
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_named(table, &public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(table.label()))
    }

    pub async fn rename_named(
        &self,
        table: NamedTable,
        id: i64,
        name: &str,
    ) -> DatabaseResult<NamedItem> {
        sqlx::query(&format!(
            "UPDATE {} SET name = ?, updated_at = ? WHERE id = ?",
            table.table()
        ))
        .bind(name)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let item = sqlx::query_as::<_, NamedItem>(&format!(
            "SELECT id, public_id, name, created_at, updated_at FROM {} WHERE id = ?",
            table.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        item.ok_or_else(|| DatabaseError::not_found(table.label()))
    }

    pub async fn delete_named(&self, table: NamedTable, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, table.table(), id).await
    }

    // Manufacturers

    pub async fn list_manufacturers(&self) -> DatabaseResult<Vec<Manufacturer>> {
        let manufacturers = sqlx::query_as::<_, Manufacturer>(
            "SELECT id, public_id, name, country, created_at, updated_at FROM pharma_manufacturers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(manufacturers)
    }

    pub async fn find_manufacturer(&self, public_id: &str) -> DatabaseResult<Option<Manufacturer>> {
        let manufacturer = sqlx::query_as::<_, Manufacturer>(
            "SELECT id, public_id, name, country, created_at, updated_at FROM pharma_manufacturers WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(manufacturer)
    }

    pub async fn create_manufacturer(
        &self,
        name: &str,
        country: Option<&str>,
    ) -> DatabaseResult<Manufacturer> {
        let now = timestamp();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO pharma_manufacturers (public_id, name, country, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(name)
        .bind(country)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_manufacturer(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("manufacturer"))
    }

    pub async fn update_manufacturer(
        &self,
        id: i64,
        name: &str,
        country: Option<&str>,
    ) -> DatabaseResult<Manufacturer> {
        sqlx::query(
            "UPDATE pharma_manufacturers SET name = ?, country = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(country)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let manufacturer = sqlx::query_as::<_, Manufacturer>(
            "SELECT id, public_id, name, country, created_at, updated_at FROM pharma_manufacturers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        manufacturer.ok_or_else(|| DatabaseError::not_found("manufacturer"))
    }

    pub async fn delete_manufacturer(&self, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, "pharma_manufacturers", id).await
    }

    // Codes

    pub async fn list_codes(&self, brand_id: Option<i64>) -> DatabaseResult<Vec<PharmaCode>> {
        let codes = sqlx::query_as::<_, PharmaCode>(&format!(
            "{CODE_SELECT} WHERE (?1 IS NULL OR c.brand_id = ?1) ORDER BY c.code"
        ))
        .bind(brand_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    pub async fn find_code(&self, public_id: &str) -> DatabaseResult<Option<PharmaCode>> {
        let code = sqlx::query_as::<_, PharmaCode>(&format!("{CODE_SELECT} WHERE c.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    pub async fn create_code(&self, fields: &PharmaCodeFields) -> DatabaseResult<PharmaCode> {
        let now = timestamp();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO pharma_codes (public_id, code, brand_id, manufacturer_id, medication_form_id, strength, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&fields.code)
        .bind(fields.brand_id)
        .bind(fields.manufacturer_id)
        .bind(fields.medication_form_id)
        .bind(&fields.strength)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_code(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("pharma code"))
    }

    pub async fn update_code(&self, id: i64, fields: &PharmaCodeFields) -> DatabaseResult<PharmaCode> {
        sqlx::query(
            "UPDATE pharma_codes SET code = ?, brand_id = ?, manufacturer_id = ?, medication_form_id = ?,
                strength = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&fields.code)
        .bind(fields.brand_id)
        .bind(fields.manufacturer_id)
        .bind(fields.medication_form_id)
        .bind(&fields.strength)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let code = sqlx::query_as::<_, PharmaCode>(&format!("{CODE_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        code.ok_or_else(|| DatabaseError::not_found("pharma code"))
    }

    pub async fn delete_code(&self, id: i64) -> DatabaseResult<()> {
        delete_row(&self.pool, "pharma_codes", id).await
    }
}

//! Cell rendering.
//!
//! Every value leaves the executor as text. Rendering uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Backend-specific decoders extract the value and format it
//!
//! SQL NULL becomes `None`; an empty string stays `Some("")`.

use crate::models::BackendKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Binary,
    Json,
    Text,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, kind: BackendKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Checked before floats: "numeric" would otherwise be ambiguous
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity holds REAL or INTEGER values
        if kind == BackendKind::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.contains("interval") {
        return TypeCategory::Text;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower.starts_with("timestamp") || lower == "datetime" || lower == "date" || lower == "time"
    {
        return TypeCategory::Temporal;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    TypeCategory::Text
}

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Render binary data as text: UTF-8 when valid, base64 otherwise.
pub fn binary_to_text(bytes: &[u8]) -> String {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

/// Render a float without a trailing `.0` for whole numbers.
pub fn float_to_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn undecodable(type_name: &str) -> Option<String> {
    Some(format!("<{}>", type_name.to_lowercase()))
}

/// Trait for rendering database rows as text cells.
pub trait RowToText {
    fn column_names(&self) -> Vec<String>;
    fn to_text_cells(&self) -> Vec<Option<String>>;
}

impl RowToText for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> Vec<Option<String>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, BackendKind::Postgres);
                postgres::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl RowToText for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> Vec<Option<String>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, BackendKind::MySql);
                mysql::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl RowToText for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> Vec<Option<String>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, BackendKind::SQLite);
                sqlite::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Option<String> {
        if row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true) {
            return None;
        }
        let rendered = match category {
            TypeCategory::Decimal => row.try_get::<RawDecimal, _>(idx).ok().map(|v| v.0),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(|v| v.to_string()),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx, type_name),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            TypeCategory::Json => row
                .try_get::<serde_json::Value, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Text => None,
        };
        rendered
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok())
            .or_else(|| {
                tracing::debug!(column = idx, type_name, "Undecodable PostgreSQL value");
                undecodable(type_name)
            })
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<i64, _>(idx).ok().map(|v| v.to_string())
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_to_text(v));
        }
        row.try_get::<f32, _>(idx)
            .ok()
            .map(|v| float_to_text(v as f64))
    }

    fn decode_temporal(row: &PgRow, idx: usize, type_name: &str) -> Option<String> {
        match type_name.to_lowercase().as_str() {
            "timestamptz" => row
                .try_get::<DateTime<Utc>, _>(idx)
                .ok()
                .map(|v| v.format(TIMESTAMP_FORMAT).to_string()),
            "timestamp" => row
                .try_get::<NaiveDateTime, _>(idx)
                .ok()
                .map(|v| v.format(TIMESTAMP_FORMAT).to_string()),
            "date" => row.try_get::<NaiveDate, _>(idx).ok().map(|v| v.to_string()),
            "time" => row.try_get::<NaiveTime, _>(idx).ok().map(|v| v.to_string()),
            _ => None,
        }
    }
}

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Option<String> {
        if row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true) {
            return None;
        }
        let rendered = match category {
            TypeCategory::Decimal => row.try_get::<RawDecimal, _>(idx).ok().map(|v| v.0),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(|v| v.to_string()),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx, type_name),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            TypeCategory::Json => row
                .try_get::<serde_json::Value, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Text => None,
        };
        rendered
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok())
            .or_else(|| {
                tracing::debug!(column = idx, type_name, "Undecodable MySQL value");
                undecodable(type_name)
            })
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<i8, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<u64, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<u32, _>(idx).ok().map(|v| v.to_string())
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_to_text(v));
        }
        row.try_get::<f32, _>(idx)
            .ok()
            .map(|v| float_to_text(v as f64))
    }

    fn decode_temporal(row: &MySqlRow, idx: usize, type_name: &str) -> Option<String> {
        match type_name.to_lowercase().as_str() {
            "timestamp" => row
                .try_get::<DateTime<Utc>, _>(idx)
                .ok()
                .map(|v| v.format(TIMESTAMP_FORMAT).to_string()),
            "datetime" => row
                .try_get::<NaiveDateTime, _>(idx)
                .ok()
                .map(|v| v.format(TIMESTAMP_FORMAT).to_string()),
            "date" => row.try_get::<NaiveDate, _>(idx).ok().map(|v| v.to_string()),
            "time" => row.try_get::<NaiveTime, _>(idx).ok().map(|v| v.to_string()),
            _ => None,
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Option<String> {
        if row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true) {
            return None;
        }
        // SQLite is dynamically typed; the declared type is only a hint
        let rendered = match category {
            TypeCategory::Integer | TypeCategory::Boolean => {
                row.try_get::<i64, _>(idx).ok().map(|v| v.to_string())
            }
            TypeCategory::Float | TypeCategory::Decimal => {
                row.try_get::<f64, _>(idx).ok().map(float_to_text)
            }
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            _ => None,
        };
        rendered
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok())
            .or_else(|| {
                row.try_get_unchecked::<Vec<u8>, _>(idx)
                    .ok()
                    .map(|v| binary_to_text(&v))
            })
            .or_else(|| undecodable(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT4", BackendKind::Postgres),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT", BackendKind::MySql),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("TINYINT", BackendKind::MySql),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(
            categorize_type("NUMERIC", BackendKind::Postgres),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("DECIMAL", BackendKind::MySql),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("numeric", BackendKind::SQLite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", BackendKind::Postgres),
            TypeCategory::Temporal
        );
        assert_eq!(
            categorize_type("DATETIME", BackendKind::MySql),
            TypeCategory::Temporal
        );
        assert_eq!(
            categorize_type("INTERVAL", BackendKind::Postgres),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_categorize_type_fallback_is_text() {
        assert_eq!(
            categorize_type("VARCHAR", BackendKind::MySql),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("NAME", BackendKind::Postgres),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_binary_to_text() {
        assert_eq!(binary_to_text(b"hello world"), "hello world");
        assert_eq!(binary_to_text(&[0xFF, 0xFE, 0x00, 0x01]), "//4AAQ==");
        assert_eq!(binary_to_text(&[]), "");
    }

    #[test]
    fn test_float_to_text() {
        assert_eq!(float_to_text(42.0), "42");
        assert_eq!(float_to_text(87.25), "87.25");
        assert_eq!(float_to_text(f64::NAN), "NaN");
    }

    #[tokio::test]
    async fn test_sqlite_rows_render_null_distinct_from_empty() {
        use sqlx::Connection;

        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:")
            .await
            .unwrap();
        let row: SqliteRow = sqlx::query("SELECT 1 AS n, 2.5 AS f, '' AS e, NULL AS z, 'x' AS t")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.column_names(), vec!["n", "f", "e", "z", "t"]);
        assert_eq!(
            row.to_text_cells(),
            vec![
                Some("1".to_string()),
                Some("2.5".to_string()),
                Some(String::new()),
                None,
                Some("x".to_string()),
            ]
        );
    }
}

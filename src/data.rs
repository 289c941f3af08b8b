use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::{sqlite::SqliteRow, Column, Row, TypeInfo, ValueRef};

/// One stored row, keyed by column name in column order, as `SELECT *` returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CatalogRow(Map<String, Value>);

impl CatalogRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

impl TryFrom<&SqliteRow> for CatalogRow {
    type Error = sqlx::Error;

    // SQLite is dynamically typed, so the storage class of each value decides
    // its JSON shape rather than the declared column type.
    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        let mut fields = Map::with_capacity(row.len());

        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;

            let value = if raw.is_null() {
                Value::Null
            } else {
                match raw.type_info().name() {
                    "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
                    "REAL" => Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index)?),
                    _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
                }
            };

            fields.insert(column.name().to_owned(), value);
        }

        Ok(Self(fields))
    }
}

use actix_web::error::ErrorBadRequest;
use sqlx::MySqlPool;

/// Value bound into a dynamic statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    F64(f64),
    Null,
}

impl From<Option<f64>> for SqlValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::F64)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::String)
    }
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Collects `column = ?` assignments for a partial UPDATE.
///
/// Columns come from code, never from the request body.
#[derive(Debug, Default)]
pub struct UpdateBuilder {
    columns: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.columns.push(column);
        self.values.push(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn build(self, table: &str, id: u64) -> Result<SqlUpdate, actix_web::Error> {
        if self.columns.is_empty() {
            return Err(ErrorBadRequest("No fields provided for update"));
        }

        let set_clause = self
            .columns
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut values = self.values;
        values.push(SqlValue::U64(id));

        Ok(SqlUpdate {
            sql: format!("UPDATE {} SET {} WHERE id = ?", table, set_clause),
            values,
        })
    }
}

/// Runs the update and returns the number of matched rows.
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_update_sql() {
        let mut builder = UpdateBuilder::new();
        builder
            .set("name", SqlValue::String("Depot".to_string()))
            .set("radius_m", None::<f64>);

        let update = builder.build("work_zones", 4).unwrap();
        assert_eq!(update.sql, "UPDATE work_zones SET name = ?, radius_m = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Depot".to_string()),
                SqlValue::Null,
                SqlValue::U64(4)
            ]
        );
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert!(UpdateBuilder::new().build("work_zones", 1).is_err());
    }
}

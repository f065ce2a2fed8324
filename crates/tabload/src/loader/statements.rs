//! SQL text for table creation and batched inserts.

use crate::core::schema::InferredSchema;

/// Storage engine, charset and collation of every created table.
pub const TABLE_OPTIONS: &str =
    "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

/// MySQL max placeholders per prepared statement.
pub const MYSQL_MAX_PLACEHOLDERS: usize = 65_535;

/// Build the idempotent `CREATE TABLE IF NOT EXISTS` statement.
pub fn create_table_sql(table: &str, schema: &InferredSchema) -> String {
    let col_defs: Vec<String> = schema
        .iter()
        .map(|c| format!("{} {}", c.name, c.sql_type))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n) {}",
        table,
        col_defs.join(", "),
        TABLE_OPTIONS
    )
}

/// Build a multi-row `INSERT` with one placeholder tuple per row.
pub fn insert_sql(table: &str, columns: &[String], rows: usize) -> String {
    let placeholders_per_row = format!("({})", vec!["?"; columns.len()].join(", "));
    let all_placeholders: Vec<String> = std::iter::repeat_n(placeholders_per_row, rows).collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        all_placeholders.join(", ")
    )
}

/// Rows that fit in one statement without exceeding `max_placeholders`.
pub fn rows_per_statement(columns: usize, max_placeholders: usize) -> usize {
    (max_placeholders / columns.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_shape() {
        let mut schema = InferredSchema::new();
        schema.push("order_id_", "INT UNSIGNED");
        schema.push("note", "TEXT");

        assert_eq!(
            create_table_sql("orders", &schema),
            "CREATE TABLE IF NOT EXISTS orders (\n    order_id_ INT UNSIGNED, note TEXT\n) \
             ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
        );
    }

    #[test]
    fn test_insert_shape() {
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            insert_sql("t", &cols, 1),
            "INSERT INTO t (a, b) VALUES (?, ?)"
        );
        assert_eq!(
            insert_sql("t", &cols, 3),
            "INSERT INTO t (a, b) VALUES (?, ?), (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_rows_per_statement() {
        assert_eq!(rows_per_statement(2, MYSQL_MAX_PLACEHOLDERS), 32_767);
        assert_eq!(rows_per_statement(100, MYSQL_MAX_PLACEHOLDERS), 655);
        assert_eq!(rows_per_statement(0, 10), 10);
        assert_eq!(rows_per_statement(20, 10), 1);
    }
}

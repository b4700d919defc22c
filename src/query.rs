//! Pure WHERE/ORDER BY construction from sparse rows, row filters and raw
//! predicate strings. Nothing here touches the connection.

use crate::error::DbError;
use crate::filter::RowFilter;
use crate::row::Row;
use crate::schema::Schema;
use crate::value::Value;

/// Render the equality-and-date-range predicate for a sparse filter row.
///
/// Every set field contributes `<col> = <literal>`; the filter's date bounds
/// contribute `<field> >= <lower>` / `<field> <= <upper>` when both the
/// field name and the bound are present. Returns `None` when no predicate
/// applies, so callers can omit the WHERE keyword entirely.
pub(crate) fn where_clause(
    row: &Row,
    filter: Option<&RowFilter>,
) -> Result<Option<String>, DbError> {
    let mut predicates: Vec<String> = row
        .set_columns()
        .map(|(col, val)| format!("{} = {}", col.name(), val.to_sql_literal()))
        .collect();

    if let Some(filter) = filter {
        if let Some(field) = &filter.date_field {
            check_column(row.schema(), field)?;
            if let Some(earliest) = filter.earliest {
                predicates.push(format!(
                    "{field} >= {}",
                    Value::Date(earliest).to_sql_literal()
                ));
            }
            if let Some(latest) = filter.latest {
                predicates.push(format!(
                    "{field} <= {}",
                    Value::Date(latest).to_sql_literal()
                ));
            }
        }
    }

    if predicates.is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!("WHERE {}", predicates.join(" AND "))))
    }
}

/// Render `ORDER BY <col> [DESC]` from the filter, or `None` when no sort
/// column is named.
pub(crate) fn order_clause(
    schema: &Schema,
    filter: Option<&RowFilter>,
) -> Result<Option<String>, DbError> {
    let Some(filter) = filter else { return Ok(None) };
    let Some(sort_by) = &filter.sort_by else { return Ok(None) };
    check_column(schema, sort_by)?;
    let direction = if filter.sort_desc { " DESC" } else { "" };
    Ok(Some(format!("ORDER BY {sort_by}{direction}")))
}

/// Normalize a caller-supplied predicate so that `"a = 1"`, `"where a = 1"`
/// and `"WHERE a = 1"` are interchangeable: any leading WHERE token is
/// stripped case-insensitively and exactly one canonical `WHERE` is
/// re-prefixed. Whitespace-only input yields no clause.
pub(crate) fn normalize_raw_where(raw: &str) -> Option<String> {
    let mut predicate = raw.trim();
    if let Some(head) = predicate.get(..5) {
        if head.eq_ignore_ascii_case("where") {
            let rest = &predicate[5..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                predicate = rest.trim_start();
            }
        }
    }
    if predicate.is_empty() {
        None
    } else {
        Some(format!("WHERE {predicate}"))
    }
}

/// Allow-list check: column names folded into SQL text must exist on the
/// declared schema.
pub(crate) fn check_column(schema: &Schema, column: &str) -> Result<(), DbError> {
    if schema.column(column).is_some() {
        Ok(())
    } else {
        Err(DbError::UnknownColumn {
            table: schema.table_name().to_string(),
            column: column.to_string(),
        })
    }
}

//! Natural-key upsert primitive: `INSERT ... ON CONFLICT ... DO UPDATE`,
//! with an explicit per-row inserted/updated outcome instead of guessing
//! from an opaque affected-row count.

use chrono::{DateTime, NaiveDate, Utc};

use crate::normalize::AttrValue;

/// Closed set of bindable values. Rows handed to the upsert engine are
/// already reduced to a fixed column order of these.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    BigInt(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Null,
}

impl SqlValue {
    /// Normalized attribute → bind value; absent attribute → NULL.
    pub fn from_attr(v: Option<&AttrValue>) -> SqlValue {
        match v {
            Some(AttrValue::Int(i)) => SqlValue::BigInt(*i),
            Some(AttrValue::Float(f)) => SqlValue::Float(*f),
            Some(AttrValue::Text(s)) => SqlValue::Text(s.clone()),
            Some(AttrValue::Bool(b)) => SqlValue::Bool(*b),
            None => SqlValue::Null,
        }
    }

    pub fn opt_int(v: Option<i64>) -> SqlValue {
        v.map(SqlValue::BigInt).unwrap_or(SqlValue::Null)
    }

    pub fn opt_text(v: Option<String>) -> SqlValue {
        v.map(SqlValue::Text).unwrap_or(SqlValue::Null)
    }
}

/// One upsert invocation. `update_columns = None` updates every non-key
/// column on conflict.
pub struct UpsertRequest<'a> {
    pub table: &'a str,
    pub columns: &'a [&'a str],
    pub rows: Vec<Vec<SqlValue>>,
    pub conflict_columns: &'a [&'a str],
    pub update_columns: Option<&'a [&'a str]>,
}

/// Outcome of an upsert, split by what actually happened per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertReport {
    pub fn affected(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Non-key columns to rewrite on conflict when the caller does not narrow
/// the update set.
pub(crate) fn resolve_update_columns<'a>(
    columns: &'a [&'a str],
    conflict_columns: &'a [&'a str],
    update_columns: Option<&'a [&'a str]>,
) -> Vec<&'a str> {
    match update_columns {
        Some(explicit) => explicit.to_vec(),
        None => columns
            .iter()
            .copied()
            .filter(|c| !conflict_columns.contains(c))
            .collect(),
    }
}

/// Trailing clause of the statement. Table and column names are crate
/// constants, never caller input, so interpolation here is safe.
pub(crate) fn conflict_clause(conflict_columns: &[&str], update_columns: &[&str]) -> String {
    let assignments: Vec<String> = update_columns
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        " ON CONFLICT ({}) DO UPDATE SET {} RETURNING (xmax = 0) AS inserted",
        conflict_columns.join(", "),
        assignments.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_update_set_to_all_non_key_columns() {
        let cols = ["a", "b", "c", "d"];
        let key = ["a", "b"];
        assert_eq!(resolve_update_columns(&cols, &key, None), ["c", "d"]);
        assert_eq!(
            resolve_update_columns(&cols, &key, Some(&["c"])),
            ["c"]
        );
    }

    #[test]
    fn conflict_clause_shape() {
        let clause = conflict_clause(&["team_id", "stat_type"], &["wins", "draws"]);
        assert_eq!(
            clause,
            " ON CONFLICT (team_id, stat_type) DO UPDATE SET \
             wins = EXCLUDED.wins, draws = EXCLUDED.draws \
             RETURNING (xmax = 0) AS inserted"
        );
    }

    #[test]
    fn from_attr_maps_absent_to_null() {
        assert_eq!(SqlValue::from_attr(None), SqlValue::Null);
        assert_eq!(
            SqlValue::from_attr(Some(&AttrValue::Int(4))),
            SqlValue::BigInt(4)
        );
    }
}

//! Schema normalization: maps heterogeneous feed rows (arbitrary column
//! names) onto fixed canonical records per statistic category.

pub mod fields;
pub mod value;

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub use fields::{
    player_fields, team_fields, FieldKind, FieldSpec, Slot, StatCategory, PLAYER_COMMON,
};
pub use value::{is_missing, AttrValue};

use crate::source::FeedRow;

/// A feed row reduced to canonical shape: promoted columns by canonical
/// name, plus the overflow map holding everything the category tables do
/// not claim. Overflow order follows the source row.
#[derive(Debug, Default)]
pub struct StatRecord {
    columns: HashMap<&'static str, AttrValue>,
    extra: IndexMap<String, AttrValue>,
}

impl StatRecord {
    /// Resolved value for a promoted column, if the row supplied one.
    pub fn column(&self, name: &str) -> Option<&AttrValue> {
        self.columns.get(name)
    }

    pub fn extra(&self) -> &IndexMap<String, AttrValue> {
        &self.extra
    }

    /// Overflow map as the JSON object stored in `additional_stats`.
    pub fn extra_json(&self) -> Value {
        Value::Object(
            self.extra
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// First alias present in the row with a non-missing value.
pub fn first_alias<'a>(row: &'a FeedRow, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(v) = row.get(*alias) {
            if !is_missing(v) {
                return Some(v);
            }
        }
    }
    None
}

/// First alias rendered as a trimmed, non-empty string. Used for identity
/// columns (team/player names) ahead of normalization.
pub fn alias_str(row: &FeedRow, aliases: &[&str]) -> Option<String> {
    let v = first_alias(row, aliases)?;
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Coerce a feed value to the declared kind. Failure is a `None`, never an
/// error: one undecodable cell must not sink the row.
pub fn coerce(kind: FieldKind, v: &Value) -> Option<AttrValue> {
    match kind {
        FieldKind::Int => coerce_int(v).map(AttrValue::Int),
        FieldKind::Float => coerce_float(v).map(AttrValue::Float),
        FieldKind::Text(max) => Some(AttrValue::Text(truncate_chars(&render_text(v), max))),
    }
}

pub(crate) fn coerce_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        // Feeds render large counts with thousands separators ("52,219").
        Value::String(s) => s.trim().replace(',', "").parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn render_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Normalize one row against the given spec groups (e.g. the shared player
/// fields plus the category table). `identity_aliases` names the columns
/// already consumed for entity resolution; they are kept out of the
/// overflow map, as is every column claimed by any spec's alias chain.
pub fn normalize_row(
    row: &FeedRow,
    groups: &[&[FieldSpec]],
    identity_aliases: &[&str],
) -> StatRecord {
    let mut record = StatRecord::default();
    let mut claimed: HashSet<&str> = identity_aliases.iter().copied().collect();

    for group in groups {
        for spec in *group {
            claimed.extend(spec.aliases.iter().copied());
            let Some(raw) = first_alias(row, spec.aliases) else {
                continue;
            };
            let Some(coerced) = coerce(spec.kind, raw) else {
                continue;
            };
            match spec.slot {
                Slot::Column => {
                    record.columns.insert(spec.canonical, coerced);
                }
                Slot::Extra => {
                    record.extra.insert(spec.canonical.to_string(), coerced);
                }
            }
        }
    }

    // Unclaimed columns survive verbatim so schema drift loses nothing.
    for (name, raw) in row {
        if claimed.contains(name.as_str()) {
            continue;
        }
        if let Some(v) = AttrValue::from_json(raw) {
            record.extra.insert(name.clone(), v);
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::fields::{player_fields, team_fields, PLAYER_COMMON};
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> FeedRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    const TEAM_IDENTITY: &[&str] = &["team", "Team", "Squad"];

    #[test]
    fn any_declared_alias_yields_the_same_canonical_value() {
        for alias in ["GF", "Goals For"] {
            let r = row(&[(alias, json!(61))]);
            let rec = normalize_row(&r, &[team_fields(StatCategory::Standard)], TEAM_IDENTITY);
            assert_eq!(rec.column("goals_for"), Some(&AttrValue::Int(61)));
        }
    }

    #[test]
    fn first_alias_wins_and_nulls_are_skipped() {
        let r = row(&[("W", Value::Null), ("Wins", json!(12))]);
        let rec = normalize_row(&r, &[team_fields(StatCategory::Standard)], TEAM_IDENTITY);
        assert_eq!(rec.column("wins"), Some(&AttrValue::Int(12)));
    }

    #[test]
    fn coercion_failure_leaves_the_field_null_without_sinking_the_row() {
        let r = row(&[("GF", json!("n/a")), ("GA", json!("38"))]);
        let rec = normalize_row(&r, &[team_fields(StatCategory::Standard)], TEAM_IDENTITY);
        assert_eq!(rec.column("goals_for"), None);
        assert_eq!(rec.column("goals_against"), Some(&AttrValue::Int(38)));
    }

    #[test]
    fn unknown_columns_are_preserved_in_overflow() {
        let r = row(&[
            ("Squad", json!("Arsenal")),
            ("GF", json!(61)),
            ("BrandNewMetric", json!(3.2)),
            ("Nested", json!({"a": 1})),
        ]);
        let rec = normalize_row(&r, &[team_fields(StatCategory::Standard)], TEAM_IDENTITY);
        assert_eq!(
            rec.extra().get("BrandNewMetric"),
            Some(&AttrValue::Float(3.2))
        );
        // Non-primitive values are stringified rather than dropped.
        assert_eq!(
            rec.extra().get("Nested"),
            Some(&AttrValue::Text("{\"a\":1}".into()))
        );
        // Identity and claimed columns stay out of the overflow map.
        assert!(rec.extra().get("Squad").is_none());
        assert!(rec.extra().get("GF").is_none());
    }

    #[test]
    fn categories_never_populate_foreign_fields() {
        // A shooting row exposing passing columns: the passing values must
        // overflow, not land in canonical slots.
        let r = row(&[("Sh", json!(14)), ("Cmp", json!(450))]);
        let rec = normalize_row(&r, &[team_fields(StatCategory::Shooting)], TEAM_IDENTITY);
        assert_eq!(rec.column("shots"), Some(&AttrValue::Int(14)));
        assert_eq!(rec.column("passes_completed"), None);
        assert_eq!(rec.extra().get("Cmp"), Some(&AttrValue::Int(450)));
    }

    #[test]
    fn extra_slot_fields_are_promoted_into_overflow_under_canonical_names() {
        let r = row(&[("xG", json!(1.7)), ("Gls", json!(2))]);
        let rec = normalize_row(
            &r,
            &[PLAYER_COMMON, player_fields(StatCategory::Standard)],
            &["player", "Player"],
        );
        assert_eq!(rec.column("goals"), Some(&AttrValue::Int(2)));
        assert_eq!(
            rec.extra().get("expected_goals"),
            Some(&AttrValue::Float(1.7))
        );
        // The raw alias does not re-appear alongside its promotion.
        assert!(rec.extra().get("xG").is_none());
    }

    #[test]
    fn integer_coercion_handles_separators_and_fractions() {
        assert_eq!(coerce_int(&json!("52,219")), Some(52219));
        assert_eq!(coerce_int(&json!(3.0)), Some(3));
        assert_eq!(coerce_int(&json!("abc")), None);
        assert_eq!(coerce_float(&json!("33.3")), Some(33.3));
        assert_eq!(coerce_float(&json!("33%")), None);
    }

    #[test]
    fn text_truncation_is_character_based() {
        assert_eq!(truncate_chars("São Paulo Arena", 9), "São Paulo");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}

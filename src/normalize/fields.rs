//! Declarative field tables: one ordered alias chain per canonical field,
//! per statistic category. Adding a category or alias is a data change here,
//! not a code change in the loaders.

use std::fmt;
use std::str::FromStr;

/// One statistical grouping with its own canonical field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Standard,
    Shooting,
    Passing,
    PassingTypes,
    Defense,
    Possession,
    Goalkeeping,
    Misc,
}

impl StatCategory {
    /// Stored as `stat_type` in the stats tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatCategory::Standard => "standard",
            StatCategory::Shooting => "shooting",
            StatCategory::Passing => "passing",
            StatCategory::PassingTypes => "passing_types",
            StatCategory::Defense => "defense",
            StatCategory::Possession => "possession",
            StatCategory::Goalkeeping => "goalkeeping",
            StatCategory::Misc => "misc",
        }
    }

    /// Categories published for team season stats, in load order.
    pub const TEAM: &'static [StatCategory] = &[
        StatCategory::Standard,
        StatCategory::Shooting,
        StatCategory::Passing,
        StatCategory::PassingTypes,
        StatCategory::Defense,
        StatCategory::Possession,
        StatCategory::Misc,
    ];

    /// Categories published for player season stats, in load order.
    pub const PLAYER: &'static [StatCategory] = &[
        StatCategory::Standard,
        StatCategory::Shooting,
        StatCategory::Passing,
        StatCategory::Defense,
        StatCategory::Possession,
        StatCategory::Goalkeeping,
    ];

    /// Default player load set: goalkeeping has a different row population
    /// and is opt-in.
    pub fn player_defaults() -> Vec<StatCategory> {
        Self::PLAYER
            .iter()
            .copied()
            .filter(|c| *c != StatCategory::Goalkeeping)
            .collect()
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(StatCategory::Standard),
            "shooting" => Ok(StatCategory::Shooting),
            "passing" => Ok(StatCategory::Passing),
            "passing_types" => Ok(StatCategory::PassingTypes),
            "defense" => Ok(StatCategory::Defense),
            "possession" => Ok(StatCategory::Possession),
            "goalkeeping" => Ok(StatCategory::Goalkeeping),
            "misc" => Ok(StatCategory::Misc),
            other => Err(anyhow::anyhow!("unknown stat category {other:?}")),
        }
    }
}

/// Coercion target for a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    /// String truncated to the given number of characters.
    Text(usize),
}

/// Where a resolved value lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// First-class column on the stats table.
    Column,
    /// Promoted into the overflow map under the canonical name.
    Extra,
}

/// One canonical field with its ordered source-column alias chain. The
/// first alias present with a non-missing value wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
    pub slot: Slot,
}

const fn col(
    canonical: &'static str,
    aliases: &'static [&'static str],
    kind: FieldKind,
) -> FieldSpec {
    FieldSpec {
        canonical,
        aliases,
        kind,
        slot: Slot::Column,
    }
}

const fn extra(
    canonical: &'static str,
    aliases: &'static [&'static str],
    kind: FieldKind,
) -> FieldSpec {
    FieldSpec {
        canonical,
        aliases,
        kind,
        slot: Slot::Extra,
    }
}

// --- team season stats -----------------------------------------------------

const TEAM_STANDARD: &[FieldSpec] = &[
    col("matches_played", &["# Pl", "MP", "Matches"], FieldKind::Int),
    col("wins", &["W", "Wins"], FieldKind::Int),
    col("draws", &["D", "Draws"], FieldKind::Int),
    col("losses", &["L", "Losses"], FieldKind::Int),
    col("goals_for", &["GF", "Goals For"], FieldKind::Int),
    col("goals_against", &["GA", "Goals Against"], FieldKind::Int),
    col("yellow_cards", &["CrdY", "Yellow Cards"], FieldKind::Int),
    col("red_cards", &["CrdR", "Red Cards"], FieldKind::Int),
];

const TEAM_SHOOTING: &[FieldSpec] = &[
    col("shots", &["Sh", "Shots"], FieldKind::Int),
    col("shots_on_target", &["SoT", "Shots on Target"], FieldKind::Int),
    col("shots_on_target_pct", &["SoT%"], FieldKind::Float),
    extra("goals_per_shot", &["G/Sh"], FieldKind::Float),
    extra("goals_per_shot_on_target", &["G/SoT"], FieldKind::Float),
];

const TEAM_PASSING: &[FieldSpec] = &[
    col("passes_completed", &["Cmp", "Passes Completed"], FieldKind::Int),
    col("passes_attempted", &["Att", "Passes Attempted"], FieldKind::Int),
    col(
        "pass_completion_pct",
        &["Cmp%", "Pass Completion %"],
        FieldKind::Float,
    ),
    extra("progressive_passes", &["PrgP"], FieldKind::Int),
    extra("key_passes", &["KP"], FieldKind::Int),
];

// Pass-type breakdowns have no promoted columns; everything overflows.
const TEAM_PASSING_TYPES: &[FieldSpec] = &[];

const TEAM_DEFENSE: &[FieldSpec] = &[
    col("tackles", &["Tkl", "Tackles"], FieldKind::Int),
    col("tackles_won", &["TklW"], FieldKind::Int),
    col("interceptions", &["Int", "Interceptions"], FieldKind::Int),
    col("blocks", &["Blocks"], FieldKind::Int),
    col("clearances", &["Clr", "Clearances"], FieldKind::Int),
];

const TEAM_POSSESSION: &[FieldSpec] = &[
    col("possession_pct", &["Poss", "Possession"], FieldKind::Float),
    extra("touches", &["Touches"], FieldKind::Int),
    extra("progressive_carries", &["PrgC"], FieldKind::Int),
];

const TEAM_MISC: &[FieldSpec] = &[
    col("fouls_committed", &["Fls", "Fouls"], FieldKind::Int),
    col("fouls_drawn", &["Fld", "Fouls Drawn"], FieldKind::Int),
    extra("offsides", &["Off", "Offsides"], FieldKind::Int),
    extra("penalty_kicks", &["PKwon"], FieldKind::Int),
];

/// Team field table for a category. Categories without team coverage
/// resolve to an empty set (all columns overflow).
pub fn team_fields(category: StatCategory) -> &'static [FieldSpec] {
    match category {
        StatCategory::Standard => TEAM_STANDARD,
        StatCategory::Shooting => TEAM_SHOOTING,
        StatCategory::Passing => TEAM_PASSING,
        StatCategory::PassingTypes => TEAM_PASSING_TYPES,
        StatCategory::Defense => TEAM_DEFENSE,
        StatCategory::Possession => TEAM_POSSESSION,
        StatCategory::Misc => TEAM_MISC,
        StatCategory::Goalkeeping => &[],
    }
}

// --- player season stats ---------------------------------------------------

/// Appearance and discipline fields shared by every player category.
pub const PLAYER_COMMON: &[FieldSpec] = &[
    col("matches_played", &["games", "MP", "Matches"], FieldKind::Int),
    col("starts", &["games_starts", "Starts"], FieldKind::Int),
    col("minutes_played", &["minutes", "Min", "Minutes"], FieldKind::Int),
    col("fouls_committed", &["fouls", "Fls"], FieldKind::Int),
    col("fouls_drawn", &["fouled", "Fld"], FieldKind::Int),
];

const PLAYER_STANDARD: &[FieldSpec] = &[
    col("goals", &["goals", "Gls", "Goals"], FieldKind::Int),
    col("assists", &["assists", "Ast", "Assists"], FieldKind::Int),
    col("penalty_goals", &["pens_made", "PK"], FieldKind::Int),
    col("penalty_attempts", &["pens_att", "PKatt"], FieldKind::Int),
    col("yellow_cards", &["cards_yellow", "CrdY"], FieldKind::Int),
    col("red_cards", &["cards_red", "CrdR"], FieldKind::Int),
    extra("expected_goals", &["xg", "xG"], FieldKind::Float),
    extra("expected_assists", &["xg_assist", "xAG"], FieldKind::Float),
];

const PLAYER_SHOOTING: &[FieldSpec] = &[
    col("shots", &["shots", "Sh"], FieldKind::Int),
    col("shots_on_target", &["shots_on_target", "SoT"], FieldKind::Int),
    col(
        "shots_on_target_pct",
        &["shots_on_target_pct", "SoT%"],
        FieldKind::Float,
    ),
    col("goals_per_shot", &["goals_per_shot", "G/Sh"], FieldKind::Float),
    extra("shots_per_90", &["shots_per90"], FieldKind::Float),
];

const PLAYER_PASSING: &[FieldSpec] = &[
    col("passes_completed", &["passes_completed", "Cmp"], FieldKind::Int),
    col("passes_attempted", &["passes", "Att"], FieldKind::Int),
    col("pass_completion_pct", &["passes_pct", "Cmp%"], FieldKind::Float),
    col("key_passes", &["assisted_shots", "KP"], FieldKind::Int),
    extra("progressive_passes", &["progressive_passes"], FieldKind::Int),
];

const PLAYER_DEFENSE: &[FieldSpec] = &[
    col("tackles", &["tackles", "Tkl"], FieldKind::Int),
    col("tackles_won", &["tackles_won", "TklW"], FieldKind::Int),
    col("interceptions", &["interceptions", "Int"], FieldKind::Int),
    col("blocks", &["blocks", "Blocks"], FieldKind::Int),
    col("clearances", &["clearances", "Clr"], FieldKind::Int),
];

const PLAYER_POSSESSION: &[FieldSpec] = &[
    extra("touches", &["touches", "Touches"], FieldKind::Int),
    extra("progressive_carries", &["progressive_carries"], FieldKind::Int),
    extra("dribbles_completed", &["take_ons_won"], FieldKind::Int),
];

const PLAYER_GOALKEEPING: &[FieldSpec] = &[
    col("saves", &["gk_saves", "Saves"], FieldKind::Int),
    col("saves_pct", &["gk_save_pct", "Save%"], FieldKind::Float),
    col("clean_sheets", &["gk_clean_sheets", "CS"], FieldKind::Int),
    col("goals_against", &["gk_goals_against", "GA"], FieldKind::Int),
    extra("penalty_saves", &["gk_pens_save"], FieldKind::Int),
];

/// Category-specific player field table, excluding [`PLAYER_COMMON`].
pub fn player_fields(category: StatCategory) -> &'static [FieldSpec] {
    match category {
        StatCategory::Standard => PLAYER_STANDARD,
        StatCategory::Shooting => PLAYER_SHOOTING,
        StatCategory::Passing => PLAYER_PASSING,
        StatCategory::Defense => PLAYER_DEFENSE,
        StatCategory::Possession => PLAYER_POSSESSION,
        StatCategory::Goalkeeping => PLAYER_GOALKEEPING,
        StatCategory::PassingTypes | StatCategory::Misc => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn category_labels_round_trip() {
        for cat in StatCategory::TEAM.iter().chain(StatCategory::PLAYER) {
            let parsed: StatCategory = cat.as_str().parse().unwrap();
            assert_eq!(parsed, *cat);
        }
        assert!("powerplay".parse::<StatCategory>().is_err());
    }

    #[test]
    fn player_defaults_exclude_goalkeeping() {
        let defaults = StatCategory::player_defaults();
        assert!(!defaults.contains(&StatCategory::Goalkeeping));
        assert_eq!(defaults.len(), StatCategory::PLAYER.len() - 1);
    }

    #[test]
    fn promoted_column_sets_are_disjoint_across_team_categories() {
        // A record for one category must never populate another category's
        // columns, so no column name may appear in two tables.
        let mut seen: HashSet<&str> = HashSet::new();
        for cat in StatCategory::TEAM {
            for spec in team_fields(*cat) {
                if spec.slot == Slot::Column {
                    assert!(
                        seen.insert(spec.canonical),
                        "duplicate team column {}",
                        spec.canonical
                    );
                }
            }
        }
    }

    #[test]
    fn player_category_columns_do_not_shadow_common_fields() {
        let common: HashSet<&str> = PLAYER_COMMON.iter().map(|s| s.canonical).collect();
        for cat in StatCategory::PLAYER {
            for spec in player_fields(*cat) {
                assert!(
                    !common.contains(spec.canonical),
                    "{} shadows a common field",
                    spec.canonical
                );
            }
        }
    }
}

//! Read-only queries over the static player table.

use std::collections::BTreeSet;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::dto::player_dto::{
    Pagination, Player, PlayerEnums, PlayerPage, PlayerQuery, PreferredFootOption, SearchQuery,
};
use crate::error::DraftError;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;
const DEFAULT_SORT: &str = "overall_rating";

const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "overall_rating",
    "first_name",
    "last_name",
    "common_name",
    "skill_moves",
    "weak_foot",
    "preferred_foot",
    "league_name",
    "nationality_label",
    "team_label",
    "position_short_label",
];

const PLAYER_COLUMNS: &str = r#"
    id, overall_rating, first_name, last_name, common_name, skill_moves, weak_foot,
    preferred_foot, league_name, avatar_url, shield_url, alternate_positions,
    player_abilities_labels, nationality_label, nationality_image_url, team_label,
    team_image_url, position_short_label
"#;

/// Page number (1-based) and page size after clamping.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.filter(|&p| p >= 1).unwrap_or(1);
    let limit = limit
        .filter(|&l| (1..=MAX_LIMIT).contains(&l))
        .unwrap_or(DEFAULT_LIMIT);
    (page, limit)
}

/// `ORDER BY` clause from whitelisted user input.
pub fn order_clause(sort_by: Option<&str>, direction: Option<&str>) -> String {
    let column = sort_by
        .filter(|c| SORTABLE_COLUMNS.contains(c))
        .unwrap_or(DEFAULT_SORT);
    let direction = match direction.map(str::to_ascii_lowercase).as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    format!(" ORDER BY {column} {direction}, id ASC")
}

fn like(value: &str) -> String {
    format!("%{}%", value.trim())
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_name_match(qb: &mut QueryBuilder<'_, Sqlite>, pattern: &str) {
    qb.push(" AND (COALESCE(first_name, '') LIKE ")
        .push_bind(pattern.to_string())
        .push(" OR COALESCE(last_name, '') LIKE ")
        .push_bind(pattern.to_string())
        .push(" OR COALESCE(common_name, '') LIKE ")
        .push_bind(pattern.to_string())
        .push(" OR COALESCE(first_name, '') || ' ' || COALESCE(last_name, '') LIKE ")
        .push_bind(pattern.to_string())
        .push(" OR COALESCE(common_name, '') || ' ' || COALESCE(last_name, '') LIKE ")
        .push_bind(pattern.to_string())
        .push(")");
}

/// Inclusive bounds for a numeric column filter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl NumberRange {
    /// Parses comma separated `gte:N`, `lte:N`, `gt:N`, `lt:N` or bare `N`.
    /// Unparseable parts are skipped.
    pub fn parse(value: &str) -> Self {
        let bound = |s: &str| s.trim().parse::<i64>().ok();
        let mut range = Self::default();
        for part in value.split(',').map(str::trim) {
            if let Some(rest) = part.strip_prefix("gte:") {
                range.min = bound(rest).or(range.min);
            } else if let Some(rest) = part.strip_prefix("lte:") {
                range.max = bound(rest).or(range.max);
            } else if let Some(rest) = part.strip_prefix("gt:") {
                range.min = bound(rest).map(|v| v.saturating_add(1)).or(range.min);
            } else if let Some(rest) = part.strip_prefix("lt:") {
                range.max = bound(rest).map(|v| v.saturating_sub(1)).or(range.max);
            } else if let Some(v) = bound(part) {
                range.min = Some(v);
                range.max = Some(v);
            }
        }
        range
    }

    pub fn exact(&self) -> Option<i64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => Some(min),
            _ => None,
        }
    }
}

fn push_number(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, value: &str) {
    if column == "id" {
        if let Some(ids) = value.trim().strip_prefix("in:") {
            let ids: Vec<i64> = ids.split(',').filter_map(|id| id.trim().parse().ok()).collect();
            push_any_of(qb, "id", ids);
            return;
        }
    }
    let range = NumberRange::parse(value);
    if let Some(exact) = range.exact() {
        qb.push(format!(" AND {column} = ")).push_bind(exact);
        return;
    }
    if let Some(min) = range.min {
        qb.push(format!(" AND {column} >= ")).push_bind(min);
    }
    if let Some(max) = range.max {
        qb.push(format!(" AND {column} <= ")).push_bind(max);
    }
}

fn flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

fn push_any_of<'a, T>(qb: &mut QueryBuilder<'a, Sqlite>, column: &str, values: Vec<T>)
where
    T: 'a + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
{
    if values.is_empty() {
        return;
    }
    qb.push(format!(" AND {column} IN ("));
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &PlayerQuery) {
    qb.push(" WHERE 1 = 1");

    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        push_name_match(qb, &like(name));
    }

    if let Some(position) = query.position.as_deref() {
        let positions = list(position);
        if !positions.is_empty() {
            qb.push(" AND (");
            for (i, position) in positions.into_iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("position_short_label = ")
                    .push_bind(position.clone())
                    .push(" OR alternate_positions LIKE ")
                    .push_bind(format!("%{position}%"));
            }
            qb.push(")");
        }
    }

    if let Some(team) = query.team.as_deref() {
        push_any_of(qb, "team_label", list(team));
    }
    if let Some(league) = query.league.as_deref() {
        push_any_of(qb, "league_name", list(league));
    }
    if let Some(nationality) = query.nationality.as_deref() {
        push_any_of(qb, "nationality_label", list(nationality));
    }
    if let Some(abilities) = query.player_abilities_labels.as_deref() {
        let abilities = list(abilities);
        if !abilities.is_empty() {
            qb.push(" AND (");
            let mut separated = qb.separated(" OR ");
            for ability in abilities {
                separated.push("player_abilities_labels LIKE ");
                separated.push_bind_unseparated(format!("%{ability}%"));
            }
            separated.push_unseparated(")");
        }
    }

    let numeric = [
        ("id", &query.id),
        ("overall_rating", &query.overall_rating),
        ("skill_moves", &query.skill_moves),
        ("weak_foot", &query.weak_foot),
        ("preferred_foot", &query.preferred_foot),
    ];
    for (column, value) in numeric {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            push_number(qb, column, value);
        }
    }
    if let Some(min) = query.min_rating {
        qb.push(" AND overall_rating >= ").push_bind(min);
    }
    if let Some(max) = query.max_rating {
        qb.push(" AND overall_rating <= ").push_bind(max);
    }
    if flag(query.exclude_gk.as_deref()) {
        qb.push(" AND COALESCE(position_short_label, '') != 'GK'");
    }
    if let Some(code) = query.exclude_drafted_in.as_deref().filter(|c| !c.is_empty()) {
        qb.push(
            " AND id NOT IN (SELECT dp.player_id FROM draft_picks dp \
             JOIN drafts d ON d.id = dp.draft_id WHERE d.code = ",
        )
        .push_bind(code.to_string())
        .push(")");
    }
}

pub async fn list_players(pool: &SqlitePool, query: &PlayerQuery) -> Result<PlayerPage, DraftError> {
    let (page, limit) = page_window(query.page, query.limit);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM players");
    push_filters(&mut count, query);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {PLAYER_COLUMNS} FROM players"));
    push_filters(&mut select, query);
    select.push(order_clause(
        query.sort_by.as_deref(),
        query.sort_direction.as_deref(),
    ));
    select
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);
    let players = select.build_query_as::<Player>().fetch_all(pool).await?;

    Ok(PlayerPage {
        players,
        pagination: Pagination::new(page, limit, total),
    })
}

/// Name search, best rated first.
pub async fn search_players(pool: &SqlitePool, query: &SearchQuery) -> Result<PlayerPage, DraftError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| DraftError::Validation("missing search query parameter 'q'".into()))?;
    let (page, limit) = page_window(query.page, query.limit);
    let pattern = like(q);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM players WHERE 1 = 1");
    push_name_match(&mut count, &pattern);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select =
        QueryBuilder::<Sqlite>::new(format!("SELECT {PLAYER_COLUMNS} FROM players WHERE 1 = 1"));
    push_name_match(&mut select, &pattern);
    select
        .push(" ORDER BY overall_rating DESC, id ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);
    let players = select.build_query_as::<Player>().fetch_all(pool).await?;

    Ok(PlayerPage {
        players,
        pagination: Pagination::new(page, limit, total),
    })
}

async fn distinct(pool: &SqlitePool, column: &str) -> Result<Vec<String>, DraftError> {
    let values = sqlx::query_scalar::<_, String>(&format!(
        "SELECT DISTINCT {column} FROM players WHERE {column} IS NOT NULL AND {column} != '' ORDER BY {column}"
    ))
    .fetch_all(pool)
    .await?;
    Ok(values)
}

/// `plain` labels plus every entry of the pipe-separated lists, sorted and deduplicated.
pub fn merge_labels(plain: Vec<String>, piped: &[String]) -> Vec<String> {
    let mut labels: BTreeSet<String> = plain.into_iter().collect();
    for entry in piped {
        labels.extend(
            entry
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
    }
    labels.into_iter().collect()
}

pub async fn player_enums(pool: &SqlitePool) -> Result<PlayerEnums, DraftError> {
    let main_positions = distinct(pool, "position_short_label").await?;
    let alternates = distinct(pool, "alternate_positions").await?;
    let abilities = distinct(pool, "player_abilities_labels").await?;

    Ok(PlayerEnums {
        nationalities: distinct(pool, "nationality_label").await?,
        leagues: distinct(pool, "league_name").await?,
        clubs: distinct(pool, "team_label").await?,
        positions: merge_labels(main_positions, &alternates),
        player_abilities: merge_labels(Vec::new(), &abilities),
        preferred_foot_options: vec![
            PreferredFootOption {
                value: 1,
                label: "Right".into(),
            },
            PreferredFootOption {
                value: 2,
                label: "Left".into(),
            },
        ],
    })
}

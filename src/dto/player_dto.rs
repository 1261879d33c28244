use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the static player catalog.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    pub overall_rating: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub common_name: Option<String>,
    pub skill_moves: Option<i64>,
    pub weak_foot: Option<i64>,
    pub preferred_foot: Option<i64>,
    pub league_name: Option<String>,
    pub avatar_url: Option<String>,
    pub shield_url: Option<String>,
    pub alternate_positions: Option<String>,
    pub player_abilities_labels: Option<String>,
    pub nationality_label: Option<String>,
    pub nationality_image_url: Option<String>,
    pub team_label: Option<String>,
    pub team_image_url: Option<String>,
    pub position_short_label: Option<String>,
}

/// Display fields embedded in every pick of a draft snapshot.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub common_name: Option<String>,
    pub overall_rating: Option<i64>,
    pub position_short_label: Option<String>,
    pub team_label: Option<String>,
    pub team_image_url: Option<String>,
    pub nationality_label: Option<String>,
    pub nationality_image_url: Option<String>,
    pub avatar_url: Option<String>,
    pub shield_url: Option<String>,
    pub league_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = (total_items + limit - 1) / limit;
        Self {
            page,
            limit,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerPage {
    pub players: Vec<Player>,
    pub pagination: Pagination,
}

/// Catalog filters. Numeric columns take `gte:`, `lte:`, `gt:`, `lt:` bounds
/// or an exact value; `id` also accepts `in:1,2,3`. List filters are comma
/// separated and match any entry.
#[derive(Debug, Deserialize, Default)]
pub struct PlayerQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "position_short_label")]
    pub position: Option<String>,
    #[serde(alias = "team_label")]
    pub team: Option<String>,
    #[serde(alias = "league_name")]
    pub league: Option<String>,
    #[serde(alias = "nationality_label")]
    pub nationality: Option<String>,
    pub player_abilities_labels: Option<String>,
    pub id: Option<String>,
    pub overall_rating: Option<String>,
    pub skill_moves: Option<String>,
    pub weak_foot: Option<String>,
    pub preferred_foot: Option<String>,
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub exclude_gk: Option<String>,
    pub exclude_drafted_in: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PreferredFootOption {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEnums {
    pub nationalities: Vec<String>,
    pub leagues: Vec<String>,
    pub clubs: Vec<String>,
    pub positions: Vec<String>,
    pub player_abilities: Vec<String>,
    pub preferred_foot_options: Vec<PreferredFootOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(1, 20, 41);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_previous);

        let last = Pagination::new(3, 20, 41);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn pagination_with_no_items_has_no_pages() {
        let p = Pagination::new(1, 20, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
    }
}

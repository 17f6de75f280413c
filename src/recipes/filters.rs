use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::dto::RecipeQuery;

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.created_at";

/// Storage predicates for a recipe listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub id: Option<Uuid>,
    /// Any of these slugs qualifies.
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
}

/// `1`/`true` switch a flag on; anything else leaves it off.
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true")
    )
}

impl RecipeFilter {
    /// Flags are ignored for anonymous viewers.
    pub fn from_query(q: &RecipeQuery, viewer: Option<Uuid>) -> Self {
        let mut tags: Vec<String> = q
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Self {
            id: None,
            tags,
            author: q.author,
            favorited_by: viewer.filter(|_| parse_flag(q.is_favorited.as_deref())),
            in_cart_of: viewer.filter(|_| parse_flag(q.is_in_shopping_cart.as_deref())),
        }
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(id) = self.id {
            qb.push(" AND r.id = ").push_bind(id);
        }
        if !self.tags.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(self.tags.clone())
            .push("))");
        }
        if let Some(author) = self.author {
            qb.push(" AND r.author_id = ").push_bind(author);
        }
        if let Some(user) = self.favorited_by {
            qb.push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user)
                .push(")");
        }
        if let Some(user) = self.in_cart_of {
            qb.push(
                " AND EXISTS (SELECT 1 FROM shopping_lists s WHERE s.recipe_id = r.id AND s.user_id = ",
            )
            .push_bind(user)
            .push(")");
        }
    }

    /// Page of recipes, newest first, with the viewer's flags.
    pub fn select(&self, viewer: Option<Uuid>, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {}, ", RECIPE_COLUMNS));
        qb.push("EXISTS (SELECT 1 FROM favorites fv WHERE fv.recipe_id = r.id AND fv.user_id = ")
            .push_bind(viewer)
            .push(") AS is_favorited, ");
        qb.push("EXISTS (SELECT 1 FROM shopping_lists sv WHERE sv.recipe_id = r.id AND sv.user_id = ")
            .push_bind(viewer)
            .push(") AS is_in_shopping_cart FROM recipes r");
        self.push_where(&mut qb);
        qb.push(" ORDER BY r.created_at DESC, r.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        qb
    }

    pub fn count(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        self.push_where(&mut qb);
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of(qb: QueryBuilder<'static, Postgres>) -> String {
        qb.sql().to_string()
    }

    fn query(tags: &[&str], fav: Option<&str>, cart: Option<&str>) -> RecipeQuery {
        RecipeQuery {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_favorited: fav.map(Into::into),
            is_in_shopping_cart: cart.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn flags_parse_like_booleans() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some("True")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("yes please")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn anonymous_flags_pass_through() {
        let f = RecipeFilter::from_query(&query(&[], Some("1"), Some("1")), None);
        assert_eq!(f.favorited_by, None);
        assert_eq!(f.in_cart_of, None);
    }

    #[test]
    fn flags_apply_to_viewer() {
        let me = Uuid::new_v4();
        let f = RecipeFilter::from_query(&query(&[], Some("1"), Some("0")), Some(me));
        assert_eq!(f.favorited_by, Some(me));
        assert_eq!(f.in_cart_of, None);
    }

    #[test]
    fn tag_slugs_are_deduplicated() {
        let f = RecipeFilter::from_query(&query(&["lunch", "breakfast", "lunch", " "], None, None), None);
        assert_eq!(f.tags, vec!["breakfast".to_string(), "lunch".to_string()]);
    }

    #[test]
    fn unfiltered_select_has_no_predicates() {
        let f = RecipeFilter::default();
        let sql = sql_of(f.select(None, 6, 0));
        assert!(sql.contains("FROM recipes r WHERE TRUE ORDER BY r.created_at DESC"));
        assert!(!sql.contains("t.slug"));
        assert!(!sql.contains("r.author_id ="));
    }

    #[test]
    fn tags_use_any_semantics_without_joins_that_duplicate_rows() {
        let f = RecipeFilter::from_query(&query(&["breakfast", "dinner"], None, None), None);
        let sql = sql_of(f.count());
        assert!(sql.starts_with("SELECT COUNT(*) FROM recipes r WHERE TRUE"));
        assert!(sql.contains("EXISTS (SELECT 1 FROM recipe_tags rt"));
        assert!(sql.contains("t.slug = ANY($1)"));
    }

    #[test]
    fn every_filter_adds_a_bound_predicate() {
        let me = Uuid::new_v4();
        let q = RecipeQuery {
            tags: vec!["lunch".into()],
            author: Some(Uuid::new_v4()),
            is_favorited: Some("1".into()),
            is_in_shopping_cart: Some("1".into()),
            ..Default::default()
        };
        let sql = sql_of(RecipeFilter::from_query(&q, Some(me)).count());
        assert!(sql.contains("r.author_id = $2"));
        assert!(sql.contains("FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $3"));
        assert!(sql.contains("FROM shopping_lists s WHERE s.recipe_id = r.id AND s.user_id = $4"));
    }

    #[test]
    fn by_id_selects_single_recipe() {
        let sql = sql_of(RecipeFilter::by_id(Uuid::new_v4()).select(None, 1, 0));
        // $1, $2 are the viewer flags
        assert!(sql.contains("WHERE TRUE AND r.id = $3"));
    }
}

/// PostgreSQL provider over the Sakila schema
///
/// Watch history is the rental relation (rental -> inventory -> film). Every
/// value reaches the database as a bind parameter; list filters use `= ANY($n)`.
use crate::{
    error::AppResult,
    models::{AttributeKind, AttributeValue, FilmRecord, KeywordCandidate},
    services::{providers::CatalogProvider, text::TermWeights},
};
use sqlx::PgPool;
use tracing::instrument;

const FILM_COLUMNS: &str = r#"
    SELECT
        f.film_id,
        f.title::text AS title,
        f.description::text AS description,
        c.name::text AS category,
        TRIM(l.name)::text AS language,
        f.rating::text AS rating,
        COALESCE(
            ARRAY_REMOVE(ARRAY_AGG(DISTINCT a.first_name || ' ' || a.last_name), NULL),
            '{}'
        )::text[] AS actors,
        f.fulltext::text AS fulltext
    FROM film f
    LEFT JOIN film_category fc ON f.film_id = fc.film_id
    LEFT JOIN category c ON fc.category_id = c.category_id
    LEFT JOIN language l ON f.language_id = l.language_id
    LEFT JOIN film_actor fa ON f.film_id = fa.film_id
    LEFT JOIN actor a ON fa.actor_id = a.actor_id
"#;

const FILM_GROUPING: &str = r#"
    GROUP BY f.film_id, c.name, l.name
    ORDER BY f.film_id
"#;

/// Keywords arrive as a `text[]` and are quoted inside SQL before `to_tsquery`
const KEYWORD_AFFINITY_SQL: &str = r#"
    WITH q AS (
        SELECT to_tsquery('english', string_agg(quote_literal(k), ' | ')) AS query
        FROM unnest($1::text[]) AS k
    )
    SELECT f.title::text AS title, f.fulltext::text AS fulltext
    FROM film f, q
    WHERE f.fulltext @@ q.query
      AND NOT (f.title = ANY($2))
    ORDER BY ts_rank(f.fulltext, q.query) DESC, f.title ASC
    LIMIT $3
"#;

fn watched_attribute_sql(kind: AttributeKind) -> &'static str {
    match kind {
        AttributeKind::Genre => {
            r#"
            SELECT DISTINCT c.name::text AS key, c.name::text AS label
            FROM rental r
            JOIN inventory i ON r.inventory_id = i.inventory_id
            JOIN film_category fc ON i.film_id = fc.film_id
            JOIN category c ON fc.category_id = c.category_id
            WHERE r.customer_id = $1
            "#
        }
        AttributeKind::Actor => {
            r#"
            SELECT DISTINCT
                a.actor_id::text AS key,
                (a.first_name || ' ' || a.last_name)::text AS label
            FROM rental r
            JOIN inventory i ON r.inventory_id = i.inventory_id
            JOIN film_actor fa ON i.film_id = fa.film_id
            JOIN actor a ON fa.actor_id = a.actor_id
            WHERE r.customer_id = $1
            "#
        }
        AttributeKind::Language => {
            r#"
            SELECT DISTINCT TRIM(l.name)::text AS key, TRIM(l.name)::text AS label
            FROM rental r
            JOIN inventory i ON r.inventory_id = i.inventory_id
            JOIN film f ON i.film_id = f.film_id
            JOIN language l ON f.language_id = l.language_id
            WHERE r.customer_id = $1
            "#
        }
        AttributeKind::Rating => {
            r#"
            SELECT DISTINCT f.rating::text AS key, f.rating::text AS label
            FROM rental r
            JOIN inventory i ON r.inventory_id = i.inventory_id
            JOIN film f ON i.film_id = f.film_id
            WHERE r.customer_id = $1 AND f.rating IS NOT NULL
            "#
        }
    }
}

fn popular_within_sql(kind: AttributeKind) -> &'static str {
    match kind {
        AttributeKind::Genre => {
            r#"
            SELECT f.title::text
            FROM film f
            JOIN inventory i ON f.film_id = i.film_id
            JOIN rental r ON i.inventory_id = r.inventory_id
            JOIN film_category fc ON f.film_id = fc.film_id
            JOIN category c ON fc.category_id = c.category_id
            WHERE c.name = ANY($1) AND NOT (f.title = ANY($2))
            GROUP BY f.title
            ORDER BY COUNT(r.rental_id) DESC, f.title ASC
            LIMIT $3
            "#
        }
        AttributeKind::Actor => {
            r#"
            SELECT f.title::text
            FROM film f
            JOIN film_actor fa ON f.film_id = fa.film_id
            LEFT JOIN inventory i ON f.film_id = i.film_id
            LEFT JOIN rental r ON i.inventory_id = r.inventory_id
            WHERE fa.actor_id = ANY($1::text[]::int[]) AND NOT (f.title = ANY($2))
            GROUP BY f.title
            ORDER BY COUNT(DISTINCT fa.actor_id) DESC, COUNT(DISTINCT r.rental_id) DESC, f.title ASC
            LIMIT $3
            "#
        }
        AttributeKind::Language => {
            r#"
            SELECT f.title::text
            FROM film f
            JOIN inventory i ON f.film_id = i.film_id
            JOIN rental r ON i.inventory_id = r.inventory_id
            JOIN language l ON f.language_id = l.language_id
            WHERE TRIM(l.name) = ANY($1) AND NOT (f.title = ANY($2))
            GROUP BY f.title
            ORDER BY COUNT(r.rental_id) DESC, f.title ASC
            LIMIT $3
            "#
        }
        AttributeKind::Rating => {
            r#"
            SELECT f.title::text
            FROM film f
            JOIN inventory i ON f.film_id = i.film_id
            JOIN rental r ON i.inventory_id = r.inventory_id
            WHERE f.rating::text = ANY($1) AND NOT (f.title = ANY($2))
            GROUP BY f.title
            ORDER BY COUNT(r.rental_id) DESC, f.title ASC
            LIMIT $3
            "#
        }
    }
}

#[derive(Clone)]
pub struct PgCatalogProvider {
    pool: PgPool,
}

impl PgCatalogProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for PgCatalogProvider {
    #[instrument(skip(self), fields(provider = "postgres"))]
    async fn all_catalog_items(&self) -> AppResult<Vec<FilmRecord>> {
        let sql = format!("{}{}", FILM_COLUMNS, FILM_GROUPING);
        let films = sqlx::query_as::<_, FilmRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(films = films.len(), "Loaded catalog");
        Ok(films)
    }

    #[instrument(skip(self), fields(provider = "postgres"))]
    async fn watched_items(&self, user_id: i32) -> AppResult<Vec<FilmRecord>> {
        let sql = format!(
            "{}{}{}",
            FILM_COLUMNS,
            r#"
            WHERE f.film_id IN (
                SELECT i.film_id
                FROM rental r
                JOIN inventory i ON r.inventory_id = i.inventory_id
                WHERE r.customer_id = $1
            )
            "#,
            FILM_GROUPING
        );
        let films = sqlx::query_as::<_, FilmRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(films)
    }

    #[instrument(skip(self), fields(provider = "postgres"))]
    async fn watched_titles(&self, user_id: i32) -> AppResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT f.title::text
            FROM film f
            JOIN inventory i ON f.film_id = i.film_id
            JOIN rental r ON i.inventory_id = r.inventory_id
            WHERE r.customer_id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    #[instrument(skip(self), fields(provider = "postgres"))]
    async fn watched_attribute(
        &self,
        user_id: i32,
        kind: AttributeKind,
    ) -> AppResult<Vec<AttributeValue>> {
        let values = sqlx::query_as::<_, AttributeValue>(watched_attribute_sql(kind))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }

    #[instrument(skip(self, values, exclude_titles), fields(provider = "postgres"))]
    async fn popular_within(
        &self,
        kind: AttributeKind,
        values: &[AttributeValue],
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let keys: Vec<&str> = values.iter().map(|v| v.key.as_str()).collect();
        let titles = sqlx::query_scalar::<_, String>(popular_within_sql(kind))
            .bind(keys)
            .bind(exclude_titles)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(kind = %kind, values = values.len(), found = titles.len(), "Popular within attribute");
        Ok(titles)
    }

    #[instrument(skip(self, exclude_titles), fields(provider = "postgres"))]
    async fn popular_overall(
        &self,
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT f.title::text
            FROM film f
            JOIN inventory i ON f.film_id = i.film_id
            JOIN rental r ON i.inventory_id = r.inventory_id
            WHERE NOT (f.title = ANY($1))
            GROUP BY f.title
            ORDER BY COUNT(r.rental_id) DESC, f.title ASC
            LIMIT $2
            "#,
        )
        .bind(exclude_titles)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    #[instrument(skip(self), fields(provider = "postgres"))]
    async fn fulltext_of_watched(&self, user_id: i32) -> AppResult<Vec<String>> {
        let entries = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT f.fulltext::text
            FROM film f
            JOIN inventory i ON f.film_id = i.film_id
            JOIN rental r ON i.inventory_id = r.inventory_id
            WHERE r.customer_id = $1 AND f.fulltext IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    #[instrument(skip(self, preferences, exclude_titles), fields(provider = "postgres"))]
    async fn candidates_by_keyword_affinity(
        &self,
        preferences: &TermWeights,
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<KeywordCandidate>> {
        if preferences.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = sqlx::query_as::<_, KeywordCandidate>(KEYWORD_AFFINITY_SQL)
            .bind(preferences.keywords())
            .bind(exclude_titles)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [AttributeKind; 4] = [
        AttributeKind::Genre,
        AttributeKind::Actor,
        AttributeKind::Language,
        AttributeKind::Rating,
    ];

    #[test]
    fn test_history_queries_are_scoped_to_customer() {
        for kind in KINDS {
            assert!(watched_attribute_sql(kind).contains("r.customer_id = $1"));
        }
    }

    #[test]
    fn test_popularity_queries_bind_every_input() {
        for kind in KINDS {
            let sql = popular_within_sql(kind);
            assert!(sql.contains("= ANY($1)"), "{} misses value filter", kind);
            assert!(sql.contains("NOT (f.title = ANY($2))"), "{} misses exclusion", kind);
            assert!(sql.contains("LIMIT $3"), "{} misses limit", kind);
        }
    }

    #[test]
    fn test_rentals_join_on_inventory_id() {
        for kind in KINDS {
            assert!(!popular_within_sql(kind).contains("r.rental_id ="));
        }
        assert!(KEYWORD_AFFINITY_SQL.contains("quote_literal(k)"));
    }

    #[test]
    fn test_actor_affinity_matches_on_actor_id() {
        let watched = watched_attribute_sql(AttributeKind::Actor);
        assert!(watched.contains("a.actor_id::text AS key"));
        assert!(watched.contains("AS label"));

        let popular = popular_within_sql(AttributeKind::Actor);
        assert!(popular.contains("fa.actor_id = ANY($1::text[]::int[])"));
        assert!(!popular.contains("first_name"));
    }

    #[test]
    fn test_watched_attributes_select_key_and_label() {
        for kind in KINDS {
            let sql = watched_attribute_sql(kind);
            assert!(sql.contains(" AS key"), "{} misses key", kind);
            assert!(sql.contains(" AS label"), "{} misses label", kind);
        }
    }
}

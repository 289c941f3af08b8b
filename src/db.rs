use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::data::CatalogRow;

/// Open the shared read-only pool. The schema is owned elsewhere, so a missing
/// database file is an error instead of being created.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url {url}"))?
        .create_if_missing(false)
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("fail to open database {url}"))?;
    Ok(pool)
}

/// Every read the API can issue. Values are kept as the text the client sent
/// and bound as-is; column affinity takes care of comparing them to numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    Restaurants,
    RestaurantById(String),
    RestaurantsByCuisine(String),
    RestaurantsFiltered {
        is_veg: Option<String>,
        has_outdoor_seating: Option<String>,
        is_luxury: Option<String>,
    },
    RestaurantsByRating,
    Dishes,
    DishById(String),
    DishesFiltered {
        is_veg: Option<String>,
    },
    DishesByPrice,
}

impl CatalogQuery {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Restaurants => "SELECT * FROM restaurants",
            Self::RestaurantById(_) => "SELECT * FROM restaurants WHERE id = ?",
            Self::RestaurantsByCuisine(_) => "SELECT * FROM restaurants WHERE cuisine = ?",
            Self::RestaurantsFiltered { .. } => {
                r#"
SELECT * FROM restaurants
WHERE isVeg = ?
    AND hasOutdoorSeating = ?
    AND isLuxury = ?"#
            }
            Self::RestaurantsByRating => "SELECT * FROM restaurants ORDER BY rating DESC",
            Self::Dishes => "SELECT * FROM dishes",
            Self::DishById(_) => "SELECT * FROM dishes WHERE id = ?",
            Self::DishesFiltered { .. } => "SELECT * FROM dishes WHERE isVeg = ?",
            Self::DishesByPrice => "SELECT * FROM dishes ORDER BY price",
        }
    }

    /// Positional values for the `?` placeholders of [`Self::sql`], in order.
    /// `None` binds SQL NULL, which never compares equal.
    pub fn bindings(&self) -> Vec<Option<&str>> {
        match self {
            Self::RestaurantById(id) | Self::DishById(id) => vec![Some(id.as_str())],
            Self::RestaurantsByCuisine(cuisine) => vec![Some(cuisine.as_str())],
            Self::RestaurantsFiltered {
                is_veg,
                has_outdoor_seating,
                is_luxury,
            } => vec![
                is_veg.as_deref(),
                has_outdoor_seating.as_deref(),
                is_luxury.as_deref(),
            ],
            Self::DishesFiltered { is_veg } => vec![is_veg.as_deref()],
            Self::Restaurants
            | Self::RestaurantsByRating
            | Self::Dishes
            | Self::DishesByPrice => Vec::new(),
        }
    }

    /// JSON key the matched rows are wrapped under.
    pub fn envelope(&self) -> &'static str {
        match self {
            Self::RestaurantById(_) => "restaurant",
            Self::DishById(_) => "dish",
            Self::Restaurants
            | Self::RestaurantsByCuisine(_)
            | Self::RestaurantsFiltered { .. }
            | Self::RestaurantsByRating => "restaurants",
            Self::Dishes | Self::DishesFiltered { .. } | Self::DishesByPrice => "dishes",
        }
    }

    pub fn not_found_message(&self) -> String {
        match self {
            Self::Restaurants | Self::RestaurantsByRating => "No restaurants found".to_string(),
            Self::RestaurantById(id) => format!("No restaurants with id={id} found"),
            Self::RestaurantsByCuisine(cuisine) => {
                format!("No restaurants with cuisine={cuisine} found")
            }
            Self::RestaurantsFiltered { .. } => {
                "No restaurants with the chosen filters found".to_string()
            }
            Self::Dishes | Self::DishesByPrice => "No dishes found".to_string(),
            Self::DishById(id) => format!("No dish with id={id} found"),
            Self::DishesFiltered { .. } => "No dishes with chosen filters found".to_string(),
        }
    }
}

pub async fn fetch_catalog(
    db_conn: &SqlitePool,
    query: &CatalogQuery,
) -> anyhow::Result<Vec<CatalogRow>> {
    let mut statement = sqlx::query(query.sql());
    for value in query.bindings() {
        statement = statement.bind(value);
    }

    let rows = statement
        .fetch_all(db_conn)
        .await
        .with_context(|| format!("fail to run {query:?}"))?;

    rows.iter()
        .map(CatalogRow::try_from)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("fail to decode rows of {query:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded_pool() -> SqlitePool {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in include_str!("../tests/fixtures/catalog.sql").split(';') {
            if !statement.trim().is_empty() {
                sqlx::query(statement).execute(&db).await.unwrap();
            }
        }
        db
    }

    fn ids(rows: &[CatalogRow]) -> Vec<i64> {
        rows.iter()
            .map(|row| row.get("id").and_then(|id| id.as_i64()).unwrap())
            .collect()
    }

    #[test]
    fn test_placeholders_match_bindings() {
        let queries = [
            CatalogQuery::Restaurants,
            CatalogQuery::RestaurantById("1".into()),
            CatalogQuery::RestaurantsByCuisine("Indian".into()),
            CatalogQuery::RestaurantsFiltered {
                is_veg: Some("1".into()),
                has_outdoor_seating: None,
                is_luxury: Some("0".into()),
            },
            CatalogQuery::RestaurantsByRating,
            CatalogQuery::Dishes,
            CatalogQuery::DishById("2".into()),
            CatalogQuery::DishesFiltered { is_veg: None },
            CatalogQuery::DishesByPrice,
        ];

        for query in queries {
            assert_eq!(
                query.sql().matches('?').count(),
                query.bindings().len(),
                "{query:?}"
            );
        }
    }

    #[test]
    fn test_not_found_message_interpolates_input() {
        assert_eq!(
            CatalogQuery::RestaurantById("1".into()).not_found_message(),
            "No restaurants with id=1 found"
        );
        assert_eq!(
            CatalogQuery::RestaurantsByCuisine("Thai".into()).not_found_message(),
            "No restaurants with cuisine=Thai found"
        );
        assert_eq!(
            CatalogQuery::DishById("9".into()).not_found_message(),
            "No dish with id=9 found"
        );
    }

    #[tokio::test]
    async fn test_fetch_all_restaurants() {
        let db = seeded_pool().await;

        let rows = fetch_catalog(&db, &CatalogQuery::Restaurants).await.unwrap();
        assert_eq!(rows.len(), 4);

        let first = rows.iter().find(|row| row.get("id") == Some(&json!(1))).unwrap();
        assert_eq!(first.get("name"), Some(&json!("Spice Kitchen")));
        assert_eq!(first.get("rating"), Some(&json!(4.5)));
        assert_eq!(first.get("hasOutdoorSeating"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_sort_orders() {
        let db = seeded_pool().await;

        let by_rating = fetch_catalog(&db, &CatalogQuery::RestaurantsByRating)
            .await
            .unwrap();
        assert_eq!(ids(&by_rating), vec![4, 1, 3, 2]);

        let by_price = fetch_catalog(&db, &CatalogQuery::DishesByPrice).await.unwrap();
        assert_eq!(ids(&by_price), vec![3, 1, 2, 4]);
    }

    #[tokio::test]
    async fn test_text_binding_matches_integer_column() {
        let db = seeded_pool().await;

        let veg = fetch_catalog(
            &db,
            &CatalogQuery::DishesFiltered {
                is_veg: Some("1".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(ids(&veg), vec![1, 3]);

        let detail = fetch_catalog(&db, &CatalogQuery::RestaurantById("2".into()))
            .await
            .unwrap();
        assert_eq!(ids(&detail), vec![2]);
    }

    #[tokio::test]
    async fn test_missing_filter_matches_nothing() {
        let db = seeded_pool().await;

        let rows = fetch_catalog(
            &db,
            &CatalogQuery::RestaurantsFiltered {
                is_veg: Some("1".into()),
                has_outdoor_seating: Some("1".into()),
                is_luxury: None,
            },
        )
        .await
        .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_injection_is_bound_literally() {
        let db = seeded_pool().await;

        let rows = fetch_catalog(
            &db,
            &CatalogQuery::RestaurantsByCuisine("' OR '1'='1".into()),
        )
        .await
        .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_table_is_an_error() {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        assert!(fetch_catalog(&db, &CatalogQuery::Dishes).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_does_not_create_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("catalog.sqlite");

        let url = format!("sqlite:{}", path.display());
        assert!(connect(&url, 1).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_connect_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("catalog.sqlite").display());

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::from_str(&url)
                    .unwrap()
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        sqlx::query("CREATE TABLE dishes (id INTEGER PRIMARY KEY, price REAL NOT NULL, isVeg INTEGER NOT NULL)")
            .execute(&writer)
            .await
            .unwrap();
        sqlx::query("INSERT INTO dishes (id, price, isVeg) VALUES (1, 250, 1)")
            .execute(&writer)
            .await
            .unwrap();
        writer.close().await;

        let db = connect(&url, 1).await.unwrap();
        let rows = fetch_catalog(&db, &CatalogQuery::Dishes).await.unwrap();
        assert_eq!(ids(&rows), vec![1]);

        let insert = sqlx::query("INSERT INTO dishes (id, price, isVeg) VALUES (2, 100, 0)")
            .execute(&db)
            .await;
        assert!(insert.is_err());
    }
}

use std::collections::HashMap;

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use sqlx::SqlitePool;

use crate::db::{self as db_api, CatalogQuery};

pub struct ApiState {
    db_pool: SqlitePool,
}

impl ApiState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

#[derive(serde::Serialize)]
struct ErrJsonResp {
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The query ran fine but matched nothing.
    #[error("{0}")]
    NotFound(String),
    /// Details stay in the server log.
    #[error("Some error occurred")]
    Internal {
        route: &'static str,
        error: anyhow::Error,
    },
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Internal { route, error } = self {
            tracing::error!("GET {route} - ERROR - {error:#}");
        }
        HttpResponse::build(self.status_code()).json(ErrJsonResp {
            message: self.to_string(),
        })
    }
}

/// Path and query parameters of one request.
pub struct RouteParams<'a> {
    req: &'a HttpRequest,
    query: HashMap<String, String>,
}

impl<'a> RouteParams<'a> {
    fn new(req: &'a HttpRequest) -> Self {
        // a query string that does not parse carries no filters
        let query = web::Query::<HashMap<String, String>>::from_query(req.query_string())
            .map(web::Query::into_inner)
            .unwrap_or_default();
        Self { req, query }
    }

    fn path(&self, name: &str) -> String {
        self.req.match_info().get(name).unwrap_or_default().to_owned()
    }

    fn query(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }
}

pub struct CatalogRoute {
    pub path: &'static str,
    query: fn(&RouteParams<'_>) -> CatalogQuery,
}

static ROUTES: [CatalogRoute; 9] = [
    CatalogRoute {
        path: "/restaurants",
        query: |_| CatalogQuery::Restaurants,
    },
    CatalogRoute {
        path: "/restaurants/details/{id}",
        query: |params| CatalogQuery::RestaurantById(params.path("id")),
    },
    CatalogRoute {
        path: "/restaurants/cuisine/{cuisine}",
        query: |params| CatalogQuery::RestaurantsByCuisine(params.path("cuisine")),
    },
    CatalogRoute {
        path: "/restaurants/filter",
        query: |params| CatalogQuery::RestaurantsFiltered {
            is_veg: params.query("isVeg"),
            has_outdoor_seating: params.query("hasOutdoorSeating"),
            is_luxury: params.query("isLuxury"),
        },
    },
    CatalogRoute {
        path: "/restaurants/sort-by-rating",
        query: |_| CatalogQuery::RestaurantsByRating,
    },
    CatalogRoute {
        path: "/dishes",
        query: |_| CatalogQuery::Dishes,
    },
    CatalogRoute {
        path: "/dishes/details/{id}",
        query: |params| CatalogQuery::DishById(params.path("id")),
    },
    CatalogRoute {
        path: "/dishes/filter",
        query: |params| CatalogQuery::DishesFiltered {
            is_veg: params.query("isVeg"),
        },
    },
    // isVeg is accepted here for compatibility but never filters
    CatalogRoute {
        path: "/dishes/sort-by-price",
        query: |_| CatalogQuery::DishesByPrice,
    },
];

pub fn routes() -> &'static [CatalogRoute] {
    &ROUTES
}

/// Mount every catalog route as a GET handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    for route in routes() {
        cfg.route(
            route.path,
            web::get().to(move |data: web::Data<ApiState>, req: HttpRequest| async move {
                serve(route, &data, &req).await
            }),
        );
    }
}

async fn serve(
    route: &CatalogRoute,
    data: &ApiState,
    req: &HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let query = (route.query)(&RouteParams::new(req));

    let rows = db_api::fetch_catalog(&data.db_pool, &query)
        .await
        .map_err(|error| ApiError::Internal {
            route: route.path,
            error,
        })?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(query.not_found_message()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ query.envelope(): rows })))
}

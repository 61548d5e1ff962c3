use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use triplicity_booking::BookingError;
use triplicity_catalog::{Category, Package};

use crate::bookings::BookingView;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::auth::{customer_auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PackageFilter {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PackageView {
    #[serde(flatten)]
    pub package: Package,
    pub inclusions: Vec<String>,
}

impl From<Package> for PackageView {
    fn from(package: Package) -> Self {
        let inclusions = package.inclusions();
        Self {
            package,
            inclusions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub person_count: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingCheckout {
    pub booking: BookingView,
    pub client_secret: String,
    pub publishable_key: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/categories", get(list_categories))
        .route("/v1/packages", get(list_packages))
        .route("/v1/packages/{slug}", get(get_package));

    let protected = Router::new()
        .route("/v1/packages/{slug}/bookings", post(create_booking))
        .route_layer(from_fn_with_state(state, customer_auth_middleware));

    public.merge(protected)
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// GET /v1/packages?category=<slug>
async fn list_packages(
    State(state): State<AppState>,
    Query(filter): Query<PackageFilter>,
) -> Result<Json<Vec<PackageView>>, AppError> {
    let category = filter.category.as_deref().filter(|slug| !slug.is_empty());
    let packages = state.catalog.list_packages(category).await?;
    Ok(Json(packages.into_iter().map(PackageView::from).collect()))
}

async fn get_package(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PackageView>, AppError> {
    Ok(Json(state.catalog.get_package(&slug).await?.into()))
}

/// POST /v1/packages/{slug}/bookings
/// Creates a pending booking and returns the client secret for the payment form
async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCheckout>), AppError> {
    let user_id = claims.user_id()?;

    match state.bookings.initiate(user_id, &slug, req.person_count).await {
        Ok(initiated) => {
            state.metrics.bookings_initiated.inc();
            Ok((
                StatusCode::CREATED,
                Json(BookingCheckout {
                    booking: initiated.booking.into(),
                    client_secret: initiated.client_secret,
                    publishable_key: state.payment.publishable_key.clone(),
                }),
            ))
        }
        Err(err @ BookingError::ExternalService(_)) => {
            // The booking row exists and is left for reconciliation
            state.metrics.bookings_initiated.inc();
            state.metrics.intent_creation_failures.inc();
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

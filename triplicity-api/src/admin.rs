use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{post, put},
    Extension, Json, Router,
};
use triplicity_catalog::{Category, CategoryDraft, PackageDraft, PackageUpdate};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::auth::{admin_auth_middleware, Claims};
use crate::packages::PackageView;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/categories", post(create_category))
        .route("/v1/admin/packages", post(create_package))
        .route("/v1/admin/packages/{slug}", put(update_package))
        .route_layer(from_fn_with_state(state, admin_auth_middleware))
}

async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = state.catalog.create_category(draft).await?;
    tracing::info!("Admin {} created category {}", claims.sub, category.slug);
    Ok((StatusCode::CREATED, Json(category)))
}

async fn create_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(draft): ApiJson<PackageDraft>,
) -> Result<(StatusCode, Json<PackageView>), AppError> {
    let package = state.catalog.create_package(draft).await?;
    tracing::info!("Admin {} created package {}", claims.sub, package.slug);
    Ok((StatusCode::CREATED, Json(package.into())))
}

/// PUT /v1/admin/packages/{slug}
/// Bookings already made keep the total they were created with
async fn update_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    ApiJson(update): ApiJson<PackageUpdate>,
) -> Result<Json<PackageView>, AppError> {
    let package = state.catalog.update_package(&slug, update).await?;
    tracing::info!("Admin {} updated package {}", claims.sub, package.slug);
    Ok(Json(package.into()))
}

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use triplicity_accounts::{ProfileUpdate, Registration, User};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::auth::{customer_auth_middleware, Claims};
use crate::state::{AppState, AuthConfig};

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    first_name: String,
    last_name: String,
    password: String,
    password_confirm: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
            password_confirm: req.password_confirm,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    code: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    role: &'static str,
    user: User,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/accounts/register", post(register))
        .route("/v1/accounts/login", post(login));

    let protected = Router::new()
        .route("/v1/accounts/me", get(me).patch(update_me))
        .route("/v1/accounts/verification", post(request_verification))
        .route("/v1/accounts/verification/confirm", post(confirm_verification))
        .route_layer(from_fn_with_state(state, customer_auth_middleware));

    public.merge(protected)
}

pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<(String, &'static str), AppError> {
    let role = auth.role_for(&user.email);
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: role.to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.expose().as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok((token, role))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = state.accounts.register(req.into()).await?;
    let (token, role) = issue_token(&state.auth, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, role, user })))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.accounts.authenticate(&req.email, &req.password).await?;
    let (token, role) = issue_token(&state.auth, &user)?;
    tracing::info!("User {} logged in as {}", user.id, role);
    Ok(Json(AuthResponse { token, role, user }))
}

async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, AppError> {
    let user = state.accounts.get_user(claims.user_id()?).await?;
    Ok(Json(user))
}

async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    let user = state.accounts.update_profile(claims.user_id()?, update).await?;
    Ok(Json(user))
}

async fn request_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    state.accounts.request_verification(claims.user_id()?).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "sent" }))))
}

async fn confirm_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ConfirmRequest>,
) -> Result<Json<User>, AppError> {
    let user = state.accounts.verify_email(claims.user_id()?, &req.code).await?;
    Ok(Json(user))
}

//! HTTP handlers for the auth service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use axum_helpers::{bearer_auth_middleware, JwtAuth, JwtClaims, ValidatedJson};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::UserError;
use crate::models::{
    AuthTokens, ForgotPassword, LoginUser, RefreshRequest, RegisterUser, ResetPassword,
    UserProfile,
};
use crate::service::UserService;

#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<UserService>,
}

/// Build the auth service router.
///
/// Token issuance and the reset flow are public; logout and the user
/// queries require a valid bearer token.
pub fn router(service: Arc<UserService>, jwt: JwtAuth) -> Router {
    let state = AuthState { service };

    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password));

    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .layer(middleware::from_fn_with_state(jwt, bearer_auth_middleware));

    public.merge(protected).with_state(state)
}

#[utoipa::path(post, path = "/auth/register", request_body = RegisterUser,
    responses((status = 201, body = AuthTokens), (status = 409)))]
async fn register(
    State(state): State<AuthState>,
    ValidatedJson(input): ValidatedJson<RegisterUser>,
) -> Result<(StatusCode, Json<AuthTokens>), UserError> {
    let tokens = state.service.register(input).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

#[utoipa::path(post, path = "/auth/login", request_body = LoginUser,
    responses((status = 200, body = AuthTokens), (status = 403)))]
async fn login(
    State(state): State<AuthState>,
    ValidatedJson(input): ValidatedJson<LoginUser>,
) -> Result<Json<AuthTokens>, UserError> {
    let tokens = state.service.login(input).await?;
    Ok(Json(tokens))
}

#[utoipa::path(post, path = "/auth/refresh", request_body = RefreshRequest,
    responses((status = 200, body = AuthTokens), (status = 403)))]
async fn refresh(
    State(state): State<AuthState>,
    ValidatedJson(input): ValidatedJson<RefreshRequest>,
) -> Result<Json<AuthTokens>, UserError> {
    let tokens = state.service.refresh(input).await?;
    Ok(Json(tokens))
}

#[utoipa::path(post, path = "/auth/logout", responses((status = 204)))]
async fn logout(
    State(state): State<AuthState>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<StatusCode, UserError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| UserError::Validation("Invalid user id in token".to_string()))?;
    state.service.logout(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/auth/forgot-password", request_body = ForgotPassword,
    responses((status = 202)))]
async fn forgot_password(
    State(state): State<AuthState>,
    ValidatedJson(input): ValidatedJson<ForgotPassword>,
) -> Result<StatusCode, UserError> {
    state.service.forgot_password(input).await?;
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(post, path = "/auth/reset-password", request_body = ResetPassword,
    responses((status = 204), (status = 400), (status = 404)))]
async fn reset_password(
    State(state): State<AuthState>,
    ValidatedJson(input): ValidatedJson<ResetPassword>,
) -> Result<StatusCode, UserError> {
    state.service.reset_password(input).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/users", responses((status = 200, body = [UserProfile])))]
async fn list_users(
    State(state): State<AuthState>,
) -> Result<Json<Vec<UserProfile>>, UserError> {
    let users = state.service.list_users().await?;
    Ok(Json(users))
}

#[utoipa::path(get, path = "/users/{id}",
    responses((status = 200, body = UserProfile), (status = 404)))]
async fn get_user(
    State(state): State<AuthState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, UserError> {
    let user = state.service.get_user(id).await?;
    Ok(Json(user))
}

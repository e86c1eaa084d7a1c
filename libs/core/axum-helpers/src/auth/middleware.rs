use super::jwt::JwtAuth;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Raw bearer token as received, kept around so gateways can forward it
/// to downstream services unchanged.
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Middleware that requires a valid `Authorization: Bearer <token>` header.
///
/// On success the decoded [`JwtClaims`](super::jwt::JwtClaims) and the raw
/// [`BearerToken`] are inserted into request extensions for handlers to pick
/// up. Missing, malformed, or invalid tokens are rejected with 401.
pub async fn bearer_auth_middleware(
    State(jwt): State<JwtAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?
        .to_string();

    let claims = jwt
        .verify_access_token(&token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::JwtConfig;
    use crate::auth::jwt::JwtClaims;
    use axum::{middleware, routing::get, Extension, Router};
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use tower::ServiceExt;

    fn app(jwt: JwtAuth) -> Router {
        Router::new()
            .route(
                "/me",
                get(|Extension(claims): Extension<JwtClaims>| async move { claims.sub }),
            )
            .layer(middleware::from_fn_with_state(jwt, bearer_auth_middleware))
    }

    fn jwt() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("s1", "s2"))
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let response = app(jwt())
            .oneshot(HttpRequest::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_passes_claims() {
        let jwt = jwt();
        let token = jwt.create_access_token("u-9", "a@b.c").unwrap();
        let response = app(jwt)
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_raw_token_forwarded_in_extensions() {
        let jwt = jwt();
        let token = jwt.create_access_token("u-9", "a@b.c").unwrap();
        let app = Router::new()
            .route(
                "/me",
                get(|Extension(BearerToken(raw)): Extension<BearerToken>| async move { raw }),
            )
            .layer(middleware::from_fn_with_state(jwt, bearer_auth_middleware));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, token.as_bytes());
    }

    #[tokio::test]
    async fn test_wrong_scheme_rejected() {
        let response = app(jwt())
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header(AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Extracts and validates the bearer JWT, yielding the authenticated user id.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let user_id = keys.verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::from(e)
        })?;

        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use axum::http::{header::AUTHORIZATION, Request};

    #[derive(Clone)]
    struct TestState(JwtKeys);

    impl FromRef<TestState> for JwtKeys {
        fn from_ref(state: &TestState) -> Self {
            state.0.clone()
        }
    }

    fn state() -> TestState {
        TestState(JwtKeys::from_config(&JwtConfig {
            secret: secrecy::Secret::new("guard-secret".into()),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 1,
        }))
    }

    async fn extract(header: Option<&str>, state: &TestState) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn valid_bearer_token_yields_user_id() {
        let state = state();
        let token = state.0.sign(5).unwrap();
        let header = format!("Bearer {}", token);
        let user = extract(Some(header.as_str()), &state)
            .await
            .expect("authorized");
        assert_eq!(user.0, 5);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let state = state();
        let issued = time::OffsetDateTime::now_utc() - time::Duration::minutes(5);
        let token = state.0.sign_at(3, issued).unwrap();
        let header = format!("Bearer {}", token);
        let err = extract(Some(header.as_str()), &state).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "token expired"));
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        let state = state();
        for header in [None, Some("Basic abc"), Some("Bearer "), Some("Bearer garbage")] {
            let err = extract(header, &state).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)), "{:?}", header);
        }
    }
}

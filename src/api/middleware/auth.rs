use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    api::state::AppState,
    auth::{Claims, TokenService},
    error::{AppError, Result},
};

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub claims: Claims,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token on a request into its claims.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<Claims> {
    let token = bearer_token(headers).ok_or_else(AppError::missing_token)?;
    tokens.verify(token)
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let claims = authenticate(request.headers(), state.service_context.user_service.tokens())?;

    request.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let claims = authenticate(request.headers(), state.service_context.user_service.tokens())?;

    if !claims.is_admin() {
        return Err(AppError::admin_only());
    }

    request.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(request).await)
}

/// Attach the caller when a valid bearer token is present. Anything else
/// is treated as anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let tokens = state.service_context.user_service.tokens();
    if let Ok(claims) = authenticate(request.headers(), tokens) {
        request.extensions_mut().insert(CurrentUser { claims });
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    use crate::domain::{Role, User};

    fn tokens() -> TokenService {
        TokenService::new("test-secret", 1)
    }

    fn user() -> User {
        User {
            id: 5,
            email: "member@fitmat.test".to_string(),
            name: None,
            role: Role::UserGold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn valid_bearer_yields_claims() {
        let tokens = tokens();
        let token = tokens.issue(&user()).unwrap();

        let claims = authenticate(&headers(&format!("Bearer {}", token)), &tokens).unwrap();
        assert_eq!(claims.id, 5);
        assert_eq!(claims.role, Role::UserGold);
    }

    #[test]
    fn missing_or_non_bearer_header_is_missing_token() {
        let tokens = tokens();
        let token = tokens.issue(&user()).unwrap();

        let malformed = [
            HeaderMap::new(),
            headers(&format!("Token {}", token)),
            headers("Bearer "),
        ];
        for headers in malformed {
            let err = authenticate(&headers, &tokens).unwrap_err();
            assert!(
                matches!(err, AppError::Unauthorized(m) if m == "Missing authorization token.")
            );
        }
    }

    #[test]
    fn garbage_token_is_invalid() {
        let err = authenticate(&headers("Bearer not-a-jwt"), &tokens()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(m) if m == "Invalid token."));
    }
}

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Raw credential extracted from the request, before any verification.
///
/// Identity resolution (claims, active account) happens in the domain layer
/// so that authorization failures short-circuit in one place; this
/// middleware only finds the token.
#[derive(Clone)]
pub struct AuthToken(pub String);

/// Token extraction middleware
///
/// Reads the token from the Authorization header (with or without the
/// "Bearer " prefix) or from the `auth` cookie the apps set, and adds it to
/// request extensions. Requests without a token continue without one.
pub async fn auth_token_middleware(mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        request.extensions_mut().insert(AuthToken(token));
    }

    next.run(request).await
}

/// Extract a credential from headers: Authorization first, cookie fallback.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(raw) = value.to_str() {
            let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("auth="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{models::user::Caller, state::AppState, utils::jwt::verify_caller_token};

/// Attaches the resolved [`Caller`] to every request. Never rejects: a missing
/// or unverifiable token yields [`Caller::Anonymous`] and the authorization gate
/// decides what an anonymous caller may do.
pub async fn caller_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = resolve_caller(request.headers(), &state.config.caller_jwt_secret);
    request.extensions_mut().insert(caller);
    next.run(request).await
}

pub fn resolve_caller(headers: &HeaderMap, secret: &str) -> Caller {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
    else {
        return Caller::Anonymous;
    };

    match verify_caller_token(token, secret) {
        Ok(claims) => Caller::User(claims.into_principal()),
        Err(err) => {
            tracing::warn!(error = %err, "Rejected caller token, treating request as anonymous");
            Caller::Anonymous
        }
    }
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

//! Session extractor.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};

use inkpost_core::RequestContext;
use inkpost_core::ports::AuthError;

use super::error::AppError;
use crate::state::AppState;

/// The caller's request context, resolved from the `Authorization` header.
///
/// A request without the header is anonymous; the service operations decide
/// whether that is acceptable. A header that is present but does not carry a
/// valid session is rejected with 401.
///
/// ```ignore
/// async fn handler(Session(ctx): Session) -> impl Responder { ... }
/// ```
#[derive(Debug, Clone)]
pub struct Session(pub RequestContext);

impl Session {
    fn resolve(req: &HttpRequest) -> Result<RequestContext, AppError> {
        let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
            return Ok(RequestContext::anonymous());
        };

        let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
            tracing::error!("AppState not found in app data");
            AppError::Internal("Server configuration error".to_string())
        })?;

        let token = auth_header
            .to_str()
            .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

        let claims = state.sessions.verify(token.trim())?;
        tracing::debug!(external_id = %claims.external_id, role = claims.role.as_str(), "Session verified");
        Ok(RequestContext::authenticated(claims))
    }
}

impl FromRequest for Session {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::resolve(req).map(Session))
    }
}

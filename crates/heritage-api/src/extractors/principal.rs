//! `CurrentPrincipal` extractor: the principal the auth layer attached.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use heritage_entity::audit::Principal;

/// The acting principal of the current request.
///
/// The authentication layer inserts a [`Principal`] into the request
/// extensions. Requests without one are anonymous; this extractor never
/// rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentPrincipal(pub Principal);

impl CurrentPrincipal {
    /// Read the principal from request parts.
    pub fn from_parts(parts: &Parts) -> Self {
        Self(parts.extensions.get::<Principal>().cloned().unwrap_or_default())
    }
}

impl std::ops::Deref for CurrentPrincipal {
    type Target = Principal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

//! Shared request authorization.
//!
//! Every digest endpoint runs the same two checks in the same order:
//! token → claims → active account (401), then feature grant (403). Both are
//! terminal - nothing downstream runs, and no side effect fires, when either
//! fails.

use std::sync::Arc;

use tracing::debug;

use super::JwtService;
use crate::common::{ApiError, UserId};
use crate::kernel::{BaseEntitlements, BaseUserStore};

pub struct Authorizer {
    jwt_service: Arc<JwtService>,
    users: Arc<dyn BaseUserStore>,
    entitlements: Arc<dyn BaseEntitlements>,
}

impl Authorizer {
    pub fn new(
        jwt_service: Arc<JwtService>,
        users: Arc<dyn BaseUserStore>,
        entitlements: Arc<dyn BaseEntitlements>,
    ) -> Self {
        Self {
            jwt_service,
            users,
            entitlements,
        }
    }

    /// Resolve the caller to an active account.
    pub async fn resolve_active_user(&self, token: Option<&str>) -> Result<UserId, ApiError> {
        let token = token.ok_or(ApiError::Unauthorized)?;

        let claims = self.jwt_service.verify_token(token).map_err(|error| {
            debug!(error = %error, "Token verification failed");
            ApiError::Unauthorized
        })?;

        let user = self
            .users
            .find_active_user(claims.user_id())
            .await
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::Unauthorized)?;

        Ok(user.id)
    }

    /// Require a named feature grant for the user.
    pub async fn require_feature(&self, user_id: UserId, feature: &str) -> Result<(), ApiError> {
        let grant = self
            .entitlements
            .find_granted_feature(feature, user_id)
            .await
            .map_err(ApiError::Internal)?;

        if grant.is_none() {
            debug!(user_id = %user_id, feature = %feature, "Feature not granted");
            return Err(ApiError::Forbidden);
        }

        Ok(())
    }

    /// The full chain: active account, then feature grant.
    pub async fn authorize(&self, token: Option<&str>, feature: &str) -> Result<UserId, ApiError> {
        let user_id = self.resolve_active_user(token).await?;
        self.require_feature(user_id, feature).await?;
        Ok(user_id)
    }
}

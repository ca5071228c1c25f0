//! Digest feedback sink.
//!
//! Validates the rating payload at the boundary, strips the free-text
//! comment, and forwards the rest to the analytics collector tagged with
//! the resolved user id. The forward is fire-and-forget: collector failures
//! are logged and the caller still gets a success response.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::common::ApiError;
use crate::domains::auth::{Authorizer, JwtService};
use crate::domains::entitlements::DIGEST_FEATURE;
use crate::kernel::{AnalyticsEvent, BaseAnalytics, BaseEntitlements, BaseUserStore};

/// Event name the collector files feedback under.
pub const FEEDBACK_EVENT: &str = "digest_feedback";

/// Rating fields that must be present. Presence is the whole contract;
/// range checking is left to the analytics side.
const REQUIRED_RATINGS: [&str; 5] = [
    "digestRating",
    "rankingRating",
    "summaryRating",
    "voiceRating",
    "musicRating",
];

/// Free-text field stripped before anything leaves the request path.
const COMMENT_FIELD: &str = "comment";

pub struct FeedbackSink {
    authorizer: Authorizer,
    analytics: Arc<dyn BaseAnalytics>,
}

impl FeedbackSink {
    pub fn new(
        jwt_service: Arc<JwtService>,
        users: Arc<dyn BaseUserStore>,
        entitlements: Arc<dyn BaseEntitlements>,
        analytics: Arc<dyn BaseAnalytics>,
    ) -> Self {
        Self {
            authorizer: Authorizer::new(jwt_service, users, entitlements),
            analytics,
        }
    }

    /// Build a sink from the server dependency container.
    pub fn from_deps(deps: &crate::kernel::ServerDeps) -> Self {
        Self::new(
            deps.jwt_service.clone(),
            deps.users.clone(),
            deps.entitlements.clone(),
            deps.analytics.clone(),
        )
    }

    /// Validate and forward one feedback payload.
    pub async fn submit(&self, token: Option<&str>, payload: Value) -> Result<(), ApiError> {
        let user_id = self.authorizer.authorize(token, DIGEST_FEATURE).await?;

        let Value::Object(mut fields) = payload else {
            return Err(ApiError::InvalidPayload("expected a JSON object".into()));
        };

        for field in REQUIRED_RATINGS {
            if !fields.contains_key(field) {
                return Err(ApiError::InvalidPayload(format!(
                    "missing required field: {field}"
                )));
            }
        }

        fields.remove(COMMENT_FIELD);

        let event = AnalyticsEvent {
            name: FEEDBACK_EVENT.to_string(),
            distinct_id: user_id.to_string(),
            properties: Value::Object(fields),
        };

        if let Err(error) = self.analytics.capture(event).await {
            warn!(error = %error, user_id = %user_id, "Feedback capture failed");
        }

        Ok(())
    }
}

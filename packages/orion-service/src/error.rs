use time::OffsetDateTime;
use uuid::Uuid;

use orion_domain::{
	Feature,
	tier::{Resource, Tier},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Project {project_id} is not accessible to caller {caller_id}.")]
	AccessDenied { project_id: Uuid, caller_id: Uuid },
	#[error("User {user_id} has no active subscription.")]
	SubscriptionRequired { user_id: Uuid },
	#[error("Feature {feature} is not available on the {current_tier} tier.")]
	FeatureNotAvailable { feature: Feature, current_tier: Tier, required_tier: Option<Tier> },
	#[error("The {current_tier} tier is below the required {required_tier} tier.")]
	InsufficientTier { current_tier: Tier, required_tier: Tier },
	#[error("The {resource} limit of {limit} is reached ({current} in use).")]
	ResourceLimitExceeded { resource: Resource, current: i64, limit: i64, required_tier: Option<Tier> },
	#[error("Monthly AI usage limit of {limit} is reached ({used} used).")]
	AiUsageLimitExceeded { used: i64, limit: i64, reset_at: OffsetDateTime },
	#[error("A project named {name:?} already exists.")]
	DuplicateName { name: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Stable machine-readable identifier for transport layers.
	pub fn code(&self) -> &'static str {
		match self {
			Self::InvalidRequest { .. } => "INVALID_REQUEST",
			Self::NotFound { .. } => "NOT_FOUND",
			Self::AccessDenied { .. } => "ACCESS_DENIED",
			Self::SubscriptionRequired { .. } => "SUBSCRIPTION_REQUIRED",
			Self::FeatureNotAvailable { .. } => "FEATURE_NOT_AVAILABLE",
			Self::InsufficientTier { .. } => "INSUFFICIENT_TIER",
			Self::ResourceLimitExceeded { .. } => "RESOURCE_LIMIT_EXCEEDED",
			Self::AiUsageLimitExceeded { .. } => "AI_USAGE_LIMIT_EXCEEDED",
			Self::DuplicateName { .. } => "DUPLICATE_NAME",
			Self::Storage { .. } => "STORAGE_ERROR",
		}
	}

	pub fn is_client_error(&self) -> bool {
		!matches!(self, Self::Storage { .. })
	}
}

impl From<orion_storage::Error> for Error {
	fn from(err: orion_storage::Error) -> Self {
		match err {
			orion_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			orion_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			orion_storage::Error::NotFound(message) => Self::NotFound { message },
			orion_storage::Error::Conflict(message) => Self::InvalidRequest { message },
		}
	}
}

//! Tier policy: feature gates, resource ceilings, and the monthly AI usage quota.

use serde::Serialize;
use time::{Date, Month, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::{Error, OrionService, Result, store_failure};
use orion_domain::{
	Feature,
	tier::{self, CapabilitySet, Ceiling, Resource, Tier},
};
use orion_storage::{ForceScope, models::UserAccount};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCapabilities {
	pub user_id: Uuid,
	pub has_active_subscription: bool,
	pub tier: Tier,
	pub capabilities: CapabilitySet,
}

/// Outcome of a successful quota increment. `-1` in `limit` and `remaining` means unlimited.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiUsage {
	pub success: bool,
	pub remaining: i64,
	pub limit: i64,
	pub used: i64,
	#[serde(with = "crate::time_serde")]
	pub reset_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiUsageStatus {
	pub period: String,
	pub used: i64,
	pub limit: i64,
	pub remaining: i64,
	#[serde(with = "crate::time_serde")]
	pub reset_at: OffsetDateTime,
}

pub(crate) struct Caller {
	pub(crate) user: UserAccount,
	pub(crate) tier: Tier,
	pub(crate) active: bool,
}

impl OrionService {
	pub fn capabilities_for(&self, tier: Tier) -> &CapabilitySet {
		self.tiers.capabilities(tier)
	}

	pub async fn get_user_capabilities(&self, user_id: Uuid) -> Result<UserCapabilities> {
		let caller = self.load_caller(user_id).await?;

		Ok(UserCapabilities {
			user_id: caller.user.user_id,
			has_active_subscription: caller.active,
			tier: caller.tier,
			capabilities: self.capabilities_for(caller.tier).clone(),
		})
	}

	pub async fn authorize_feature(&self, user_id: Uuid, feature: Feature) -> Result<()> {
		let caller = self.load_active_caller(user_id).await?;

		if self.capabilities_for(caller.tier).grants(feature) {
			return Ok(());
		}

		Err(Error::FeatureNotAvailable {
			feature,
			current_tier: caller.tier,
			required_tier: self.tiers.min_tier_with_feature(feature),
		})
	}

	pub async fn authorize_tier(&self, user_id: Uuid, minimum: Tier) -> Result<()> {
		let caller = self.load_active_caller(user_id).await?;

		if caller.tier >= minimum {
			return Ok(());
		}

		Err(Error::InsufficientTier { current_tier: caller.tier, required_tier: minimum })
	}

	/// Checks that one more unit of `resource` fits under the caller's ceiling.
	///
	/// This is check-then-act without locking, so concurrent creators may overshoot a ceiling
	/// by a small margin.
	pub async fn authorize_resource(&self, user_id: Uuid, resource: Resource) -> Result<()> {
		let caller = self.load_active_caller(user_id).await?;
		let ceiling = self.capabilities_for(caller.tier).ceiling(resource);
		let Ceiling::Limited(_) = ceiling else {
			return Ok(());
		};
		let current = self.current_usage(user_id, resource).await?;
		let needed = u64::try_from(current).unwrap_or(0).saturating_add(1);

		if ceiling.accommodates(needed) {
			return Ok(());
		}

		Err(Error::ResourceLimitExceeded {
			resource,
			current,
			limit: ceiling.as_raw(),
			required_tier: self.tiers.min_tier_accommodating(resource, needed),
		})
	}

	pub async fn increment_ai_usage(&self, user_id: Uuid) -> Result<AiUsage> {
		self.increment_ai_usage_at(user_id, OffsetDateTime::now_utc()).await
	}

	/// Consumes one AI query from the caller's quota for the month containing `now`.
	pub async fn increment_ai_usage_at(
		&self,
		user_id: Uuid,
		now: OffsetDateTime,
	) -> Result<AiUsage> {
		let caller = self.load_active_caller(user_id).await?;
		let ceiling = self.capabilities_for(caller.tier).ceiling(Resource::AiQueries);
		let (period, reset_at) = usage_period(now)?;
		let limit = match ceiling {
			Ceiling::Limited(0) => {
				tracing::warn!(user_id = %user_id, tier = %caller.tier, "AI usage is disabled for this tier.");

				return Err(Error::AiUsageLimitExceeded { used: 0, limit: 0, reset_at });
			},
			Ceiling::Limited(_) => Some(ceiling.as_raw()),
			Ceiling::Unlimited => None,
		};
		let counter = self
			.store
			.increment_usage_if_below(user_id, &period, limit, reset_at, now)
			.await
			.map_err(store_failure("increment_ai_usage", None, user_id))?;

		match (counter, limit) {
			(Some(counter), Some(limit)) => Ok(AiUsage {
				success: true,
				remaining: (limit - counter.count).max(0),
				limit,
				used: counter.count,
				reset_at: counter.reset_at,
			}),
			(Some(counter), None) => Ok(AiUsage {
				success: true,
				remaining: -1,
				limit: -1,
				used: counter.count,
				reset_at: counter.reset_at,
			}),
			(None, limit) => {
				let limit = limit.unwrap_or(-1);
				let used = self
					.store
					.get_usage(user_id, &period)
					.await
					.map_err(store_failure("increment_ai_usage", None, user_id))?
					.map(|counter| counter.count)
					.unwrap_or(limit);

				tracing::warn!(user_id = %user_id, period = %period, used, limit, "AI usage quota exhausted.");

				Err(Error::AiUsageLimitExceeded { used, limit, reset_at })
			},
		}
	}

	pub async fn ai_usage_status(&self, user_id: Uuid) -> Result<AiUsageStatus> {
		self.ai_usage_status_at(user_id, OffsetDateTime::now_utc()).await
	}

	/// Read-only view of the quota for the month containing `now`.
	pub async fn ai_usage_status_at(
		&self,
		user_id: Uuid,
		now: OffsetDateTime,
	) -> Result<AiUsageStatus> {
		let caller = self.load_caller(user_id).await?;
		let ceiling = self.capabilities_for(caller.tier).ceiling(Resource::AiQueries);
		let (period, reset_at) = usage_period(now)?;
		let used = self
			.store
			.get_usage(user_id, &period)
			.await
			.map_err(store_failure("ai_usage_status", None, user_id))?
			.map(|counter| counter.count)
			.unwrap_or(0);
		let limit = ceiling.as_raw();
		let remaining = match ceiling {
			Ceiling::Unlimited => -1,
			Ceiling::Limited(_) => (limit - used).max(0),
		};

		Ok(AiUsageStatus { period, used, limit, remaining, reset_at })
	}

	pub(crate) async fn load_caller(&self, user_id: Uuid) -> Result<Caller> {
		let Some(user) = self
			.store
			.get_user(user_id)
			.await
			.map_err(store_failure("load_caller", None, user_id))?
		else {
			return Err(Error::NotFound { message: format!("User {user_id} does not exist.") });
		};
		let tier = Tier::parse(&user.subscription_tier).unwrap_or_else(|| {
			tracing::warn!(
				user_id = %user_id,
				subscription_tier = %user.subscription_tier,
				"Unknown subscription tier. Treating as basic."
			);

			Tier::Basic
		});
		let active = tier::is_active_subscription(&user.subscription_status);

		Ok(Caller { user, tier, active })
	}

	pub(crate) async fn load_active_caller(&self, user_id: Uuid) -> Result<Caller> {
		let caller = self.load_caller(user_id).await?;

		if !caller.active {
			return Err(Error::SubscriptionRequired { user_id });
		}

		Ok(caller)
	}

	async fn current_usage(&self, user_id: Uuid, resource: Resource) -> Result<i64> {
		let current = match resource {
			Resource::Projects => self.store.count_projects_for_owner(user_id).await,
			Resource::Forces => self.store.count_forces(ForceScope::OwnedBy(user_id)).await,
			Resource::AiQueries => {
				let (period, _) = usage_period(OffsetDateTime::now_utc())?;

				self.store
					.get_usage(user_id, &period)
					.await
					.map(|counter| counter.map(|counter| counter.count).unwrap_or(0))
			},
		};

		current.map_err(store_failure("authorize_resource", None, user_id))
	}
}

/// Calendar month in UTC containing `now`, formatted `YYYY-MM`, and the instant it rolls over.
pub fn usage_period(now: OffsetDateTime) -> Result<(String, OffsetDateTime)> {
	let now = now.to_offset(UtcOffset::UTC);
	let period = format!("{:04}-{:02}", now.year(), u8::from(now.month()));
	let (year, month) = match now.month() {
		Month::December => (now.year() + 1, Month::January),
		month => (now.year(), month.next()),
	};
	let reset_at = Date::from_calendar_date(year, month, 1)
		.map_err(|err| Error::InvalidRequest {
			message: format!("Usage period after {period} is out of range: {err}."),
		})?
		.midnight()
		.assume_utc();

	Ok((period, reset_at))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn usage_period_rolls_over_at_month_start() {
		let (period, reset_at) = usage_period(datetime!(2026-05-31 23:59 UTC)).unwrap();

		assert_eq!(period, "2026-05");
		assert_eq!(reset_at, datetime!(2026-06-01 00:00 UTC));
	}

	#[test]
	fn usage_period_wraps_the_year() {
		let (period, reset_at) = usage_period(datetime!(2026-12-15 10:00 UTC)).unwrap();

		assert_eq!(period, "2026-12");
		assert_eq!(reset_at, datetime!(2027-01-01 00:00 UTC));
	}

	#[test]
	fn usage_period_is_computed_in_utc() {
		let (period, _) = usage_period(datetime!(2026-07-01 01:30 +03:00)).unwrap();

		assert_eq!(period, "2026-06");
	}
}

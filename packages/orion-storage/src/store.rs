//! The entity store seam.
//!
//! Every method is one round trip against the backing store. Multi-step procedures such as the
//! default-project repair are composed by the service layer out of these calls, so they are not
//! atomic as a whole; only [`EntityStore::increment_usage_if_below`] carries a compound
//! read-modify-write guarantee.

use std::{future::Future, pin::Pin};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	filter::{ForceFilter, ForceOrder, Window},
	models::{Cluster, Force, Project, UsageCounter, UserAccount},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which forces a plain count covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceScope {
	All,
	/// Forces without an owning project.
	Orphaned,
	InProject(Uuid),
	/// Forces in any project owned by this user.
	OwnedBy(Uuid),
	/// Forces owned by a project that is not flagged default.
	OutsideDefaults,
}

pub trait EntityStore
where
	Self: Send + Sync,
{
	fn get_project<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<Option<Project>>>;

	fn list_projects_for_owner<'a>(&'a self, owner_id: Uuid)
	-> BoxFuture<'a, Result<Vec<Project>>>;

	/// Case-insensitive name lookup within one owner; `None` is the ownerless namespace.
	fn find_project_by_name<'a>(
		&'a self,
		owner_id: Option<Uuid>,
		name: &'a str,
	) -> BoxFuture<'a, Result<Option<Project>>>;

	/// Projects flagged default, most recently created first.
	fn list_default_projects<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Project>>>;

	/// Fails with [`crate::Error::Conflict`] when the owner already has a project with the same
	/// name, compared case-insensitively.
	fn insert_project<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, Result<()>>;

	fn set_project_default<'a>(
		&'a self,
		project_id: Uuid,
		is_default: bool,
	) -> BoxFuture<'a, Result<()>>;

	/// Deletes the project together with its forces and clusters.
	fn delete_project<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<bool>>;

	fn count_projects_for_owner<'a>(&'a self, owner_id: Uuid) -> BoxFuture<'a, Result<i64>>;

	fn insert_force<'a>(&'a self, force: &'a Force) -> BoxFuture<'a, Result<()>>;

	fn count_forces<'a>(&'a self, scope: ForceScope) -> BoxFuture<'a, Result<i64>>;

	fn assign_orphan_forces<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<u64>>;

	fn reassign_forces<'a>(&'a self, from: Uuid, to: Uuid) -> BoxFuture<'a, Result<u64>>;

	fn count_matching_forces<'a>(&'a self, filter: &'a ForceFilter) -> BoxFuture<'a, Result<i64>>;

	fn fetch_matching_forces<'a>(
		&'a self,
		filter: &'a ForceFilter,
		order: ForceOrder,
		window: Option<Window>,
	) -> BoxFuture<'a, Result<Vec<Force>>>;

	fn insert_cluster<'a>(&'a self, cluster: &'a Cluster) -> BoxFuture<'a, Result<()>>;

	fn list_clusters<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<Vec<Cluster>>>;

	fn reassign_clusters<'a>(&'a self, from: Uuid, to: Uuid) -> BoxFuture<'a, Result<u64>>;

	fn get_user<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<UserAccount>>>;

	fn upsert_user<'a>(&'a self, user: &'a UserAccount) -> BoxFuture<'a, Result<()>>;

	/// Atomically increments the `(user_id, period)` counter unless it already reached
	/// `ceiling`, creating the row on first use. `None` as ceiling means unlimited.
	///
	/// Returns the updated counter, or `None` when the ceiling was reached and nothing changed.
	fn increment_usage_if_below<'a>(
		&'a self,
		user_id: Uuid,
		period: &'a str,
		ceiling: Option<i64>,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<UsageCounter>>>;

	fn get_usage<'a>(
		&'a self,
		user_id: Uuid,
		period: &'a str,
	) -> BoxFuture<'a, Result<Option<UsageCounter>>>;
}

impl EntityStore for Db {
	fn get_project<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<Option<Project>>> {
		Box::pin(queries::get_project(&self.pool, project_id))
	}

	fn list_projects_for_owner<'a>(
		&'a self,
		owner_id: Uuid,
	) -> BoxFuture<'a, Result<Vec<Project>>> {
		Box::pin(queries::list_projects_for_owner(&self.pool, owner_id))
	}

	fn find_project_by_name<'a>(
		&'a self,
		owner_id: Option<Uuid>,
		name: &'a str,
	) -> BoxFuture<'a, Result<Option<Project>>> {
		Box::pin(queries::find_project_by_name(&self.pool, owner_id, name))
	}

	fn list_default_projects<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Project>>> {
		Box::pin(queries::list_default_projects(&self.pool))
	}

	fn insert_project<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::insert_project(&self.pool, project))
	}

	fn set_project_default<'a>(
		&'a self,
		project_id: Uuid,
		is_default: bool,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::set_project_default(&self.pool, project_id, is_default))
	}

	fn delete_project<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(queries::delete_project(&self.pool, project_id))
	}

	fn count_projects_for_owner<'a>(&'a self, owner_id: Uuid) -> BoxFuture<'a, Result<i64>> {
		Box::pin(queries::count_projects_for_owner(&self.pool, owner_id))
	}

	fn insert_force<'a>(&'a self, force: &'a Force) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::insert_force(&self.pool, force))
	}

	fn count_forces<'a>(&'a self, scope: ForceScope) -> BoxFuture<'a, Result<i64>> {
		Box::pin(queries::count_forces(&self.pool, scope))
	}

	fn assign_orphan_forces<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<u64>> {
		Box::pin(queries::assign_orphan_forces(&self.pool, project_id))
	}

	fn reassign_forces<'a>(&'a self, from: Uuid, to: Uuid) -> BoxFuture<'a, Result<u64>> {
		Box::pin(queries::reassign_forces(&self.pool, from, to))
	}

	fn count_matching_forces<'a>(
		&'a self,
		filter: &'a ForceFilter,
	) -> BoxFuture<'a, Result<i64>> {
		Box::pin(queries::count_matching_forces(&self.pool, filter))
	}

	fn fetch_matching_forces<'a>(
		&'a self,
		filter: &'a ForceFilter,
		order: ForceOrder,
		window: Option<Window>,
	) -> BoxFuture<'a, Result<Vec<Force>>> {
		Box::pin(queries::fetch_matching_forces(&self.pool, filter, order, window))
	}

	fn insert_cluster<'a>(&'a self, cluster: &'a Cluster) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::insert_cluster(&self.pool, cluster))
	}

	fn list_clusters<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<Vec<Cluster>>> {
		Box::pin(queries::list_clusters(&self.pool, project_id))
	}

	fn reassign_clusters<'a>(&'a self, from: Uuid, to: Uuid) -> BoxFuture<'a, Result<u64>> {
		Box::pin(queries::reassign_clusters(&self.pool, from, to))
	}

	fn get_user<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<UserAccount>>> {
		Box::pin(queries::get_user(&self.pool, user_id))
	}

	fn upsert_user<'a>(&'a self, user: &'a UserAccount) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::upsert_user(&self.pool, user))
	}

	fn increment_usage_if_below<'a>(
		&'a self,
		user_id: Uuid,
		period: &'a str,
		ceiling: Option<i64>,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<UsageCounter>>> {
		Box::pin(queries::increment_usage_if_below(
			&self.pool, user_id, period, ceiling, reset_at, now,
		))
	}

	fn get_usage<'a>(
		&'a self,
		user_id: Uuid,
		period: &'a str,
	) -> BoxFuture<'a, Result<Option<UsageCounter>>> {
		Box::pin(queries::get_usage(&self.pool, user_id, period))
	}
}

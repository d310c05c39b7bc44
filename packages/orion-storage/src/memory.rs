//! In-memory [`EntityStore`] for tests and single-process tooling.
//!
//! All tables live behind one `RwLock`, so every call observes a consistent snapshot and the
//! usage increment compares and writes under the same write guard.

use std::{
	collections::HashMap,
	future,
	sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	filter::{ForceFilter, ForceOrder, Window},
	models::{Cluster, Force, Project, UsageCounter, UserAccount},
	store::{BoxFuture, EntityStore, ForceScope},
};

#[derive(Default)]
struct Tables {
	projects: HashMap<Uuid, Project>,
	forces: HashMap<Uuid, Force>,
	clusters: HashMap<Uuid, Cluster>,
	users: HashMap<Uuid, UserAccount>,
	usage: HashMap<(Uuid, String), UsageCounter>,
}
impl Tables {
	fn is_default_project(&self, project_id: Option<Uuid>) -> Option<bool> {
		project_id.and_then(|id| self.projects.get(&id)).map(|project| project.is_default)
	}
}

#[derive(Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn read(&self) -> RwLockReadGuard<'_, Tables> {
		self.tables.read().unwrap_or_else(|err| err.into_inner())
	}

	fn write(&self) -> RwLockWriteGuard<'_, Tables> {
		self.tables.write().unwrap_or_else(|err| err.into_inner())
	}

	fn insert_project_now(&self, project: &Project) -> Result<()> {
		let mut tables = self.write();
		let owner_key = project.owner_id.unwrap_or(Uuid::nil());
		let name_key = project.name.to_lowercase();
		let taken = tables.projects.values().any(|existing| {
			existing.project_id == project.project_id
				|| (existing.owner_id.unwrap_or(Uuid::nil()) == owner_key
					&& existing.name.to_lowercase() == name_key)
		});

		if taken {
			return Err(Error::Conflict(format!("Project name {:?} is already taken.", project.name)));
		}

		tables.projects.insert(project.project_id, project.clone());

		Ok(())
	}

	fn set_project_default_now(&self, project_id: Uuid, is_default: bool) -> Result<()> {
		let mut tables = self.write();
		let Some(project) = tables.projects.get_mut(&project_id) else {
			return Err(Error::NotFound(format!("Project {project_id} does not exist.")));
		};

		project.is_default = is_default;
		project.updated_at = OffsetDateTime::now_utc();

		Ok(())
	}

	fn delete_project_now(&self, project_id: Uuid) -> bool {
		let mut tables = self.write();

		if tables.projects.remove(&project_id).is_none() {
			return false;
		}

		tables.forces.retain(|_, force| force.project_id != Some(project_id));
		tables.clusters.retain(|_, cluster| cluster.project_id != project_id);

		true
	}

	fn insert_force_now(&self, force: &Force) -> Result<()> {
		let mut tables = self.write();

		if let Some(project_id) = force.project_id
			&& !tables.projects.contains_key(&project_id)
		{
			return Err(Error::NotFound(format!("Project {project_id} does not exist.")));
		}
		if tables.forces.contains_key(&force.force_id) {
			return Err(Error::Conflict(format!("Force {} already exists.", force.force_id)));
		}

		tables.forces.insert(force.force_id, force.clone());

		Ok(())
	}

	fn count_forces_now(&self, scope: ForceScope) -> i64 {
		let tables = self.read();
		let count = tables
			.forces
			.values()
			.filter(|force| match scope {
				ForceScope::All => true,
				ForceScope::Orphaned => force.project_id.is_none(),
				ForceScope::InProject(project_id) => force.project_id == Some(project_id),
				ForceScope::OwnedBy(owner_id) => force
					.project_id
					.and_then(|id| tables.projects.get(&id))
					.map(|project| project.owner_id == Some(owner_id))
					.unwrap_or(false),
				ForceScope::OutsideDefaults =>
					tables.is_default_project(force.project_id) == Some(false),
			})
			.count();

		count as i64
	}

	fn move_forces(&self, from: Option<Uuid>, to: Uuid) -> u64 {
		let mut tables = self.write();
		let now = OffsetDateTime::now_utc();
		let mut moved = 0;

		for force in tables.forces.values_mut().filter(|force| force.project_id == from) {
			force.project_id = Some(to);
			force.updated_at = now;
			moved += 1;
		}

		moved
	}

	fn fetch_matching_now(
		&self,
		filter: &ForceFilter,
		order: ForceOrder,
		window: Option<Window>,
	) -> Vec<Force> {
		let tables = self.read();
		let mut rows: Vec<Force> =
			tables.forces.values().filter(|force| filter.matches(force)).cloned().collect();

		rows.sort_by(|a, b| order.compare(a, b));

		match window {
			Some(window) => rows
				.into_iter()
				.skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
				.take(usize::try_from(window.limit).unwrap_or(usize::MAX))
				.collect(),
			None => rows,
		}
	}

	fn insert_cluster_now(&self, cluster: &Cluster) -> Result<()> {
		let mut tables = self.write();

		if !tables.projects.contains_key(&cluster.project_id) {
			return Err(Error::NotFound(format!("Project {} does not exist.", cluster.project_id)));
		}

		tables.clusters.insert(cluster.cluster_id, cluster.clone());

		Ok(())
	}

	fn reassign_clusters_now(&self, from: Uuid, to: Uuid) -> u64 {
		let mut tables = self.write();
		let mut moved = 0;

		for cluster in tables.clusters.values_mut().filter(|cluster| cluster.project_id == from) {
			cluster.project_id = to;
			moved += 1;
		}

		moved
	}

	fn upsert_user_now(&self, user: &UserAccount) {
		let mut tables = self.write();

		match tables.users.get_mut(&user.user_id) {
			Some(existing) => {
				existing.subscription_tier = user.subscription_tier.clone();
				existing.subscription_status = user.subscription_status.clone();
			},
			None => {
				tables.users.insert(user.user_id, user.clone());
			},
		}
	}

	fn increment_usage_now(
		&self,
		user_id: Uuid,
		period: &str,
		ceiling: Option<i64>,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> Result<Option<UsageCounter>> {
		if let Some(ceiling) = ceiling
			&& ceiling <= 0
		{
			return Err(Error::InvalidArgument(format!(
				"Usage ceiling must be positive, got {ceiling}."
			)));
		}

		let mut tables = self.write();
		let key = (user_id, period.to_string());

		match tables.usage.get_mut(&key) {
			Some(counter) => {
				if ceiling.map(|ceiling| counter.count >= ceiling).unwrap_or(false) {
					return Ok(None);
				}

				counter.count += 1;
				counter.updated_at = now;

				Ok(Some(counter.clone()))
			},
			None => {
				let counter = UsageCounter {
					user_id,
					period: period.to_string(),
					count: 1,
					reset_at,
					updated_at: now,
				};

				tables.usage.insert(key, counter.clone());

				Ok(Some(counter))
			},
		}
	}
}

impl EntityStore for MemoryStore {
	fn get_project<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<Option<Project>>> {
		let project = self.read().projects.get(&project_id).cloned();

		Box::pin(future::ready(Ok(project)))
	}

	fn list_projects_for_owner<'a>(
		&'a self,
		owner_id: Uuid,
	) -> BoxFuture<'a, Result<Vec<Project>>> {
		let mut projects: Vec<Project> = self
			.read()
			.projects
			.values()
			.filter(|project| project.owner_id == Some(owner_id))
			.cloned()
			.collect();

		projects.sort_by(|a, b| {
			a.created_at.cmp(&b.created_at).then_with(|| a.project_id.cmp(&b.project_id))
		});

		Box::pin(future::ready(Ok(projects)))
	}

	fn find_project_by_name<'a>(
		&'a self,
		owner_id: Option<Uuid>,
		name: &'a str,
	) -> BoxFuture<'a, Result<Option<Project>>> {
		let name = name.to_lowercase();
		let project = self
			.read()
			.projects
			.values()
			.find(|project| project.owner_id == owner_id && project.name.to_lowercase() == name)
			.cloned();

		Box::pin(future::ready(Ok(project)))
	}

	fn list_default_projects<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Project>>> {
		let mut projects: Vec<Project> =
			self.read().projects.values().filter(|project| project.is_default).cloned().collect();

		projects.sort_by(|a, b| {
			b.created_at.cmp(&a.created_at).then_with(|| b.project_id.cmp(&a.project_id))
		});

		Box::pin(future::ready(Ok(projects)))
	}

	fn insert_project<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, Result<()>> {
		Box::pin(future::ready(self.insert_project_now(project)))
	}

	fn set_project_default<'a>(
		&'a self,
		project_id: Uuid,
		is_default: bool,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(future::ready(self.set_project_default_now(project_id, is_default)))
	}

	fn delete_project<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(future::ready(Ok(self.delete_project_now(project_id))))
	}

	fn count_projects_for_owner<'a>(&'a self, owner_id: Uuid) -> BoxFuture<'a, Result<i64>> {
		let count = self
			.read()
			.projects
			.values()
			.filter(|project| project.owner_id == Some(owner_id))
			.count();

		Box::pin(future::ready(Ok(count as i64)))
	}

	fn insert_force<'a>(&'a self, force: &'a Force) -> BoxFuture<'a, Result<()>> {
		Box::pin(future::ready(self.insert_force_now(force)))
	}

	fn count_forces<'a>(&'a self, scope: ForceScope) -> BoxFuture<'a, Result<i64>> {
		Box::pin(future::ready(Ok(self.count_forces_now(scope))))
	}

	fn assign_orphan_forces<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<u64>> {
		Box::pin(future::ready(Ok(self.move_forces(None, project_id))))
	}

	fn reassign_forces<'a>(&'a self, from: Uuid, to: Uuid) -> BoxFuture<'a, Result<u64>> {
		Box::pin(future::ready(Ok(self.move_forces(Some(from), to))))
	}

	fn count_matching_forces<'a>(
		&'a self,
		filter: &'a ForceFilter,
	) -> BoxFuture<'a, Result<i64>> {
		let count = self.read().forces.values().filter(|force| filter.matches(force)).count();

		Box::pin(future::ready(Ok(count as i64)))
	}

	fn fetch_matching_forces<'a>(
		&'a self,
		filter: &'a ForceFilter,
		order: ForceOrder,
		window: Option<Window>,
	) -> BoxFuture<'a, Result<Vec<Force>>> {
		Box::pin(future::ready(Ok(self.fetch_matching_now(filter, order, window))))
	}

	fn insert_cluster<'a>(&'a self, cluster: &'a Cluster) -> BoxFuture<'a, Result<()>> {
		Box::pin(future::ready(self.insert_cluster_now(cluster)))
	}

	fn list_clusters<'a>(&'a self, project_id: Uuid) -> BoxFuture<'a, Result<Vec<Cluster>>> {
		let mut clusters: Vec<Cluster> = self
			.read()
			.clusters
			.values()
			.filter(|cluster| cluster.project_id == project_id)
			.cloned()
			.collect();

		clusters.sort_by(|a, b| {
			a.created_at.cmp(&b.created_at).then_with(|| a.cluster_id.cmp(&b.cluster_id))
		});

		Box::pin(future::ready(Ok(clusters)))
	}

	fn reassign_clusters<'a>(&'a self, from: Uuid, to: Uuid) -> BoxFuture<'a, Result<u64>> {
		Box::pin(future::ready(Ok(self.reassign_clusters_now(from, to))))
	}

	fn get_user<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<UserAccount>>> {
		let user = self.read().users.get(&user_id).cloned();

		Box::pin(future::ready(Ok(user)))
	}

	fn upsert_user<'a>(&'a self, user: &'a UserAccount) -> BoxFuture<'a, Result<()>> {
		self.upsert_user_now(user);

		Box::pin(future::ready(Ok(())))
	}

	fn increment_usage_if_below<'a>(
		&'a self,
		user_id: Uuid,
		period: &'a str,
		ceiling: Option<i64>,
		reset_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<UsageCounter>>> {
		Box::pin(future::ready(self.increment_usage_now(user_id, period, ceiling, reset_at, now)))
	}

	fn get_usage<'a>(
		&'a self,
		user_id: Uuid,
		period: &'a str,
	) -> BoxFuture<'a, Result<Option<UsageCounter>>> {
		let counter = self.read().usage.get(&(user_id, period.to_string())).cloned();

		Box::pin(future::ready(Ok(counter)))
	}
}

//! Project resolution, the shared default project, and project lifecycle.
//!
//! Exactly one project is flagged default and every force belongs to some project. The repair
//! pass restores both properties. Each of its steps is a separate store call, so two concurrent
//! repairs can duplicate work; a later pass converges.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, OrionService, Result, store_failure};
use orion_domain::{
	force::{self, ForceType},
	tier::Resource,
};
use orion_storage::{
	ForceScope,
	models::{Force, Project},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantReport {
	pub default_project_id: Option<Uuid>,
	pub defaults_found: usize,
	pub defaults_cleared: usize,
	pub default_created: bool,
	/// An existing ownerless project carrying the default name was flagged default.
	pub default_promoted: bool,
	pub orphans_assigned: u64,
	pub forces_migrated: u64,
	pub clusters_migrated: u64,
	pub verified: bool,
}
impl InvariantReport {
	pub fn repaired_anything(&self) -> bool {
		self.default_created
			|| self.default_promoted
			|| self.defaults_cleared > 0
			|| self.orphans_assigned > 0
			|| self.forces_migrated > 0
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
	pub project_id: Uuid,
	pub owner_id: Option<Uuid>,
	pub name: String,
	pub is_default: bool,
	pub force_count: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}
impl ProjectSummary {
	fn new(project: Project, force_count: i64) -> Self {
		Self {
			project_id: project.project_id,
			owner_id: project.owner_id,
			name: project.name,
			is_default: project.is_default,
			force_count,
			created_at: project.created_at,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewForce {
	pub title: String,
	#[serde(default)]
	pub body: String,
	/// Type code (`M`, `T`, `WS`, `WC`, `S`) or its display label.
	pub force_type: String,
	pub steep_category: Option<String>,
	pub impact: Option<f64>,
	pub magnitude: Option<f64>,
	pub distance: Option<f64>,
	pub feasibility: Option<f64>,
	pub urgency: Option<f64>,
	#[serde(default)]
	pub tags: Vec<String>,
	pub source: Option<String>,
	pub sentiment: Option<String>,
	pub horizon: Option<String>,
}

impl OrionService {
	pub async fn ensure_default_project_invariant(&self) -> Result<InvariantReport> {
		let mut report = InvariantReport::default();
		let defaults = self.store.list_default_projects().await?;

		report.defaults_found = defaults.len();

		let default_id = match defaults.split_first() {
			Some((keep, stale)) => {
				for project in stale {
					report.forces_migrated +=
						self.store.reassign_forces(project.project_id, keep.project_id).await?;
					report.clusters_migrated +=
						self.store.reassign_clusters(project.project_id, keep.project_id).await?;

					self.store.set_project_default(project.project_id, false).await?;

					report.defaults_cleared += 1;
				}

				keep.project_id
			},
			None => {
				let (project_id, origin) = self.create_default_project().await?;

				report.default_created = origin == DefaultOrigin::Created;
				report.default_promoted = origin == DefaultOrigin::Promoted;

				project_id
			},
		};

		report.default_project_id = Some(default_id);

		let orphans = self.store.count_forces(ForceScope::Orphaned).await?;
		let total = self.store.count_forces(ForceScope::All).await?;
		let in_default = self.store.count_forces(ForceScope::InProject(default_id)).await?;

		if orphans > 0 && in_default < total {
			report.orphans_assigned = self.store.assign_orphan_forces(default_id).await?;
		}

		report.verified = self.verify_default_invariant(default_id).await?;

		if report.repaired_anything() {
			tracing::info!(
				default_project_id = %default_id,
				defaults_found = report.defaults_found,
				defaults_cleared = report.defaults_cleared,
				default_created = report.default_created,
				default_promoted = report.default_promoted,
				orphans_assigned = report.orphans_assigned,
				forces_migrated = report.forces_migrated,
				"Repaired default project invariant."
			);
		}

		Ok(report)
	}

	/// Resolves the project a request actually reads from.
	///
	/// `None` reads the shared default. A project the caller owns that holds no forces yet also
	/// falls back to the default, so new projects still surface the shared catalog.
	pub async fn resolve_effective_project(
		&self,
		requested: Option<Uuid>,
		caller_id: Uuid,
	) -> Result<Uuid> {
		let default_id = self.default_project_id(caller_id).await?;
		let Some(requested) = requested else {
			return Ok(default_id);
		};
		let Some(project) = self
			.store
			.get_project(requested)
			.await
			.map_err(store_failure("resolve_effective_project", Some(requested), caller_id))?
		else {
			return Err(Error::NotFound { message: format!("Project {requested} does not exist.") });
		};

		if let Some(owner_id) = project.owner_id
			&& owner_id != caller_id
		{
			return Err(Error::AccessDenied { project_id: requested, caller_id });
		}
		if project.project_id == default_id {
			return Ok(default_id);
		}

		let forces = self
			.store
			.count_forces(ForceScope::InProject(requested))
			.await
			.map_err(store_failure("resolve_effective_project", Some(requested), caller_id))?;

		if forces == 0 {
			tracing::info!(
				requested_project_id = %requested,
				default_project_id = %default_id,
				caller_id = %caller_id,
				"Requested project is empty. Falling back to the default project."
			);

			return Ok(default_id);
		}

		Ok(requested)
	}

	pub async fn create_project(&self, caller_id: Uuid, name: &str) -> Result<ProjectSummary> {
		let name = name.trim();

		if name.is_empty() {
			return Err(Error::InvalidRequest { message: "Project name must be non-empty.".to_string() });
		}

		self.authorize_resource(caller_id, Resource::Projects).await?;

		let now = OffsetDateTime::now_utc();
		let project = Project {
			project_id: Uuid::new_v4(),
			owner_id: Some(caller_id),
			name: name.to_string(),
			is_default: false,
			created_at: now,
			updated_at: now,
		};

		match self.store.insert_project(&project).await {
			Ok(()) => {},
			Err(orion_storage::Error::Conflict(_)) =>
				return Err(Error::DuplicateName { name: name.to_string() }),
			Err(err) =>
				return Err(store_failure("create_project", Some(project.project_id), caller_id)(
					err,
				)),
		}

		tracing::info!(project_id = %project.project_id, caller_id = %caller_id, "Created project.");

		Ok(ProjectSummary::new(project, 0))
	}

	/// The caller's own projects followed by the shared default.
	pub async fn list_projects(&self, caller_id: Uuid) -> Result<Vec<ProjectSummary>> {
		let default_id = self.default_project_id(caller_id).await?;
		let mut projects = self
			.store
			.list_projects_for_owner(caller_id)
			.await
			.map_err(store_failure("list_projects", None, caller_id))?;

		if let Some(default) = self
			.store
			.get_project(default_id)
			.await
			.map_err(store_failure("list_projects", Some(default_id), caller_id))?
		{
			projects.push(default);
		}

		let mut summaries = Vec::with_capacity(projects.len());

		for project in projects {
			let force_count = self
				.store
				.count_forces(ForceScope::InProject(project.project_id))
				.await
				.map_err(store_failure("list_projects", Some(project.project_id), caller_id))?;

			summaries.push(ProjectSummary::new(project, force_count));
		}

		Ok(summaries)
	}

	/// Deletes a caller-owned project along with its forces and clusters.
	pub async fn delete_project(&self, caller_id: Uuid, project_id: Uuid) -> Result<()> {
		let project = self.owned_project(caller_id, project_id, "delete_project").await?;

		if project.is_default {
			return Err(Error::InvalidRequest {
				message: "The default project cannot be deleted.".to_string(),
			});
		}

		self.store
			.delete_project(project_id)
			.await
			.map_err(store_failure("delete_project", Some(project_id), caller_id))?;

		tracing::info!(project_id = %project_id, caller_id = %caller_id, "Deleted project.");

		Ok(())
	}

	pub async fn add_force(
		&self,
		caller_id: Uuid,
		project_id: Uuid,
		input: NewForce,
	) -> Result<Uuid> {
		self.owned_project(caller_id, project_id, "add_force").await?;

		let force = build_force(project_id, input, OffsetDateTime::now_utc())?;

		self.authorize_resource(caller_id, Resource::Forces).await?;
		self.store
			.insert_force(&force)
			.await
			.map_err(store_failure("add_force", Some(project_id), caller_id))?;

		Ok(force.force_id)
	}

	/// Looks up the default project, repairing first when there is not exactly one default or
	/// when orphaned forces are waiting to be adopted.
	async fn default_project_id(&self, caller_id: Uuid) -> Result<Uuid> {
		let defaults = self
			.store
			.list_default_projects()
			.await
			.map_err(store_failure("default_project_id", None, caller_id))?;

		if defaults.len() == 1 {
			let orphans = self
				.store
				.count_forces(ForceScope::Orphaned)
				.await
				.map_err(store_failure("default_project_id", None, caller_id))?;

			if orphans == 0 {
				return Ok(defaults[0].project_id);
			}
		}

		match self.ensure_default_project_invariant().await {
			Ok(report) =>
				if let Some(project_id) = report.default_project_id {
					return Ok(project_id);
				},
			Err(err) => {
				tracing::warn!(
					caller_id = %caller_id,
					defaults_found = defaults.len(),
					error = %err,
					"Default project repair failed. Continuing with the newest default."
				);
			},
		}

		defaults
			.first()
			.map(|project| project.project_id)
			.ok_or_else(|| Error::NotFound { message: "No default project exists.".to_string() })
	}

	async fn create_default_project(&self) -> Result<(Uuid, DefaultOrigin)> {
		let now = OffsetDateTime::now_utc();
		let name = self.cfg.projects.default_project_name.as_str();
		let project = Project {
			project_id: Uuid::new_v4(),
			owner_id: None,
			name: name.to_string(),
			is_default: true,
			created_at: now,
			updated_at: now,
		};

		match self.store.insert_project(&project).await {
			Ok(()) => Ok((project.project_id, DefaultOrigin::Created)),
			Err(orion_storage::Error::Conflict(message)) => {
				// A concurrent repair may have created it first.
				if let Some(existing) = self.store.list_default_projects().await?.first() {
					return Ok((existing.project_id, DefaultOrigin::Existing));
				}

				// Otherwise an unflagged ownerless project holds the name. Adopt it.
				let Some(existing) = self.store.find_project_by_name(None, name).await? else {
					return Err(Error::DuplicateName { name: message });
				};

				self.store.set_project_default(existing.project_id, true).await?;

				tracing::info!(
					project_id = %existing.project_id,
					name,
					"Promoted existing ownerless project to default."
				);

				Ok((existing.project_id, DefaultOrigin::Promoted))
			},
			Err(err) => Err(err.into()),
		}
	}

	async fn verify_default_invariant(&self, default_id: Uuid) -> Result<bool> {
		let defaults = self.store.list_default_projects().await?.len();
		let orphans = self.store.count_forces(ForceScope::Orphaned).await?;
		let total = self.store.count_forces(ForceScope::All).await?;
		let in_default = self.store.count_forces(ForceScope::InProject(default_id)).await?;
		let outside_defaults = self.store.count_forces(ForceScope::OutsideDefaults).await?;
		let verified = defaults == 1 && orphans == 0 && in_default + outside_defaults == total;

		if !verified {
			tracing::error!(
				default_project_id = %default_id,
				defaults,
				orphans,
				total,
				in_default,
				outside_defaults,
				"Default project invariant still violated after repair."
			);
		}

		Ok(verified)
	}

	async fn owned_project(
		&self,
		caller_id: Uuid,
		project_id: Uuid,
		operation: &'static str,
	) -> Result<Project> {
		let Some(project) = self
			.store
			.get_project(project_id)
			.await
			.map_err(store_failure(operation, Some(project_id), caller_id))?
		else {
			return Err(Error::NotFound { message: format!("Project {project_id} does not exist.") });
		};

		if project.owner_id != Some(caller_id) {
			return Err(Error::AccessDenied { project_id, caller_id });
		}

		Ok(project)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultOrigin {
	Created,
	Promoted,
	Existing,
}

fn build_force(project_id: Uuid, input: NewForce, now: OffsetDateTime) -> Result<Force> {
	let title = input.title.trim();

	if title.is_empty() {
		return Err(Error::InvalidRequest { message: "Force title must be non-empty.".to_string() });
	}

	let Some(force_type) = ForceType::parse(&input.force_type) else {
		return Err(Error::InvalidRequest {
			message: format!("Unknown force type {:?}.", input.force_type),
		});
	};
	let steep_category = match input.steep_category.as_deref().map(str::trim) {
		None | Some("") => None,
		Some(raw) => Some(
			force::normalize_steep_category(raw)
				.ok_or_else(|| Error::InvalidRequest {
					message: format!("Unknown STEEP category {raw:?}."),
				})?
				.to_string(),
		),
	};

	for (field, value) in [
		("impact", input.impact),
		("magnitude", input.magnitude),
		("distance", input.distance),
		("feasibility", input.feasibility),
		("urgency", input.urgency),
	] {
		if let Some(value) = value
			&& !force::attribute_in_range(value)
		{
			return Err(Error::InvalidRequest {
				message: format!(
					"{field} must be between {} and {}.",
					force::ATTRIBUTE_MIN,
					force::ATTRIBUTE_MAX
				),
			});
		}
	}

	let mut tags: Vec<String> = Vec::with_capacity(input.tags.len());

	for tag in input.tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()) {
		if !tags.iter().any(|existing| existing == tag) {
			tags.push(tag.to_string());
		}
	}

	Ok(Force {
		force_id: Uuid::new_v4(),
		project_id: Some(project_id),
		title: title.to_string(),
		body: input.body,
		force_type: force_type.code().to_string(),
		steep_category,
		impact: input.impact,
		magnitude: input.magnitude,
		distance: input.distance,
		feasibility: input.feasibility,
		urgency: input.urgency,
		tags,
		source: non_blank(input.source),
		sentiment: non_blank(input.sentiment),
		horizon: non_blank(input.horizon),
		created_at: now,
		updated_at: now,
	})
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn input(force_type: &str) -> NewForce {
		NewForce {
			title: "  Desalination at scale ".to_string(),
			force_type: force_type.to_string(),
			steep_category: Some("environmental".to_string()),
			impact: Some(7.5),
			tags: vec!["water".to_string(), " water ".to_string(), String::new()],
			source: Some("  ".to_string()),
			..NewForce::default()
		}
	}

	#[test]
	fn build_force_normalizes_fields() {
		let force = build_force(Uuid::nil(), input("weak signals"), datetime!(2026-01-01 00:00 UTC))
			.unwrap();

		assert_eq!(force.title, "Desalination at scale");
		assert_eq!(force.force_type, "WS");
		assert_eq!(force.steep_category.as_deref(), Some("Environmental"));
		assert_eq!(force.tags, vec!["water".to_string()]);
		assert_eq!(force.source, None);
	}

	#[test]
	fn build_force_rejects_out_of_range_attributes() {
		let mut raw = input("T");

		raw.urgency = Some(11.0);

		let err = build_force(Uuid::nil(), raw, datetime!(2026-01-01 00:00 UTC)).unwrap_err();

		assert!(matches!(err, Error::InvalidRequest { .. }), "{err:?}");
	}

	#[test]
	fn build_force_rejects_unknown_types() {
		let err = build_force(Uuid::nil(), input("X"), datetime!(2026-01-01 00:00 UTC))
			.unwrap_err();

		assert_eq!(err.code(), "INVALID_REQUEST");
	}
}

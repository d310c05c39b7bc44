use sqlx::{PgExecutor, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	filter::{ForceFilter, ForceOrder, Window},
	models::{Cluster, Force, Project, UsageCounter, UserAccount},
	store::ForceScope,
};

const FORCE_COLUMNS: &str = "\
force_id,
	project_id,
	title,
	body,
	force_type,
	steep_category,
	impact,
	magnitude,
	distance,
	feasibility,
	urgency,
	tags,
	source,
	sentiment,
	horizon,
	created_at,
	updated_at";

pub async fn get_project<'e, E>(executor: E, project_id: Uuid) -> Result<Option<Project>>
where
	E: PgExecutor<'e>,
{
	let project = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, owner_id, name, is_default, created_at, updated_at
FROM projects
WHERE project_id = $1",
	)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(project)
}

pub async fn list_projects_for_owner<'e, E>(executor: E, owner_id: Uuid) -> Result<Vec<Project>>
where
	E: PgExecutor<'e>,
{
	let projects = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, owner_id, name, is_default, created_at, updated_at
FROM projects
WHERE owner_id = $1
ORDER BY created_at ASC, project_id ASC",
	)
	.bind(owner_id)
	.fetch_all(executor)
	.await?;

	Ok(projects)
}

pub async fn find_project_by_name<'e, E>(
	executor: E,
	owner_id: Option<Uuid>,
	name: &str,
) -> Result<Option<Project>>
where
	E: PgExecutor<'e>,
{
	let project = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, owner_id, name, is_default, created_at, updated_at
FROM projects
WHERE owner_id IS NOT DISTINCT FROM $1 AND lower(name) = lower($2)",
	)
	.bind(owner_id)
	.bind(name)
	.fetch_optional(executor)
	.await?;

	Ok(project)
}

pub async fn list_default_projects<'e, E>(executor: E) -> Result<Vec<Project>>
where
	E: PgExecutor<'e>,
{
	let projects = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, owner_id, name, is_default, created_at, updated_at
FROM projects
WHERE is_default
ORDER BY created_at DESC, project_id DESC",
	)
	.fetch_all(executor)
	.await?;

	Ok(projects)
}

pub async fn insert_project<'e, E>(executor: E, project: &Project) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO projects (project_id, owner_id, name, is_default, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(project.project_id)
	.bind(project.owner_id)
	.bind(project.name.as_str())
	.bind(project.is_default)
	.bind(project.created_at)
	.bind(project.updated_at)
	.execute(executor)
	.await;

	match result {
		Ok(_) => Ok(()),
		Err(sqlx::Error::Database(err)) if err.is_unique_violation() =>
			Err(Error::Conflict(format!("Project name {:?} is already taken.", project.name))),
		Err(err) => Err(err.into()),
	}
}

pub async fn set_project_default<'e, E>(
	executor: E,
	project_id: Uuid,
	is_default: bool,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE projects
SET is_default = $1, updated_at = now()
WHERE project_id = $2",
	)
	.bind(is_default)
	.bind(project_id)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Project {project_id} does not exist.")));
	}

	Ok(())
}

pub async fn delete_project<'e, E>(executor: E, project_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
		.bind(project_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn count_projects_for_owner<'e, E>(executor: E, owner_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
		.bind(owner_id)
		.fetch_one(executor)
		.await?;

	Ok(count)
}

pub async fn insert_force<'e, E>(executor: E, force: &Force) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO forces (
	{FORCE_COLUMNS}
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
	);

	sqlx::query(&sql)
		.bind(force.force_id)
		.bind(force.project_id)
		.bind(force.title.as_str())
		.bind(force.body.as_str())
		.bind(force.force_type.as_str())
		.bind(force.steep_category.as_deref())
		.bind(force.impact)
		.bind(force.magnitude)
		.bind(force.distance)
		.bind(force.feasibility)
		.bind(force.urgency)
		.bind(&force.tags)
		.bind(force.source.as_deref())
		.bind(force.sentiment.as_deref())
		.bind(force.horizon.as_deref())
		.bind(force.created_at)
		.bind(force.updated_at)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn count_forces<'e, E>(executor: E, scope: ForceScope) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = match scope {
		ForceScope::All =>
			sqlx::query_scalar("SELECT COUNT(*) FROM forces").fetch_one(executor).await?,
		ForceScope::Orphaned =>
			sqlx::query_scalar("SELECT COUNT(*) FROM forces WHERE project_id IS NULL")
				.fetch_one(executor)
				.await?,
		ForceScope::InProject(project_id) =>
			sqlx::query_scalar("SELECT COUNT(*) FROM forces WHERE project_id = $1")
				.bind(project_id)
				.fetch_one(executor)
				.await?,
		ForceScope::OwnedBy(owner_id) => sqlx::query_scalar(
			"\
SELECT COUNT(*)
FROM forces f
JOIN projects p ON p.project_id = f.project_id
WHERE p.owner_id = $1",
		)
		.bind(owner_id)
		.fetch_one(executor)
		.await?,
		ForceScope::OutsideDefaults => sqlx::query_scalar(
			"\
SELECT COUNT(*)
FROM forces f
JOIN projects p ON p.project_id = f.project_id
WHERE NOT p.is_default",
		)
		.fetch_one(executor)
		.await?,
	};

	Ok(count)
}

pub async fn assign_orphan_forces<'e, E>(executor: E, project_id: Uuid) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE forces
SET project_id = $1, updated_at = now()
WHERE project_id IS NULL",
	)
	.bind(project_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

pub async fn reassign_forces<'e, E>(executor: E, from: Uuid, to: Uuid) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE forces
SET project_id = $1, updated_at = now()
WHERE project_id = $2",
	)
	.bind(to)
	.bind(from)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

pub async fn count_matching_forces<'e, E>(executor: E, filter: &ForceFilter) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM forces WHERE project_id = ");

	builder.push_bind(filter.project_id);
	filter.push_conditions(&mut builder);

	let count: i64 = builder.build_query_scalar().fetch_one(executor).await?;

	Ok(count)
}

pub async fn fetch_matching_forces<'e, E>(
	executor: E,
	filter: &ForceFilter,
	order: ForceOrder,
	window: Option<Window>,
) -> Result<Vec<Force>>
where
	E: PgExecutor<'e>,
{
	let mut builder = QueryBuilder::<Postgres>::new(format!(
		"SELECT {FORCE_COLUMNS}\nFROM forces\nWHERE project_id = "
	));

	builder.push_bind(filter.project_id);
	filter.push_conditions(&mut builder);
	builder.push(order.order_by_sql());

	if let Some(window) = window {
		builder.push(" LIMIT ");
		builder.push_bind(to_sql_count(window.limit)?);
		builder.push(" OFFSET ");
		builder.push_bind(to_sql_count(window.offset)?);
	}

	let forces = builder.build_query_as::<Force>().fetch_all(executor).await?;

	Ok(forces)
}

pub async fn insert_cluster<'e, E>(executor: E, cluster: &Cluster) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO clusters (cluster_id, project_id, label, method, member_ids, quality, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(cluster.cluster_id)
	.bind(cluster.project_id)
	.bind(cluster.label.as_str())
	.bind(cluster.method.as_str())
	.bind(&cluster.member_ids)
	.bind(&cluster.quality)
	.bind(cluster.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_clusters<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Cluster>>
where
	E: PgExecutor<'e>,
{
	let clusters = sqlx::query_as::<_, Cluster>(
		"\
SELECT cluster_id, project_id, label, method, member_ids, quality, created_at
FROM clusters
WHERE project_id = $1
ORDER BY created_at ASC, cluster_id ASC",
	)
	.bind(project_id)
	.fetch_all(executor)
	.await?;

	Ok(clusters)
}

pub async fn reassign_clusters<'e, E>(executor: E, from: Uuid, to: Uuid) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("UPDATE clusters SET project_id = $1 WHERE project_id = $2")
		.bind(to)
		.bind(from)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

pub async fn get_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<UserAccount>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, UserAccount>(
		"\
SELECT user_id, subscription_tier, subscription_status, created_at
FROM users
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(user)
}

pub async fn upsert_user<'e, E>(executor: E, user: &UserAccount) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO users (user_id, subscription_tier, subscription_status, created_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (user_id) DO UPDATE
SET
	subscription_tier = EXCLUDED.subscription_tier,
	subscription_status = EXCLUDED.subscription_status",
	)
	.bind(user.user_id)
	.bind(user.subscription_tier.as_str())
	.bind(user.subscription_status.as_str())
	.bind(user.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Single-statement conditional upsert. The `WHERE` on the conflict branch makes the increment a
/// no-op once the ceiling is reached, in which case no row is returned.
pub async fn increment_usage_if_below<'e, E>(
	executor: E,
	user_id: Uuid,
	period: &str,
	ceiling: Option<i64>,
	reset_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<Option<UsageCounter>>
where
	E: PgExecutor<'e>,
{
	if let Some(ceiling) = ceiling
		&& ceiling <= 0
	{
		return Err(Error::InvalidArgument(format!(
			"Usage ceiling must be positive, got {ceiling}."
		)));
	}

	let counter = sqlx::query_as::<_, UsageCounter>(
		"\
INSERT INTO usage_counters (user_id, period, count, reset_at, updated_at)
VALUES ($1, $2, 1, $3, $4)
ON CONFLICT (user_id, period) DO UPDATE
SET
	count = usage_counters.count + 1,
	updated_at = EXCLUDED.updated_at
WHERE $5::BIGINT IS NULL OR usage_counters.count < $5::BIGINT
RETURNING user_id, period, count, reset_at, updated_at",
	)
	.bind(user_id)
	.bind(period)
	.bind(reset_at)
	.bind(now)
	.bind(ceiling)
	.fetch_optional(executor)
	.await?;

	Ok(counter)
}

pub async fn get_usage<'e, E>(
	executor: E,
	user_id: Uuid,
	period: &str,
) -> Result<Option<UsageCounter>>
where
	E: PgExecutor<'e>,
{
	let counter = sqlx::query_as::<_, UsageCounter>(
		"\
SELECT user_id, period, count, reset_at, updated_at
FROM usage_counters
WHERE user_id = $1 AND period = $2",
	)
	.bind(user_id)
	.bind(period)
	.fetch_optional(executor)
	.await?;

	Ok(counter)
}

fn to_sql_count(value: u64) -> Result<i64> {
	i64::try_from(value)
		.map_err(|_| Error::InvalidArgument(format!("Window value {value} is out of range.")))
}

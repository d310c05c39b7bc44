use std::sync::Arc;

use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use orion_domain::query::TextQuery;
use orion_storage::{
	EntityStore, Error, ForceFilter, ForceOrder, ForceScope, SortDirection, SortField, Window,
	memory::MemoryStore,
	models::{Cluster, Force, Project},
};

fn project(owner_id: Option<Uuid>, name: &str, is_default: bool, at: OffsetDateTime) -> Project {
	Project {
		project_id: Uuid::new_v4(),
		owner_id,
		name: name.to_string(),
		is_default,
		created_at: at,
		updated_at: at,
	}
}

fn force(project_id: Option<Uuid>, title: &str, force_type: &str, impact: Option<f64>) -> Force {
	let at = datetime!(2026-03-01 12:00 UTC);

	Force {
		force_id: Uuid::new_v4(),
		project_id,
		title: title.to_string(),
		body: String::new(),
		force_type: force_type.to_string(),
		steep_category: Some("Technological".to_string()),
		impact,
		magnitude: None,
		distance: None,
		feasibility: None,
		urgency: None,
		tags: Vec::new(),
		source: None,
		sentiment: None,
		horizon: None,
		created_at: at,
		updated_at: at,
	}
}

#[tokio::test]
async fn duplicate_project_names_conflict_case_insensitively_per_owner() {
	let store = MemoryStore::new();
	let owner = Uuid::new_v4();
	let at = datetime!(2026-01-01 00:00 UTC);

	store.insert_project(&project(Some(owner), "Horizon Scan", false, at)).await.unwrap();

	let err = store
		.insert_project(&project(Some(owner), "horizon scan", false, at))
		.await
		.expect_err("Expected a name conflict.");

	assert!(matches!(err, Error::Conflict(_)), "{err:?}");

	store
		.insert_project(&project(Some(Uuid::new_v4()), "Horizon Scan", false, at))
		.await
		.expect("Another owner may reuse the name.");

	assert_eq!(store.count_projects_for_owner(owner).await.unwrap(), 1);
}

#[tokio::test]
async fn project_names_resolve_within_the_owner_namespace() {
	let store = MemoryStore::new();
	let owner = Uuid::new_v4();
	let at = datetime!(2026-01-01 00:00 UTC);
	let unowned = project(None, "Shared Catalog", false, at);

	store.insert_project(&unowned).await.unwrap();
	store.insert_project(&project(Some(owner), "Shared Catalog", false, at)).await.unwrap();

	let found = store.find_project_by_name(None, "shared catalog").await.unwrap();

	assert_eq!(found.map(|project| project.project_id), Some(unowned.project_id));

	let owned = store.find_project_by_name(Some(owner), "SHARED CATALOG").await.unwrap();

	assert_eq!(owned.and_then(|project| project.owner_id), Some(owner));
	assert!(store.find_project_by_name(None, "Missing").await.unwrap().is_none());
}

#[tokio::test]
async fn default_projects_are_listed_newest_first() {
	let store = MemoryStore::new();
	let older = project(None, "Shared A", true, datetime!(2025-01-01 00:00 UTC));
	let newer = project(None, "Shared B", true, datetime!(2026-01-01 00:00 UTC));

	store.insert_project(&older).await.unwrap();
	store.insert_project(&newer).await.unwrap();

	let defaults = store.list_default_projects().await.unwrap();
	let ids: Vec<Uuid> = defaults.iter().map(|project| project.project_id).collect();

	assert_eq!(ids, vec![newer.project_id, older.project_id]);
}

#[tokio::test]
async fn orphan_assignment_and_scoped_counts_agree() {
	let store = MemoryStore::new();
	let at = datetime!(2026-01-01 00:00 UTC);
	let shared = project(None, "Shared", true, at);
	let owner = Uuid::new_v4();
	let mine = project(Some(owner), "Mine", false, at);

	store.insert_project(&shared).await.unwrap();
	store.insert_project(&mine).await.unwrap();

	for idx in 0..3 {
		store.insert_force(&force(None, &format!("orphan {idx}"), "T", None)).await.unwrap();
	}

	store.insert_force(&force(Some(mine.project_id), "owned", "M", None)).await.unwrap();

	assert_eq!(store.count_forces(ForceScope::Orphaned).await.unwrap(), 3);
	assert_eq!(store.assign_orphan_forces(shared.project_id).await.unwrap(), 3);
	assert_eq!(store.count_forces(ForceScope::Orphaned).await.unwrap(), 0);
	assert_eq!(store.count_forces(ForceScope::InProject(shared.project_id)).await.unwrap(), 3);
	assert_eq!(store.count_forces(ForceScope::OutsideDefaults).await.unwrap(), 1);
	assert_eq!(store.count_forces(ForceScope::OwnedBy(owner)).await.unwrap(), 1);
	assert_eq!(store.count_forces(ForceScope::All).await.unwrap(), 4);
}

#[tokio::test]
async fn deleting_a_project_cascades_to_forces_and_clusters() {
	let store = MemoryStore::new();
	let owned = project(Some(Uuid::new_v4()), "Scratch", false, datetime!(2026-01-01 00:00 UTC));
	let member = force(Some(owned.project_id), "member", "T", Some(5.0));

	store.insert_project(&owned).await.unwrap();
	store.insert_force(&member).await.unwrap();
	store
		.insert_cluster(&Cluster {
			cluster_id: Uuid::new_v4(),
			project_id: owned.project_id,
			label: "Energy".to_string(),
			method: "kmeans".to_string(),
			member_ids: vec![member.force_id],
			quality: serde_json::json!({ "silhouette": 0.4 }),
			created_at: datetime!(2026-01-02 00:00 UTC),
		})
		.await
		.unwrap();

	assert!(store.delete_project(owned.project_id).await.unwrap());
	assert!(!store.delete_project(owned.project_id).await.unwrap());
	assert_eq!(store.count_forces(ForceScope::All).await.unwrap(), 0);
	assert!(store.list_clusters(owned.project_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn filtered_fetch_orders_and_windows_rows() {
	let store = MemoryStore::new();
	let shared = project(None, "Shared", true, datetime!(2026-01-01 00:00 UTC));

	store.insert_project(&shared).await.unwrap();

	for (title, force_type, impact) in [
		("Solar adoption", "T", Some(6.0)),
		("Grid storage", "T", Some(9.0)),
		("Fusion pilot", "WC", None),
		("Solar signal", "S", Some(8.0)),
	] {
		store.insert_force(&force(Some(shared.project_id), title, force_type, impact)).await.unwrap();
	}

	let mut filter = ForceFilter::for_project(shared.project_id);

	filter.exclude_types = vec!["S".to_string()];

	let order = ForceOrder::new(SortField::Impact, SortDirection::Desc);
	let rows = store.fetch_matching_forces(&filter, order, None).await.unwrap();
	let titles: Vec<&str> = rows.iter().map(|force| force.title.as_str()).collect();

	assert_eq!(titles, vec!["Grid storage", "Solar adoption", "Fusion pilot"]);
	assert_eq!(store.count_matching_forces(&filter).await.unwrap(), 3);

	let page = store
		.fetch_matching_forces(&filter, order, Some(Window { offset: 1, limit: 1 }))
		.await
		.unwrap();

	assert_eq!(page.len(), 1);
	assert_eq!(page[0].title, "Solar adoption");

	filter.text = TextQuery::parse("solar");

	assert_eq!(store.count_matching_forces(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn usage_increment_stops_at_the_ceiling() {
	let store = MemoryStore::new();
	let user = Uuid::new_v4();
	let now = datetime!(2026-05-10 08:00 UTC);
	let reset_at = datetime!(2026-06-01 00:00 UTC);

	for expected in 1..=2 {
		let counter = store
			.increment_usage_if_below(user, "2026-05", Some(2), reset_at, now)
			.await
			.unwrap()
			.expect("Expected an increment below the ceiling.");

		assert_eq!(counter.count, expected);
	}

	let denied = store
		.increment_usage_if_below(user, "2026-05", Some(2), reset_at, now + Duration::minutes(1))
		.await
		.unwrap();

	assert!(denied.is_none());
	assert_eq!(store.get_usage(user, "2026-05").await.unwrap().unwrap().count, 2);

	let next_month = store
		.increment_usage_if_below(user, "2026-06", Some(2), reset_at, now)
		.await
		.unwrap()
		.unwrap();

	assert_eq!(next_month.count, 1);
}

#[tokio::test]
async fn usage_increment_rejects_non_positive_ceilings() {
	let store = MemoryStore::new();
	let now = datetime!(2026-05-10 08:00 UTC);
	let err = store
		.increment_usage_if_below(Uuid::new_v4(), "2026-05", Some(0), now, now)
		.await
		.expect_err("Expected a zero ceiling to be rejected.");

	assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_never_exceed_the_ceiling() {
	let store = Arc::new(MemoryStore::new());
	let user = Uuid::new_v4();
	let now = datetime!(2026-05-10 08:00 UTC);
	let reset_at = datetime!(2026-06-01 00:00 UTC);
	let mut handles = Vec::new();

	for _ in 0..32 {
		let store = Arc::clone(&store);

		handles.push(tokio::spawn(async move {
			store.increment_usage_if_below(user, "2026-05", Some(5), reset_at, now).await
		}));
	}

	let mut granted = 0;

	for handle in handles {
		if handle.await.unwrap().unwrap().is_some() {
			granted += 1;
		}
	}

	assert_eq!(granted, 5);
	assert_eq!(store.get_usage(user, "2026-05").await.unwrap().unwrap().count, 5);
}

use std::sync::Arc;

use time::macros::datetime;
use uuid::Uuid;

use orion_config::{Config, Postgres, Projects, Search, Service, Storage, Tiers};
use orion_service::{Error, OrionService, SearchQuery};
use orion_storage::models::{Force, UserAccount};
use orion_testkit::TestDatabase;

fn test_config(dsn: String, ai_limit: i64) -> Config {
	let mut tiers = Tiers::default();

	tiers.basic.max_ai_queries_per_month = ai_limit;

	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 8 } },
		projects: Projects::default(),
		search: Search::default(),
		tiers,
	}
}

async fn seed_user(service: &OrionService, tier: &str) -> Uuid {
	let user = UserAccount {
		user_id: Uuid::new_v4(),
		subscription_tier: tier.to_string(),
		subscription_status: "active".to_string(),
		created_at: datetime!(2026-01-01 00:00 UTC),
	};

	service.store.upsert_user(&user).await.expect("Failed to seed user.");

	user.user_id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set ORION_PG_DSN to run."]
async fn startup_repair_and_quota_against_postgres() {
	let Some(base_dsn) = orion_testkit::env_dsn() else {
		eprintln!("Skipping startup_repair_and_quota_against_postgres; set ORION_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = OrionService::connect(test_config(test_db.dsn().to_string(), 4))
		.await
		.expect("Failed to connect service.");

	for (title, force_type) in [("Orphaned trend", "T"), ("Orphaned signal", "S")] {
		let at = datetime!(2026-02-01 00:00 UTC);

		service
			.store
			.insert_force(&Force {
				force_id: Uuid::new_v4(),
				project_id: None,
				title: title.to_string(),
				body: String::new(),
				force_type: force_type.to_string(),
				steep_category: None,
				impact: Some(4.0),
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
			})
			.await
			.expect("Failed to seed force.");
	}

	let report = service.startup().await.unwrap().expect("Repair runs on startup by default.");

	assert!(report.default_created);
	assert_eq!(report.orphans_assigned, 2);
	assert!(report.verified);

	let caller = seed_user(&service, "basic").await;
	let response = service.search(SearchQuery::default(), caller).await.unwrap();

	assert_eq!(response.total, 1);
	assert_eq!(Some(response.effective_project_id), report.default_project_id);

	let service = Arc::new(service);
	let now = datetime!(2026-05-10 08:00 UTC);
	let mut handles = Vec::new();

	for _ in 0..12 {
		let service = Arc::clone(&service);

		handles.push(tokio::spawn(async move { service.increment_ai_usage_at(caller, now).await }));
	}

	let mut granted = 0;

	for handle in handles {
		match handle.await.unwrap() {
			Ok(_) => granted += 1,
			Err(Error::AiUsageLimitExceeded { .. }) => {},
			Err(err) => panic!("Unexpected error: {err:?}"),
		}
	}

	assert_eq!(granted, 4);

	drop(service);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

//! Operator commands over the ORION core: schema bootstrap, invariant repair, subscription
//! management, capability and quota inspection, and ad hoc search.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use orion_domain::tier::Tier;
use orion_service::{OrionService, SearchQuery};
use orion_storage::models::UserAccount;

#[derive(Debug, Parser)]
#[command(
	version = orion_cli::VERSION,
	rename_all = "kebab",
	styles = orion_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Create the schema if needed, then repair the default project invariant.
	Bootstrap,
	/// Repair the default project invariant. Like every command, this first creates any missing
	/// schema objects.
	Repair,
	/// Create or update a user's subscription.
	SetSubscription {
		#[arg(long, value_name = "UUID")]
		user: Uuid,
		#[arg(long, value_parser = parse_tier)]
		tier: Tier,
		#[arg(long, default_value = "active")]
		status: String,
	},
	Capabilities {
		#[arg(long, value_name = "UUID")]
		user: Uuid,
	},
	/// Show the current month's AI usage, or consume one query with `--consume`.
	AiUsage {
		#[arg(long, value_name = "UUID")]
		user: Uuid,
		#[arg(long)]
		consume: bool,
	},
	CreateProject {
		#[arg(long, value_name = "UUID")]
		user: Uuid,
		#[arg(long)]
		name: String,
	},
	ListProjects {
		#[arg(long, value_name = "UUID")]
		user: Uuid,
	},
	/// Run a search as `user`. The request is a camelCase JSON search query.
	Search {
		#[arg(long, value_name = "UUID")]
		user: Uuid,
		#[arg(long, value_name = "JSON", default_value = "{}")]
		request: String,
	},
}

impl Command {
	/// Bootstrap and repair run the repair themselves and print its report.
	pub fn runs_startup_repair(&self) -> bool {
		!matches!(self, Self::Bootstrap | Self::Repair)
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = orion_config::load(&args.config)?;

	orion_cli::init_tracing(&config.service.log_level)?;

	let service = OrionService::connect(config).await?;

	if args.command.runs_startup_repair()
		&& let Some(report) = service.startup().await?
		&& !report.verified
	{
		tracing::warn!("Startup repair left the default project invariant unverified.");
	}

	match args.command {
		Command::Bootstrap => {
			let report = service.ensure_default_project_invariant().await?;

			if !report.verified {
				tracing::warn!("Bootstrap finished with an unverified default project invariant.");
			}

			print_json(&report)
		},
		Command::Repair => print_json(&service.ensure_default_project_invariant().await?),
		Command::SetSubscription { user, tier, status } => {
			let account = UserAccount {
				user_id: user,
				subscription_tier: tier.as_str().to_string(),
				subscription_status: status.trim().to_ascii_lowercase(),
				created_at: OffsetDateTime::now_utc(),
			};

			service.store.upsert_user(&account).await?;

			print_json(&service.get_user_capabilities(user).await?)
		},
		Command::Capabilities { user } => print_json(&service.get_user_capabilities(user).await?),
		Command::AiUsage { user, consume: true } =>
			print_json(&service.increment_ai_usage(user).await?),
		Command::AiUsage { user, consume: false } =>
			print_json(&service.ai_usage_status(user).await?),
		Command::CreateProject { user, name } =>
			print_json(&service.create_project(user, &name).await?),
		Command::ListProjects { user } => print_json(&service.list_projects(user).await?),
		Command::Search { user, request } => {
			let query = parse_search_request(&request)?;

			print_json(&service.search(query, user).await?)
		},
	}
}

pub fn parse_search_request(raw: &str) -> color_eyre::Result<SearchQuery> {
	serde_json::from_str(raw).map_err(|err| eyre::eyre!("Invalid search request: {err}."))
}

fn parse_tier(raw: &str) -> Result<Tier, String> {
	Tier::parse(raw).ok_or_else(|| format!("unknown tier {raw:?}; expected basic, pro, or enterprise"))
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}

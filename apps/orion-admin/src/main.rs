use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = orion_admin::Args::parse();

	orion_admin::run(args).await
}

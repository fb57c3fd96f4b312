use clap::Parser;

use finsight_api::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	finsight_api::run(args).await
}

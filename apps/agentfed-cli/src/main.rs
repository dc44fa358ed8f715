use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = agentfed::Args::parse();
	agentfed::run(args).await
}

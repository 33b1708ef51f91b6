use clap::Parser;
use jsinspector_cli::{app, cli::Cli, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = app::run(cli).await {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = packager connection state changes and failures only
	// 1 (-v) = sessions and pages
	// 2+ (-vv) = every CDP request
	let filter = match verbosity {
		0 => "warn,jsinspector=info",
		1 => "info,jsinspector=debug",
		_ => "trace",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

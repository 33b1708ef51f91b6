use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid packager address {address}: {source}")]
	PackagerUrl {
		address: String,
		#[source]
		source: url::ParseError,
	},

	#[error("host loop stopped before shutdown finished")]
	Shutdown,

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

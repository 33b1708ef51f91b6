use clap::Parser;
use jsinspector::{InspectorFlags, PackagerConnectionConfig};
use url::Url;

use crate::error::{CliError, Result};

#[derive(Parser, Debug)]
#[command(name = "jsinspector")]
#[command(about = "Expose a demo inspector page to a packager's debugger proxy")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v sessions, -vv every CDP message)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Packager host
	#[arg(long, default_value = "localhost")]
	pub host: String,

	/// Packager port
	#[arg(short, long, default_value_t = 8081)]
	pub port: u16,

	/// Device name shown in the debugger's target list
	#[arg(long, default_value = "jsinspector")]
	pub device_name: String,

	/// App name shown in the debugger's target list
	#[arg(long, default_value = "demo")]
	pub app_name: String,

	/// Stable device id, lets the packager keep sessions across restarts
	#[arg(long, value_name = "ID")]
	pub device_id: Option<String>,

	/// Description of the registered page
	#[arg(long, default_value = "Demo host")]
	pub title: String,

	/// Ask the packager to open React Native DevTools for this page
	#[arg(long)]
	pub fusebox: bool,

	/// Report the host as a profiling build
	#[arg(long)]
	pub profiling_build: bool,

	/// Enable the Network domain and file:// resource loading
	#[arg(long)]
	pub network_inspection: bool,
}

impl Cli {
	/// URL of the packager's device endpoint.
	pub fn packager_url(&self) -> Result<Url> {
		let address = format!("ws://{}:{}/inspector/device", self.host, self.port);
		let mut url = Url::parse(&address).map_err(|source| CliError::PackagerUrl { address, source })?;
		{
			let mut query = url.query_pairs_mut();
			query.append_pair("name", &self.device_name);
			query.append_pair("app", &self.app_name);
			if let Some(device_id) = &self.device_id {
				query.append_pair("device", device_id);
			}
		}
		Ok(url)
	}

	pub fn connection_config(&self) -> Result<PackagerConnectionConfig> {
		Ok(PackagerConnectionConfig::new(
			self.packager_url()?.as_str(),
			self.device_name.as_str(),
			self.app_name.as_str(),
		))
	}

	pub fn flags(&self) -> InspectorFlags {
		InspectorFlags {
			fusebox_enabled: self.fusebox,
			is_profiling_build: self.profiling_build,
			network_inspection_enabled: self.network_inspection,
		}
	}
}

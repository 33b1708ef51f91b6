//! Inspector configuration.
//!
//! Both structs deserialize from partial JSON/TOML with defaults, so hosts can
//! load them from whatever configuration source they already have.

use serde::{Deserialize, Serialize};

/// Feature toggles consulted by the host agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectorFlags {
	/// The frontend is the Fusebox (React Native DevTools) client.
	pub fusebox_enabled: bool,
	/// Reported to the frontend in `ReactNativeApplication.metadataUpdated`.
	pub is_profiling_build: bool,
	/// Enables the `Network` domain.
	pub network_inspection_enabled: bool,
}

/// Where and as whom the packager connection registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagerConnectionConfig {
	/// Full WebSocket URL of the packager's device endpoint.
	pub url: String,
	pub device_name: String,
	pub app_name: String,
}

impl PackagerConnectionConfig {
	pub fn new(url: impl Into<String>, device_name: impl Into<String>, app_name: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			device_name: device_name.into(),
			app_name: app_name.into(),
		}
	}
}

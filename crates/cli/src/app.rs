use std::pin::pin;
use std::sync::Arc;

use anyhow::Context;
use jsinspector::{
	ConnectFunc, HostTarget, HostTargetMetadata, InspectorPackagerConnection, LocalConnection, RemoteConnection,
	TaskQueue, TokioPackagerDelegate, VoidExecutor, default_inspector,
};
use jsinspector_protocol::InspectorTargetCapabilities;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::cli::Cli;
use crate::demo::{DemoApp, DemoHost, HostEvent, parse_binding_call};
use crate::error::CliError;

const VM_NAME: &str = "demo";

fn on_queue(executor: &VoidExecutor, task: impl FnOnce() + Send + 'static) {
	executor(Box::new(task));
}

/// Runs the demo host until Ctrl-C.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
	let config = cli.connection_config()?;
	let flags = cli.flags();
	let handle = Handle::current();
	let queue = TaskQueue::spawn(&handle);
	let executor = queue.executor();

	let (events_tx, mut events) = mpsc::unbounded_channel();
	let metadata = HostTargetMetadata {
		app_display_name: Some(cli.app_name.clone()),
		app_identifier: Some(cli.app_name.clone()),
		device_name: Some(cli.device_name.clone()),
		integration_name: Some("jsinspector-cli".to_string()),
		platform: Some(std::env::consts::OS.to_string()),
		react_native_version: None,
	};
	let host = HostTarget::create_with_flags(
		Arc::new(DemoHost::new(metadata, handle.clone(), events_tx.clone())),
		Arc::clone(&executor),
		flags,
	);
	let app = Arc::new(DemoApp::new(Arc::clone(&host), Arc::clone(&executor)));
	on_queue(&executor, {
		let app = Arc::clone(&app);
		move || app.load()
	});

	let inspector = default_inspector();
	let connect_func: ConnectFunc = Arc::new(move |remote: Box<dyn RemoteConnection>| -> Option<Box<dyn LocalConnection>> {
		Some(host.connect(remote))
	});
	let page_id = inspector.add_page(
		&cli.title,
		VM_NAME,
		connect_func,
		InspectorTargetCapabilities {
			native_page_reloads: true,
			native_source_code_fetching: flags.network_inspection_enabled,
			prefers_fusebox_frontend: flags.fusebox_enabled,
		},
	);

	let connection = Arc::new(InspectorPackagerConnection::new(
		config,
		Arc::clone(&inspector),
		Arc::new(TokioPackagerDelegate::new(handle.clone(), Arc::clone(&executor))),
	));
	on_queue(&executor, {
		let connection = Arc::clone(&connection);
		move || connection.connect()
	});
	tracing::info!(target = "jsinspector", page_id, url = %cli.packager_url()?, "inspector page registered");

	spawn_stdin_reader(&handle, events_tx);

	let mut shutdown = pin!(tokio::signal::ctrl_c());
	loop {
		tokio::select! {
			result = &mut shutdown => {
				result.context("failed to listen for Ctrl-C")?;
				break;
			}
			event = events.recv() => match event {
				Some(HostEvent::Reload) => on_queue(&executor, {
					let app = Arc::clone(&app);
					move || app.reload()
				}),
				Some(HostEvent::CallBinding { name, payload }) => on_queue(&executor, {
					let app = Arc::clone(&app);
					move || {
						if !app.runtime().call_binding(&name, &payload) {
							tracing::warn!(target = "jsinspector", binding = %name, "no frontend has added this binding");
						}
					}
				}),
				None => break,
			},
		}
	}

	tracing::info!(target = "jsinspector", "shutting down");
	let (done_tx, done_rx) = oneshot::channel();
	on_queue(&executor, move || {
		connection.close_quietly();
		// Closes every session before the page and its host go away.
		drop(connection);
		inspector.remove_page(page_id);
		app.unload();
		let _ = done_tx.send(());
	});
	done_rx.await.map_err(|_| CliError::Shutdown)?;
	Ok(())
}

/// Forwards `<binding> <payload>` lines from stdin to the main loop.
fn spawn_stdin_reader(handle: &Handle, events: mpsc::UnboundedSender<HostEvent>) {
	handle.spawn(async move {
		let mut lines = BufReader::new(tokio::io::stdin()).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			let Some(event) = parse_binding_call(&line) else {
				continue;
			};
			if events.send(event).is_err() {
				break;
			}
		}
	});
}

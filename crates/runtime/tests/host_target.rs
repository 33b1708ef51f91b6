mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{
	Frontend, MockHostDelegate, MockInstanceDelegate, MockRuntimeDelegate, immediate_executor, methods, request,
};
use jsinspector::{HostCommand, HostTarget, HostTargetMetadata, InspectorFlags, LocalConnection, RuntimeTarget};
use serde_json::{Value, json};

struct Fixture {
	delegate: Arc<MockHostDelegate>,
	host: Arc<HostTarget>,
}

impl Fixture {
	fn new() -> Self {
		Self::with_delegate(MockHostDelegate::default(), InspectorFlags::default())
	}

	fn with_delegate(delegate: MockHostDelegate, flags: InspectorFlags) -> Self {
		let delegate = Arc::new(delegate);
		let host = HostTarget::create_with_flags(delegate.clone(), immediate_executor(), flags);
		Self { delegate, host }
	}

	fn connect(&self) -> (Frontend, Box<dyn LocalConnection>) {
		let frontend = Frontend::default();
		let local = self.host.connect(frontend.remote());
		(frontend, local)
	}
}

fn send(local: &dyn LocalConnection, id: i64, method: &str, params: Value) {
	local.send_message(request(id, method, params));
}

#[test]
fn test_unknown_method_reports_method_not_found() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "FakeDomain.fakeMethod", Value::Null);
	let messages = frontend.take();
	assert_eq!(messages.len(), 1);
	assert_eq!(messages[0]["id"], 1);
	assert_eq!(messages[0]["error"]["code"], -32601);
	assert_eq!(messages[0]["error"]["message"], "Unsupported method 'FakeDomain.fakeMethod'");
}

#[test]
fn test_malformed_messages_report_protocol_errors() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	local.send_message("not json".to_string());
	local.send_message(r#"{"method": "Log.enable"}"#.to_string());
	local.send_message(r#"{"id": 3, "method": "Page.reload", "params": {"ignoreCache": "yes"}}"#.to_string());

	let messages = frontend.take();
	assert_eq!(messages[0]["id"], Value::Null);
	assert_eq!(messages[0]["error"]["code"], -32700);
	assert_eq!(messages[1]["id"], Value::Null);
	assert_eq!(messages[1]["error"]["code"], -32600);
	assert_eq!(messages[2]["id"], 3);
	assert_eq!(messages[2]["error"]["code"], -32600);
	assert!(fixture.delegate.reloads.lock().is_empty());
}

#[test]
fn test_domain_enable_without_instance_succeeds() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Debugger.enable", Value::Null);
	send(local.as_ref(), 2, "Runtime.enable", Value::Null);
	send(local.as_ref(), 3, "Runtime.disable", Value::Null);

	let messages = frontend.take();
	assert_eq!(
		messages,
		vec![
			json!({"id": 1, "result": {}}),
			json!({"id": 2, "result": {}}),
			json!({"id": 3, "result": {}}),
		]
	);
}

#[test]
fn test_network_domain_requires_flag() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();
	send(local.as_ref(), 1, "Network.enable", Value::Null);
	assert_eq!(frontend.take()[0]["error"]["code"], -32601);

	let flags = InspectorFlags {
		network_inspection_enabled: true,
		..InspectorFlags::default()
	};
	let fixture = Fixture::with_delegate(MockHostDelegate::default(), flags);
	let (frontend, local) = fixture.connect();
	send(local.as_ref(), 1, "Network.enable", Value::Null);
	assert_eq!(frontend.take(), vec![json!({"id": 1, "result": {}})]);
}

#[test]
fn test_log_enable_sends_welcome_before_result() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Log.enable", Value::Null);
	let messages = frontend.take();
	assert_eq!(methods(&messages), vec!["Log.entryAdded", "<response>"]);
	assert_eq!(messages[0]["params"]["entry"]["level"], "warning");
	assert_eq!(messages[1], json!({"id": 1, "result": {}}));

	send(local.as_ref(), 2, "FuseboxClient.setClientMetadata", json!({}));
	send(local.as_ref(), 3, "Log.enable", Value::Null);
	let messages = frontend.take();
	assert_eq!(messages[0], json!({"id": 2, "result": {}}));
	assert_eq!(messages[1]["params"]["entry"]["level"], "info");
	assert_eq!(messages[1]["params"]["entry"]["text"], "Welcome to React Native DevTools");
}

#[test]
fn test_page_reload_reaches_delegate() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Page.reload", json!({"ignoreCache": true}));
	assert_eq!(frontend.take(), vec![json!({"id": 1, "result": {}})]);

	let reloads = fixture.delegate.reloads.lock();
	assert_eq!(reloads.len(), 1);
	assert_eq!(reloads[0].ignore_cache, Some(true));
	assert_eq!(reloads[0].script_to_evaluate_on_load, None);
}

#[test]
fn test_paused_overlay_is_shared_between_sessions() {
	let fixture = Fixture::new();
	let (_first_frontend, first) = fixture.connect();
	let (_second_frontend, second) = fixture.connect();
	let set_message = |local: &dyn LocalConnection, message: Option<&str>| {
		let params = match message {
			Some(message) => json!({"message": message}),
			None => json!({}),
		};
		send(local, 1, "Overlay.setPausedInDebuggerMessage", params);
	};

	set_message(first.as_ref(), Some("Paused in first"));
	set_message(second.as_ref(), Some("Paused in second"));
	set_message(first.as_ref(), None);
	assert_eq!(
		*fixture.delegate.overlay_messages.lock(),
		vec![Some("Paused in first".to_string()), Some("Paused in second".to_string())]
	);

	// Dropping the last session showing the overlay hides it.
	drop(second);
	assert_eq!(fixture.delegate.overlay_messages.lock().last(), Some(&None));
	assert_eq!(fixture.delegate.overlay_messages.lock().len(), 3);
}

#[test]
fn test_react_native_application_enable_sends_metadata() {
	let delegate = MockHostDelegate {
		metadata: HostTargetMetadata {
			app_display_name: Some("Demo".to_string()),
			platform: Some("linux".to_string()),
			..HostTargetMetadata::default()
		},
		..MockHostDelegate::default()
	};
	let flags = InspectorFlags {
		is_profiling_build: true,
		..InspectorFlags::default()
	};
	let fixture = Fixture::with_delegate(delegate, flags);
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "ReactNativeApplication.enable", Value::Null);
	let messages = frontend.take();
	assert_eq!(messages[0]["method"], "ReactNativeApplication.metadataUpdated");
	assert_eq!(
		messages[0]["params"],
		json!({
			"appDisplayName": "Demo",
			"platform": "linux",
			"unstable_isProfilingBuild": true,
			"unstable_networkInspectionEnabled": false,
		})
	);
	assert_eq!(messages[1], json!({"id": 1, "result": {}}));
}

fn register_runtime(
	host: &HostTarget,
	runtime_delegate: &Arc<MockRuntimeDelegate>,
) -> (Arc<jsinspector::InstanceTarget>, Arc<RuntimeTarget>) {
	let instance = host.register_instance(Arc::new(MockInstanceDelegate));
	let runtime = instance.register_runtime(runtime_delegate.clone(), immediate_executor());
	(instance, runtime)
}

#[test]
fn test_runtime_enable_announces_execution_context() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (_instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Runtime.enable", Value::Null);
	let messages = frontend.take();
	assert_eq!(
		messages,
		vec![
			json!({
				"method": "Runtime.executionContextCreated",
				"params": {"context": {"id": 1, "origin": "", "name": "main"}},
			}),
			json!({"id": 1, "result": {}}),
		]
	);
	assert_eq!(runtime.execution_context().id, 1);
}

#[test]
fn test_reload_notifies_execution_context_changes_once() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (frontend, local) = fixture.connect();
	let (instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);

	send(local.as_ref(), 1, "Runtime.enable", Value::Null);
	frontend.take();

	instance.unregister_runtime(&runtime);
	fixture.host.unregister_instance(&instance);
	let (_instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);

	let messages = frontend.take();
	assert_eq!(
		methods(&messages),
		vec![
			"Runtime.executionContextDestroyed",
			"Runtime.executionContextsCleared",
			"Runtime.executionContextCreated",
		]
	);
	assert_eq!(messages[0]["params"]["executionContextId"], 1);
	assert_eq!(messages[2]["params"]["context"]["id"], 2);
}

#[test]
fn test_instance_swap_without_runtime_removal_clears_contexts() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (frontend, local) = fixture.connect();
	let (instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);

	send(local.as_ref(), 1, "Runtime.enable", Value::Null);
	frontend.take();

	fixture.host.unregister_instance(&instance);
	assert_eq!(methods(&frontend.take()), vec!["Runtime.executionContextsCleared"]);
}

#[test]
fn test_instance_without_runtime_clears_contexts_on_unregister() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Runtime.enable", Value::Null);
	assert_eq!(frontend.take(), vec![json!({"id": 1, "result": {}})]);

	let instance = fixture.host.register_instance(Arc::new(MockInstanceDelegate));
	assert!(frontend.take().is_empty());
	fixture.host.unregister_instance(&instance);
	assert_eq!(frontend.take(), vec![json!({"method": "Runtime.executionContextsCleared"})]);
}

#[test]
fn test_runtime_swap_within_instance_skips_clear() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (frontend, local) = fixture.connect();
	let (instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);

	send(local.as_ref(), 1, "Runtime.enable", Value::Null);
	frontend.take();

	instance.unregister_runtime(&runtime);
	let _runtime = instance.register_runtime(runtime_delegate.clone(), immediate_executor());
	assert_eq!(
		methods(&frontend.take()),
		vec!["Runtime.executionContextDestroyed", "Runtime.executionContextCreated"]
	);
}

#[test]
fn test_no_context_notifications_while_runtime_disabled() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (frontend, _local) = fixture.connect();

	let (instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);
	instance.unregister_runtime(&runtime);
	fixture.host.unregister_instance(&instance);
	assert!(frontend.take().is_empty());
}

#[test]
fn test_runtime_agent_delegate_handles_engine_methods() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (_instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Debugger.pause", Value::Null);
	assert_eq!(frontend.take(), vec![json!({"id": 1, "result": {}})]);
	assert_eq!(*runtime_delegate.handled_methods.lock(), vec!["Debugger.pause".to_string()]);
}

#[test]
fn test_exported_state_passes_to_next_runtime_agent() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (_frontend, _local) = fixture.connect();

	let (instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);
	instance.unregister_runtime(&runtime);
	let _runtime = instance.register_runtime(runtime_delegate.clone(), immediate_executor());

	assert_eq!(*runtime_delegate.previously_exported.lock(), vec![None, Some(0)]);
}

#[test]
fn test_binding_calls_reach_subscribed_session() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (_instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);
	let (subscribed, subscribed_local) = fixture.connect();
	let (other, _other_local) = fixture.connect();

	send(subscribed_local.as_ref(), 1, "Runtime.addBinding", json!({"name": "__fbBinding"}));
	assert_eq!(subscribed.take(), vec![json!({"id": 1, "result": {}})]);
	assert_eq!(runtime_delegate.installed_binding_names(), vec!["__fbBinding".to_string()]);

	runtime_delegate.call_binding("__fbBinding", "hello");
	assert_eq!(
		subscribed.take(),
		vec![json!({
			"method": "Runtime.bindingCalled",
			"params": {"name": "__fbBinding", "payload": "hello", "executionContextId": runtime.execution_context().id},
		})]
	);
	assert!(other.take().is_empty());

	send(subscribed_local.as_ref(), 2, "Runtime.removeBinding", json!({"name": "__fbBinding"}));
	subscribed.take();
	runtime_delegate.call_binding("__fbBinding", "again");
	assert!(subscribed.take().is_empty());
}

#[test]
fn test_binding_added_before_runtime_is_installed_on_registration() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Runtime.addBinding", json!({"name": "early"}));
	send(local.as_ref(), 2, "Runtime.addBinding", json!({"name": "elsewhere", "executionContextName": "worker"}));
	assert_eq!(
		frontend.take(),
		vec![json!({"id": 1, "result": {}}), json!({"id": 2, "result": {}})]
	);

	let (_instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);
	assert_eq!(runtime_delegate.installed_binding_names(), vec!["early".to_string()]);
}

#[test]
fn test_binding_survives_reload() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (frontend, local) = fixture.connect();
	let (instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);

	send(local.as_ref(), 1, "Runtime.addBinding", json!({"name": "persistent"}));
	instance.unregister_runtime(&runtime);
	fixture.host.unregister_instance(&instance);
	let (_instance, runtime) = register_runtime(&fixture.host, &runtime_delegate);
	frontend.take();

	assert_eq!(
		runtime_delegate.installed_binding_names(),
		vec!["persistent".to_string(), "persistent".to_string()]
	);
	runtime_delegate.call_binding("persistent", "after reload");
	let messages = frontend.take();
	assert_eq!(messages[0]["params"]["executionContextId"], runtime.execution_context().id);
}

#[test]
fn test_add_binding_validates_params_without_instance() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Runtime.addBinding", json!({"name": "b", "executionContextId": 1_i64 << 40}));
	send(
		local.as_ref(),
		2,
		"Runtime.addBinding",
		json!({"name": "b", "executionContextId": 1, "executionContextName": "main"}),
	);
	send(local.as_ref(), 3, "Runtime.addBinding", json!({}));

	let messages = frontend.take();
	assert_eq!(messages[0]["id"], 1);
	assert_eq!(messages[0]["error"]["code"], -32602);
	assert_eq!(messages[1]["id"], 2);
	assert_eq!(messages[1]["error"]["code"], -32602);
	assert_eq!(messages[2]["id"], 3);
	assert_eq!(messages[2]["error"]["code"], -32600);
}

#[test]
fn test_send_command_reaches_runtime() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());

	// Ignored while there is no runtime to take it.
	fixture.host.send_command(HostCommand::DebuggerResume);
	let (_instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);
	fixture.host.send_command(HostCommand::DebuggerResume);
	fixture.host.send_command(HostCommand::DebuggerStepOver);

	assert_eq!(
		*runtime_delegate.handled_methods.lock(),
		vec!["Debugger.resume".to_string(), "Debugger.stepOver".to_string()]
	);
}

#[test]
fn test_tracing_delivers_events_in_chunks() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();
	assert!(!fixture.host.record_trace_event(json!({"name": "dropped"})));

	send(local.as_ref(), 1, "Tracing.start", Value::Null);
	for index in 0..1500 {
		assert!(fixture.host.record_trace_event(json!({"name": "event", "index": index})));
	}
	send(local.as_ref(), 2, "Tracing.end", Value::Null);

	let messages = frontend.take();
	assert_eq!(
		methods(&messages),
		vec![
			"<response>",
			"<response>",
			"Tracing.dataCollected",
			"Tracing.dataCollected",
			"Tracing.tracingComplete",
		]
	);
	assert_eq!(messages[2]["params"]["value"].as_array().unwrap().len(), 1000);
	assert_eq!(messages[3]["params"]["value"].as_array().unwrap().len(), 500);
	assert_eq!(messages[3]["params"]["value"][499]["index"], 1499);
	assert_eq!(messages[4]["params"], json!({"dataLossOccurred": false}));
}

#[test]
fn test_tracing_errors() {
	let fixture = Fixture::new();
	let (first, first_local) = fixture.connect();
	let (second, second_local) = fixture.connect();

	send(first_local.as_ref(), 1, "Tracing.end", Value::Null);
	assert_eq!(first.take()[0]["error"]["code"], -32600);

	send(first_local.as_ref(), 2, "Tracing.start", Value::Null);
	send(first_local.as_ref(), 3, "Tracing.start", Value::Null);
	send(second_local.as_ref(), 4, "Tracing.start", Value::Null);
	let messages = first.take();
	assert_eq!(messages[0], json!({"id": 2, "result": {}}));
	assert_eq!(messages[1]["error"]["code"], -32603);
	assert_eq!(second.take()[0]["error"]["code"], -32603);

	// A session that goes away stops its recording.
	drop(first_local);
	send(second_local.as_ref(), 5, "Tracing.start", Value::Null);
	assert_eq!(second.take(), vec![json!({"id": 5, "result": {}})]);
}

#[test]
fn test_network_resource_streams_through_io() {
	let fixture = Fixture::with_delegate(MockHostDelegate::with_network(), InspectorFlags::default());
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Network.loadNetworkResource", json!({"url": "http://example.test/app.js"}));
	assert!(frontend.take().is_empty());
	assert_eq!(fixture.delegate.network_requests.lock()[0].0, "http://example.test/app.js");

	let listener = fixture.delegate.listener(0);
	let cancelled = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&cancelled);
	listener.execute(move |listener| {
		listener.set_cancel_function(Box::new(move || flag.store(true, Ordering::SeqCst)));
		let headers = BTreeMap::from([("Content-Type".to_string(), "text/javascript".to_string())]);
		listener.on_headers(200, &headers);
	});
	let messages = frontend.take();
	assert_eq!(
		messages,
		vec![json!({
			"id": 1,
			"result": {"resource": {
				"success": true,
				"stream": "0",
				"httpStatusCode": 200,
				"headers": {"Content-Type": "text/javascript"},
			}},
		})]
	);

	// Reads wait for enough data or the end of the stream.
	send(local.as_ref(), 2, "IO.read", json!({"handle": "0", "size": 5}));
	assert!(frontend.take().is_empty());
	listener.execute(|listener| listener.on_data(b"hello world"));
	assert_eq!(
		frontend.take(),
		vec![json!({"id": 2, "result": {"data": "hello", "eof": false, "base64Encoded": false}})]
	);

	listener.execute(|listener| listener.on_completion());
	send(local.as_ref(), 3, "IO.read", json!({"handle": "0"}));
	assert_eq!(
		frontend.take(),
		vec![json!({"id": 3, "result": {"data": " world", "eof": true, "base64Encoded": false}})]
	);

	send(local.as_ref(), 4, "IO.close", json!({"handle": "0"}));
	assert_eq!(frontend.take(), vec![json!({"id": 4, "result": {}})]);
	assert!(cancelled.load(Ordering::SeqCst));

	send(local.as_ref(), 5, "IO.close", json!({"handle": "0"}));
	assert_eq!(frontend.take()[0]["error"]["code"], -32602);
}

#[test]
fn test_binary_network_resource_is_base64_encoded() {
	let fixture = Fixture::with_delegate(MockHostDelegate::with_network(), InspectorFlags::default());
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Network.loadNetworkResource", json!({"url": "http://example.test/logo.png"}));
	let listener = fixture.delegate.listener(0);
	listener.execute(|listener| {
		let headers = BTreeMap::from([("content-type".to_string(), "image/png".to_string())]);
		listener.on_headers(200, &headers);
		listener.on_data(&[0x89, b'P', b'N', b'G']);
		listener.on_completion();
	});
	frontend.take();

	send(local.as_ref(), 2, "IO.read", json!({"handle": "0"}));
	assert_eq!(
		frontend.take(),
		vec![json!({"id": 2, "result": {"data": "iVBORw==", "eof": true, "base64Encoded": true}})]
	);
}

#[test]
fn test_network_resource_failures() {
	let fixture = Fixture::with_delegate(MockHostDelegate::with_network(), InspectorFlags::default());
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Network.loadNetworkResource", json!({"url": "http://example.test/missing"}));
	fixture
		.delegate
		.listener(0)
		.execute(|listener| listener.on_headers(404, &BTreeMap::new()));
	let messages = frontend.take();
	assert_eq!(messages[0]["result"]["resource"]["success"], false);
	assert_eq!(
		messages[0]["result"]["resource"]["netErrorName"],
		"net::ERR_HTTP_RESPONSE_CODE_FAILURE"
	);
	assert_eq!(messages[0]["result"]["resource"]["httpStatusCode"], 404);

	send(local.as_ref(), 2, "IO.read", json!({"handle": "0"}));
	assert_eq!(frontend.take()[0]["error"]["code"], -32602);

	send(local.as_ref(), 3, "Network.loadNetworkResource", json!({"url": "http://unreachable.test/"}));
	fixture
		.delegate
		.listener(1)
		.execute(|listener| listener.on_error("connection reset"));
	let messages = frontend.take();
	assert_eq!(messages[0]["id"], 3);
	assert_eq!(messages[0]["result"]["resource"]["netErrorName"], "net::ERR_FAILED");
}

#[test]
fn test_network_resource_unsupported_by_host() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();

	send(local.as_ref(), 1, "Network.loadNetworkResource", json!({"url": "http://example.test/"}));
	assert_eq!(frontend.take()[0]["error"]["code"], -32601);
}

#[test]
fn test_disconnect_notifies_remote() {
	let fixture = Fixture::new();
	let (frontend, local) = fixture.connect();
	assert!(!frontend.is_disconnected());

	local.disconnect();
	assert!(frontend.is_disconnected());
	send(local.as_ref(), 1, "Log.enable", Value::Null);
	assert!(frontend.take().is_empty());

	let (frontend, local) = fixture.connect();
	drop(local);
	assert!(frontend.is_disconnected());
}

#[test]
#[should_panic(expected = "Only one instance allowed per host target")]
fn test_second_instance_registration_panics() {
	let fixture = Fixture::new();
	let _first = fixture.host.register_instance(Arc::new(MockInstanceDelegate));
	let _second = fixture.host.register_instance(Arc::new(MockInstanceDelegate));
}

#[test]
#[should_panic(expected = "Invalid unregistration")]
fn test_unregistering_foreign_instance_panics() {
	let fixture = Fixture::new();
	let other = Fixture::new();
	let _instance = fixture.host.register_instance(Arc::new(MockInstanceDelegate));
	let foreign = other.host.register_instance(Arc::new(MockInstanceDelegate));
	fixture.host.unregister_instance(&foreign);
}

#[test]
#[should_panic(expected = "Only one runtime allowed per instance target")]
fn test_second_runtime_registration_panics() {
	let fixture = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);
	let _second = instance.register_runtime(runtime_delegate.clone(), immediate_executor());
}

#[test]
#[should_panic(expected = "Invalid unregistration")]
fn test_unregistering_foreign_runtime_panics() {
	let fixture = Fixture::new();
	let other = Fixture::new();
	let runtime_delegate = Arc::new(MockRuntimeDelegate::default());
	let (instance, _runtime) = register_runtime(&fixture.host, &runtime_delegate);
	let (_other_instance, foreign) = register_runtime(&other.host, &runtime_delegate);
	instance.unregister_runtime(&foreign);
}

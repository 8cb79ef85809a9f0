// std
use std::{collections::BTreeMap, env, fs, process, sync::Arc};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::Duration;
// self
use token_foundation::{
	error::{Error, TransportError},
	http::{
		MapRequest, PendingRequest, ReqwestExecutor, RequestOptions, RequestPipeline, UploadFile,
	},
};

fn pipeline() -> RequestPipeline {
	let executor = ReqwestExecutor::new().expect("Default reqwest executor should build.");

	RequestPipeline::new().with_executor(Arc::new(executor))
}

#[tokio::test]
async fn get_sends_query_pairs_and_buffers_the_response() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/token").query_param("appid", "app1").query_param("n", "3");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"XYZ\",\"expires_in\":3600}");
		})
		.await;
	let response = pipeline()
		.get(&server.url("/token"), json!({ "appid": "app1", "n": 3 }))
		.await
		.expect("GET request should succeed.");

	mock.assert_async().await;

	assert!(response.is_success());
	assert_eq!(response.reason, "OK");
	assert_eq!(response.header("Content-Type"), Some("application/json"));

	let body: Value = response.json().expect("Body should decode as JSON.");

	assert_eq!(body["access_token"], "XYZ");
}

#[tokio::test]
async fn post_sends_url_encoded_form() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/form")
				.header("content-type", "application/x-www-form-urlencoded")
				.body("appid=app1&secret=s3cr3t");
			then.status(201);
		})
		.await;
	let response = pipeline()
		.post(&server.url("/form"), json!({ "appid": "app1", "secret": "s3cr3t" }))
		.await
		.expect("Form POST should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status, 201);
}

#[tokio::test]
async fn json_sends_body_and_default_headers() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/json")
				.header("x-client", "token-foundation")
				.json_body(json!({ "touser": "u1", "msgtype": "text" }));
			then.status(200).body("{}");
		})
		.await;
	let pipeline = pipeline().with_default_options(
		RequestOptions::new().with_headers(json!({ "x-client": "token-foundation" })),
	);

	pipeline
		.json(&server.url("/json"), json!({ "touser": "u1", "msgtype": "text" }))
		.await
		.expect("JSON POST should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn upload_sends_multipart_parts_from_disk() {
	let dir = env::temp_dir().join(format!("token_foundation_upload_{}", process::id()));

	fs::create_dir_all(&dir).expect("Upload fixture directory should be created.");

	let doc = dir.join("a.txt");

	fs::write(&doc, b"hello").expect("Upload fixture should be written.");

	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/upload").query_param("type", "file");
			then.status(200).body("{\"media_id\":\"m1\"}");
		})
		.await;
	let files = BTreeMap::from([("media".to_owned(), UploadFile::from(doc.clone()))]);
	let form = BTreeMap::from([("title".to_owned(), "greeting".to_owned())]);
	let response = pipeline()
		.upload(&server.url("/upload"), json!({ "type": "file" }), &files, &form)
		.await
		.expect("Multipart upload should succeed.");

	mock.assert_async().await;

	assert_eq!(response.text(), "{\"media_id\":\"m1\"}");

	fs::remove_dir_all(&dir).unwrap_or_else(|e| {
		panic!("Failed to remove upload fixture directory {}: {e}", dir.display())
	});
}

#[tokio::test]
async fn middleware_changes_reach_the_wire() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/signed").header("x-signature", "abc");
			then.status(204);
		})
		.await;
	let pipeline = pipeline().with_middleware(MapRequest::new(|mut request: PendingRequest| {
		request.options.set_header("x-signature", "abc");

		Ok(request)
	}));
	let response =
		pipeline.get(&server.url("/signed"), Value::Null).await.expect("Request should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status, 204);
}

#[tokio::test]
async fn non_success_statuses_are_returned_not_raised() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/missing");
			then.status(404).body("nope");
		})
		.await;
	let response = pipeline()
		.get(&server.url("/missing"), Value::Null)
		.await
		.expect("HTTP errors should still produce a response.");

	assert_eq!(response.status, 404);
	assert!(!response.is_success());
	assert!(matches!(response.json::<Value>(), Err(Error::Decode { status: 404, .. })));
}

#[tokio::test]
async fn request_timeout_option_surfaces_transport_errors() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(std::time::Duration::from_millis(500));
		})
		.await;
	let err = pipeline()
		.request(
			&server.url("/slow"),
			"get",
			RequestOptions::new().with_timeout(Duration::milliseconds(50)),
		)
		.await
		.expect_err("Slow responses should exceed the request timeout.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
}

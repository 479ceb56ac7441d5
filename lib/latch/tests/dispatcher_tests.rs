//! End-to-end tests: descriptions bound to a real `HyperClient` against wiremock.

use std::time::Duration;

use assert2::{check, let_assert};
use latch::prelude::*;
use latch::{BodyDeserializer, BodySerializer, CodecError, ErrorPayload, TransportErrorKind};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string, header, method, path, query_param, query_param_is_missing},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
struct Problem {
    code: String,
    message: String,
}

fn user_api() -> InterfaceDescription {
    InterfaceDescription::new("UserApi")
        .header("X-Api-Version", "2")
        .method(
            MethodDescriptor::get("get_user", "/users/{id}")
                .path_param("id")
                .error::<Problem>(),
        )
        .method(MethodDescriptor::get("get_user_raw", "/users/{id}").path_param("id"))
        .method(
            MethodDescriptor::get("get_post", "/users/{id}/posts/{post_id}")
                .path_param("id")
                .path_param("post_id"),
        )
        .method(
            MethodDescriptor::get("search", "/users")
                .query_param("q")
                .query_param("page")
                .header_param("X-Request-Id"),
        )
        .method(MethodDescriptor::post("create_user", "/users").body_param("user"))
        .method(
            MethodDescriptor::post("login", "/login")
                .body_param("credentials")
                .content_type("application/x-www-form-urlencoded")
                .accept("text/plain"),
        )
        .method(
            MethodDescriptor::post("broken", "/users")
                .body_param("user")
                .body_param("avatar"),
        )
        .method(MethodDescriptor::head("user_exists", "/users/{id}").path_param("id"))
        .method(
            MethodDescriptor::get("slow", "/slow")
                .timeout(Duration::from_millis(100)),
        )
}

async fn bind(server: &MockServer) -> BoundInterface<HyperClient> {
    Dispatcher::new(HyperClient::new(), &server.uri())
        .expect("valid base URL")
        .bind(&user_api())
        .expect("bind")
}

fn alice() -> User {
    User {
        id: 42,
        name: "Alice".to_string(),
    }
}

#[tokio::test]
async fn get_decodes_body_with_a_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(header("accept", "application/json"))
        .and(header("x-api-version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .expect(1)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let user: User = api.call("get_user", args![42]).await.expect("call");

    check!(user == alice());
}

#[tokio::test]
async fn placeholders_are_substituted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/7/posts/%7Bid%7D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let body: serde_json::Value = api.call("get_post", args![7, "{id}"]).await.expect("call");

    check!(body["ok"] == true);
}

#[tokio::test]
async fn absent_query_values_are_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("q", "ali ce"))
        .and(query_param_is_missing("page"))
        .and(header("x-request-id", "req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![alice()]))
        .expect(1)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let users: Vec<User> = api
        .call("search", args!["ali ce", None::<u32>, "req-1"])
        .await
        .expect("call");

    check!(users == [alice()]);
}

#[tokio::test]
async fn json_body_round_trip() {
    let server = MockServer::start().await;
    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(User {
            id: 43,
            name: "Bob".to_string(),
        }))
        .expect(1)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let created: User = api.call("create_user", args![input]).await.expect("call");

    check!(created.id == 43);
    check!(created.name == "Bob");
}

#[tokio::test]
async fn form_body_and_text_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("accept", "text/plain"))
        .and(body_string("user=alice"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("s3ss10n", "text/plain"))
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let token: String = api
        .call("login", args![serde_json::json!({"user": "alice", "password": null})])
        .await
        .expect("call");

    check!(token == "s3ss10n");
}

#[tokio::test]
async fn multiple_bodies_fail_permanently_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    for _ in 0..2 {
        let_assert!(
            Err(Error::Binding(BindingError::MultipleBodies { first, second })) =
                api.call::<User>("broken", args![alice(), "avatar.png"]).await
        );
        check!(first == "user");
        check!(second == "avatar");
    }
}

#[tokio::test]
async fn not_found_decodes_declared_error_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": "user_not_found",
            "message": "no user 404",
        })))
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let_assert!(Err(error) = api.call::<User>("get_user", args![404]).await);

    check!(error.is_not_found());
    check!(error.is_client_error());
    let_assert!(Some(api_error) = error.as_api());
    let_assert!(Some(problem) = api_error.decoded::<Problem>());
    check!(problem.code == "user_not_found");
}

#[tokio::test]
async fn not_found_without_error_type_keeps_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let_assert!(
        Err(Error::Api(ApiError::Http {
            status: 404,
            payload: ErrorPayload::Raw(body),
        })) = api.call::<User>("get_user_raw", args![404]).await
    );
    check!(body.to_vec() == b"missing".to_vec());
}

#[tokio::test]
async fn server_error_with_undecodable_body_stays_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(500).set_body_raw("<h1>oops</h1>", "text/html"))
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let_assert!(Err(error) = api.call::<User>("get_user", args![1]).await);

    check!(error.is_server_error());
    check!(error.status() == Some(500));
    let_assert!(Some(api_error) = error.as_api());
    check!(api_error.decoded::<Problem>().is_none());
    check!(api_error.raw_body().map(|b| b.to_vec()) == Some(b"<h1>oops</h1>".to_vec()));
}

#[tokio::test]
async fn empty_body_for_value_method() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let_assert!(
        Err(Error::Api(ApiError::EmptyBodyForNonVoid { status: 200 })) =
            api.call::<User>("get_user", args![1]).await
    );
}

#[tokio::test]
async fn unsupported_response_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xa1_u8, 0x01], "application/cbor"))
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let_assert!(
        Err(Error::Api(ApiError::UnsupportedResponseType { content_type, .. })) =
            api.call::<User>("get_user", args![1]).await
    );
    check!(content_type == "application/cbor");
}

#[tokio::test]
async fn head_returns_unit() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/users/42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    api.call::<()>("user_exists", args![42]).await.expect("call");
}

#[tokio::test]
async fn method_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(alice())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let_assert!(Err(error) = api.call::<User>("slow", args![]).await);

    check!(error.is_timeout());
    check!(error.status().is_none());
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    let api = Dispatcher::new(HyperClient::new(), "http://127.0.0.1:1")
        .expect("valid base URL")
        .bind(&user_api())
        .expect("bind");

    let_assert!(Err(Error::Transport(error)) = api.call::<User>("get_user", args![1]).await);
    check!(error.kind() == TransportErrorKind::Connect);
}

#[tokio::test]
async fn concurrent_calls_do_not_interfere() {
    let server = MockServer::start().await;
    let bob = User {
        id: 2,
        name: "Bob".to_string(),
    };
    let carol = User {
        id: 3,
        name: "Carol".to_string(),
    };

    // slowest first, so the exchanges overlap and finish out of order
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(query_param_is_missing("q"))
        .and(|request: &wiremock::Request| {
            !request.headers.contains_key("x-request-id") && request.body.is_empty()
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(alice())
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("q", "bob"))
        .and(query_param("page", "2"))
        .and(header("x-request-id", "req-b"))
        .and(|request: &wiremock::Request| {
            !request.headers.contains_key("content-type") && request.body.is_empty()
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![bob.clone()])
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(query_param_is_missing("q"))
        .and(header("content-type", "application/json"))
        .and(body_json(&carol))
        .and(|request: &wiremock::Request| !request.headers.contains_key("x-request-id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(&carol))
        .expect(1)
        .mount(&server)
        .await;

    let api = bind(&server).await;
    let (fetched, found, created) = tokio::join!(
        api.call::<User>("get_user", args![1]),
        api.call::<Vec<User>>("search", args!["bob", 2, "req-b"]),
        api.call::<User>("create_user", args![carol.clone()]),
    );

    check!(fetched.expect("get_user").name == "Alice");
    check!(found.expect("search") == [bob]);
    check!(created.expect("create_user") == carol);
}

const ACME_USER: &str = "application/vnd.acme.user";

/// Semicolon separated `id;name`, standing in for a vendor format.
struct SemicolonCodec;

impl BodySerializer for SemicolonCodec {
    fn serialize(
        &self,
        value: &serde_json::Value,
    ) -> std::result::Result<bytes::Bytes, CodecError> {
        let line = format!("{};{}", value["id"], value["name"].as_str().unwrap_or_default());
        Ok(bytes::Bytes::from(line))
    }
}

impl BodyDeserializer for SemicolonCodec {
    fn deserialize(&self, bytes: &[u8]) -> std::result::Result<serde_json::Value, CodecError> {
        let text = std::str::from_utf8(bytes).map_err(|e| CodecError::decode_failed(ACME_USER, e))?;
        let (id, name) = text
            .trim()
            .split_once(';')
            .ok_or_else(|| CodecError::decode_failed(ACME_USER, "expected 'id;name'"))?;
        let id: u64 = id.parse().map_err(|e| CodecError::decode_failed(ACME_USER, e))?;
        Ok(serde_json::json!({ "id": id, "name": name }))
    }
}

#[tokio::test]
async fn custom_codec_registry_and_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(header("accept", ACME_USER))
        .and(header("user-agent", "todo-cli/1.0"))
        .and(header("x-tenant", "acme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("42;Alice", "application/vnd.acme.user; v=1"),
        )
        .mount(&server)
        .await;

    let description = InterfaceDescription::new("AcmeApi").method(
        MethodDescriptor::get("get_user", "/users/{id}")
            .path_param("id")
            .accept(ACME_USER),
    );
    let config = ClientConfig::builder()
        .user_agent("todo-cli/1.0")
        .default_header("X-Tenant", "acme")
        .eager_binding(false)
        .build();
    let api = Dispatcher::new(HyperClient::new(), &server.uri())
        .expect("valid base URL")
        .with_codecs(CodecRegistry::default().with_codec(ACME_USER, SemicolonCodec))
        .with_config(config)
        .bind(&description)
        .expect("bind");

    let user: User = api.call("get_user", args![42]).await.expect("call");
    check!(user == alice());

    // the stock registry has nothing for the vendor type
    let stock = Dispatcher::new(HyperClient::new(), &server.uri())
        .expect("valid base URL")
        .bind(&description)
        .expect("bind");
    let_assert!(
        Err(Error::Api(ApiError::UnsupportedResponseType { content_type, .. })) =
            stock.call::<User>("get_user", args![42]).await
    );
    check!(content_type.starts_with(ACME_USER));
}

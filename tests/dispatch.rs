//! End-to-end dispatch through nested routers, middleware and encoders.

use std::sync::{Arc, Mutex};

use http::StatusCode;
use serde_json::{Value, json};
use waymark::middleware::{Decision, REQUIRED_SCOPE, RequireScope, fn_middleware};
use waymark::{
    Config, Dispatcher, Error, Format, Invocation, Options, Outcome, ParamSpec, ParamType, Request,
    Response, Router, handler_fn,
};

fn tag(name: &'static str) -> impl waymark::Handler {
    handler_fn(move |_: &mut Invocation<'_>| json!(name))
}

fn body_json(response: &Response) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn data(dispatcher: &Dispatcher, request: Request) -> Value {
    let response = dispatcher.execute(&request).unwrap().or_not_found();
    body_json(&response)["data"].clone()
}

#[test]
fn first_declared_route_wins() {
    let app = Dispatcher::new(
        Router::new()
            .get("/users/{id}", tag("by-id"))
            .get("/users/me", tag("me")),
    );
    assert_eq!(data(&app, Request::get("/users/me")), json!("by-id"));
}

#[test]
fn mount_sees_the_remainder() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let seen = Arc::clone(&seen);
        handler_fn(move |inv: &mut Invocation<'_>| {
            seen.lock().unwrap().push(inv.context().consumed().to_owned());
        })
    };
    let api = Router::new()
        .get("/", record)
        .get("/users", tag("users"));
    let app = Dispatcher::new(Router::new().nest("/api", api));

    assert_eq!(data(&app, Request::get("/api/users")), json!("users"));
    app.execute(&Request::get("/api")).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["/api"]);
}

#[test]
fn mount_params_reach_nested_handler() {
    let show = handler_fn(|inv: &mut Invocation<'_>| {
        json!({ "org": inv.args().str("org"), "id": inv.args().i64("id") })
    })
    .param(ParamSpec::required("org", ParamType::String))
    .param(ParamSpec::required("id", ParamType::Int));

    let app = Dispatcher::new(Router::new().nest("/orgs/{org}", Router::new().get("/repos/{id}", show)));
    assert_eq!(data(&app, Request::get("/orgs/acme/repos/3")), json!({ "org": "acme", "id": 3 }));
}

#[test]
fn optional_param_binds_null_or_default() {
    let greet = handler_fn(|inv: &mut Invocation<'_>| format!("hello {}", inv.args().str("name").unwrap_or("?")))
        .param(ParamSpec::with_default("name", ParamType::String, "world"));
    let app = Dispatcher::new(Router::new().get("/greet/{name?}", greet));

    assert_eq!(data(&app, Request::get("/greet")), json!("hello world"));
    assert_eq!(data(&app, Request::get("/greet/sam")), json!("hello sam"));
}

#[test]
fn halt_skips_the_rest() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = |name: &'static str, halt: bool| {
        let calls = Arc::clone(&calls);
        fn_middleware(name, move |_, _, _| {
            calls.lock().unwrap().push(name);
            if halt {
                Decision::Halt(Response::status(StatusCode::UNAUTHORIZED))
            } else {
                Decision::Continue
            }
        })
    };
    let handler = {
        let calls = Arc::clone(&calls);
        handler_fn(move |_: &mut Invocation<'_>| calls.lock().unwrap().push("handler"))
    };

    let app = Dispatcher::new(
        Router::new()
            .with(log("first", false))
            .with(log("gate", true))
            .with(log("last", false))
            .get("/x", handler),
    );

    let ctx = app.handle(&Request::get("/x")).unwrap().unwrap();
    assert_eq!(ctx.status(), StatusCode::UNAUTHORIZED);
    assert!(ctx.reply().is_none());
    assert_eq!(*calls.lock().unwrap(), vec!["first", "gate"]);
}

#[test]
fn same_named_middleware_on_one_router_all_run() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let check = |label: &'static str, halt: bool| {
        let calls = Arc::clone(&calls);
        fn_middleware("check", move |_, _, _| {
            calls.lock().unwrap().push(label);
            if halt {
                Decision::Halt(Response::status(StatusCode::FORBIDDEN))
            } else {
                Decision::Continue
            }
        })
    };

    let app = Dispatcher::new(
        Router::new()
            .with(check("a", true))
            .with(check("b", false))
            .get("/x", tag("x")),
    );

    let resp = app.execute(&Request::get("/x")).unwrap().or_not_found();
    assert_eq!(resp.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(*calls.lock().unwrap(), vec!["a"]);
}

#[test]
fn json_envelope_for_data_and_errors() {
    let app = Dispatcher::new(
        Router::new()
            .get("/ok", handler_fn(|_: &mut Invocation<'_>| json!({ "x": 1 })))
            .get("/bad", handler_fn(|inv: &mut Invocation<'_>| {
                inv.context_mut().set_status(StatusCode::UNPROCESSABLE_ENTITY);
                json!({ "error": "name is required" })
            })),
    );

    let ok = app.execute(&Request::get("/ok")).unwrap().or_not_found();
    assert_eq!(ok.header("access-control-allow-origin"), Some("*"));
    assert_eq!(body_json(&ok), json!({ "header": { "response_code": 200 }, "data": { "x": 1 }, "success": true }));

    let bad = app.execute(&Request::get("/bad")).unwrap().or_not_found();
    assert_eq!(bad.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(&bad),
        json!({ "header": { "response_code": 422 }, "error": "name is required", "success": false })
    );
}

#[test]
fn config_turns_off_envelope_and_cors() {
    let config = Config::from_json_str(r#"{ "json": { "with_defaults": false, "cors": false } }"#).unwrap();
    let app = Dispatcher::new(Router::new().get("/x", handler_fn(|_: &mut Invocation<'_>| json!([1, 2]))))
        .with_config(config);

    let resp = app.execute(&Request::get("/x")).unwrap().or_not_found();
    assert_eq!(resp.body().as_ref(), b"[1,2]");
    assert_eq!(resp.header("access-control-allow-origin"), None);
}

#[test]
fn default_format_from_config() {
    let config = Config::from_json_str(r#"{ "default_format": "script" }"#).unwrap();
    let app = Dispatcher::new(Router::new().get("/app.js", handler_fn(|_: &mut Invocation<'_>| "alert(1);")))
        .with_config(config);

    let resp = app.execute(&Request::get("/app.js")).unwrap().or_not_found();
    assert_eq!(resp.header("content-type"), Some("text/javascript; charset=utf-8"));
    assert_eq!(resp.body().as_ref(), b"alert(1);");
}

#[test]
fn html_rejects_structured_values() {
    let mut router = Router::new();
    router
        .register("GET", "/page", handler_fn(|_: &mut Invocation<'_>| json!({ "a": 1 })), Options::new())
        .unwrap()
        .render_as(Format::Html);

    let result = Dispatcher::new(router).execute(&Request::get("/page"));
    assert!(matches!(result, Err(Error::InvalidResponseValue { format: Format::Html, .. })));
}

#[test]
fn missing_required_param_is_fatal() {
    let handler = handler_fn(|_: &mut Invocation<'_>| json!(null))
        .param(ParamSpec::required("token", ParamType::String));
    let app = Dispatcher::new(Router::new().get("/x", handler));

    let result = app.execute(&Request::get("/x"));
    assert!(matches!(result, Err(Error::MissingParameter { name }) if name == "token"));
}

#[test]
fn uncoercible_path_value_is_rejected() {
    let handler = handler_fn(|_: &mut Invocation<'_>| ()).param(ParamSpec::required("id", ParamType::Int));
    let app = Dispatcher::new(Router::new().get("/items/{id}", handler));

    assert!(matches!(
        app.execute(&Request::get("/items/abc")),
        Err(Error::InvalidParameter { expected: "int", .. })
    ));
}

#[test]
fn backtracks_out_of_a_mount() {
    let app = Dispatcher::new(
        Router::new()
            .nest("/api", Router::new().get("/users", tag("nested")))
            .get("/api/health", tag("health")),
    );
    assert_eq!(data(&app, Request::get("/api/health")), json!("health"));
    assert_eq!(data(&app, Request::get("/api/users")), json!("nested"));
}

#[test]
fn void_handler_redirects() {
    let login = handler_fn(|inv: &mut Invocation<'_>| {
        inv.context_mut().redirect("/auth");
        json!("ignored")
    })
    .void();
    let app = Dispatcher::new(Router::new().get("/login", login));

    let ctx = app.handle(&Request::get("/login")).unwrap().unwrap();
    assert!(ctx.reply().is_none());

    let resp = ctx.into_response();
    assert_eq!(resp.status_code(), StatusCode::FOUND);
    assert_eq!(resp.header("location"), Some("/auth"));
    assert!(resp.body().is_empty());
}

#[test]
fn handler_response_bypasses_encoder() {
    let app = Dispatcher::new(Router::new().get("/raw", handler_fn(|_: &mut Invocation<'_>| Response::text("plain"))));
    let resp = app.execute(&Request::get("/raw")).unwrap().or_not_found();
    assert_eq!(resp.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(resp.body().as_ref(), b"plain");
}

#[test]
fn required_scope_on_a_mount() {
    let resolver = |token: &str| (token == "admin-token").then(|| vec!["admin".to_owned()]);

    let mut app = Router::new().with(RequireScope::new(resolver));
    let options: Options = [(REQUIRED_SCOPE.to_owned(), json!("admin"))].into_iter().collect();
    app.mount("/admin", Router::new().get("/stats", tag("stats")), options).unwrap();
    let app = Dispatcher::new(app.get("/public", tag("public")));

    let status = |request: Request| app.execute(&request).unwrap().or_not_found().status_code();

    assert_eq!(status(Request::get("/public")), StatusCode::OK);
    assert_eq!(status(Request::get("/admin/stats")), StatusCode::UNAUTHORIZED);
    assert_eq!(
        status(Request::get("/admin/stats").with_header("Authorization", "Bearer nope")),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status(Request::get("/admin/stats").with_header("Authorization", "Bearer admin-token")),
        StatusCode::OK
    );
}

#[test]
fn executing_a_mount_is_illegal() {
    let router = Router::new()
        .nest("/api", Router::new())
        .get("/x", tag("x"));
    let mut ctx = router.resolve("/x", "GET").unwrap().context;

    let mount = &router.routes()[0];
    assert!(mount.is_mount());
    assert!(matches!(mount.execute(&mut ctx, &Request::get("/api")), Err(Error::IllegalState(_))));
}

#[test]
fn no_route_is_an_outcome_not_an_error() {
    let app = Dispatcher::new(Router::new().post("/x", tag("x")));
    assert_eq!(app.execute(&Request::get("/x")).unwrap(), Outcome::NoRouteMatched);
    assert!(app.handle(&Request::get("/y")).unwrap().is_none());
}

#[test]
fn http_round_trip() {
    let app = Dispatcher::new(Router::new().post("/echo", handler_fn(|inv: &mut Invocation<'_>| {
        serde_json::from_slice::<Value>(inv.request().body()).unwrap_or_default()
    })));

    let request = http::Request::builder()
        .method("POST")
        .uri("/echo?pretty=1")
        .header("content-type", "application/json")
        .body(bytes::Bytes::from_static(br#"{"a":"b"}"#))
        .unwrap();

    let response = app.execute(&Request::from(request)).unwrap().or_not_found().into_http().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json; charset=utf-8");
}

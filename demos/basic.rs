//! Minimal waymark example: a versioned JSON API with a scope-protected
//! admin area, driven by a handful of in-process requests.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic

use http::StatusCode;
use serde_json::{Value, json};
use waymark::middleware::{REQUIRED_SCOPE, RequireScope, Trace};
use waymark::{
    Dispatcher, Error, Invocation, Options, ParamSpec, ParamType, Request, Response, Router, handler_fn,
};

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let users = Router::new()
        .get("/", handler_fn(list_users))
        .get("/{id}", handler_fn(get_user).param(ParamSpec::required("id", ParamType::Int)))
        .post("/", handler_fn(create_user));

    let mut admin = Router::new();
    admin.register("GET", "/stats", handler_fn(stats), Options::new())?;

    let mut api = Router::new().nest("/users", users);
    let admin_options: Options = [(REQUIRED_SCOPE.to_owned(), json!("admin"))].into_iter().collect();
    api.mount("/admin", admin, admin_options)?;

    let app = Router::new()
        .with(Trace)
        .with(RequireScope::new(lookup_token))
        .nest("/api/{version}", api)
        .get("/login", handler_fn(|inv: &mut Invocation<'_>| inv.context_mut().redirect("/auth")).void());

    let dispatcher = Dispatcher::new(app);

    let requests = [
        Request::get("/api/v1/users"),
        Request::get("/api/v1/users/42?fields=name"),
        Request::get("/api/v1/users/abc"),
        Request::post("/api/v1/users").with_body(r#"{"name":"alice"}"#),
        Request::get("/api/v1/admin/stats"),
        Request::get("/api/v1/admin/stats").with_header("Authorization", "Bearer root-token"),
        Request::get("/login"),
        Request::get("/nope"),
    ];

    for request in &requests {
        let line = match dispatcher.execute(request) {
            Ok(outcome) => {
                let response = outcome.or_not_found();
                format!("{} {}", response.status_code(), String::from_utf8_lossy(response.body()))
            }
            Err(e) => format!("error: {e}"),
        };
        println!("{:6} {:40} {line}", request.method(), request.path());
    }
    Ok(())
}

// GET /api/{version}/users
fn list_users(inv: &mut Invocation<'_>) -> Value {
    json!({
        "version": inv.context().param("version"),
        "users": [{ "id": 1, "name": "alice" }, { "id": 2, "name": "bob" }],
    })
}

// GET /api/{version}/users/{id}
fn get_user(inv: &mut Invocation<'_>) -> Result<Value, Response> {
    let id = inv.args().i64("id").ok_or_else(|| Response::status(StatusCode::BAD_REQUEST))?;
    if id > 100 {
        return Ok(json!({ "error": "no such user" }));
    }
    Ok(json!({ "id": id, "name": "alice" }))
}

// POST /api/{version}/users
fn create_user(inv: &mut Invocation<'_>) -> Result<Value, StatusCode> {
    let body: Value = serde_json::from_slice(inv.request().body()).map_err(|_| StatusCode::BAD_REQUEST)?;
    inv.context_mut().set_status(StatusCode::CREATED);
    Ok(json!({ "id": 99, "name": body["name"] }))
}

// GET /api/{version}/admin/stats
fn stats(_: &mut Invocation<'_>) -> Value {
    json!({ "requests": 8 })
}

fn lookup_token(token: &str) -> Option<Vec<String>> {
    match token {
        "root-token" => Some(vec!["admin".to_owned()]),
        "user-token" => Some(vec!["read".to_owned()]),
        _ => None,
    }
}

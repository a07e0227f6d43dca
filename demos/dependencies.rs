//! Dependency resolvers: static values, query-driven values, a login guard,
//! several resolvers feeding one handler, and a stateful lookup.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example dependencies
//!
//! Try:
//!   curl http://localhost:3000/goal
//!   curl 'http://localhost:3000/user-goal?username=ramesha'
//!   curl 'http://localhost:3000/login?username=admin&password=admin'
//!   curl 'http://localhost:3000/login?username=admin&password=wrong'   # 401
//!   curl http://localhost:3000/calculate/5
//!   curl http://localhost:3000/items/1
//!   curl http://localhost:3000/items/3                                  # 404

use std::collections::HashMap;

use clap::Parser;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use vetted::{
    Dependency, Endpoint, FieldType, HttpError, Inputs, Json, Lookup, Param, Router, Scope, Server,
};

#[derive(Parser)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "VETTED_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

// ── Resolvers ─────────────────────────────────────────────────────────────────

fn get_goal() -> Dependency {
    Dependency::from_fn("goal", |_: &Scope<'_>| Ok(json!({"goal": "Learning AI with FastAPI"})))
}

fn get_user_goal() -> Dependency {
    Dependency::from_fn("user_goal", |s: &Scope<'_>| {
        Ok(json!({"username": s.args().get_str("username"), "goal": "Mastering FastAPI"}))
    })
    .param(Param::query("username", FieldType::Str).description("Enter your username"))
}

fn login_check() -> Dependency {
    Dependency::from_fn("auth", |s: &Scope<'_>| {
        let args = s.args();
        match (args.get_str("username"), args.get_str("password")) {
            (Some("admin"), Some("admin")) => Ok(json!({"status": "Login Successful"})),
            _ => Err(HttpError::unauthorized("Invalid Credentials")),
        }
    })
    .param(Param::query("username", FieldType::Str))
    .param(Param::query("password", FieldType::Str))
}

fn add(name: &'static str, n: i64) -> Dependency {
    Dependency::from_fn(name, move |s: &Scope<'_>| {
        Ok(s.args().get_i64("value").unwrap_or_default() + n)
    })
    .param(Param::path("value", FieldType::Int))
}

fn item_or_404() -> Dependency {
    let items: HashMap<String, String> = [
        ("1".to_owned(), "FastAPI Tutorial".to_owned()),
        ("2".to_owned(), "Dependency Injection Guide".to_owned()),
    ]
    .into();
    Dependency::new("item", Lookup::new(Param::path("item_id", FieldType::Str), items))
}

// ── Endpoints ─────────────────────────────────────────────────────────────────

/// An endpoint that returns the JSON output of its single resolver.
fn passthrough(dependency: Dependency) -> Endpoint {
    let name = dependency.name().to_owned();
    Endpoint::builder()
        .depends(dependency)
        .handler(move |inputs: Inputs| {
            let out = inputs.get::<Value>(&name).cloned().unwrap_or_default();
            async move { Json(out) }
        })
        .build()
        .expect("passthrough endpoint")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let calculate = Endpoint::builder()
        .param(Param::path("value", FieldType::Int))
        .depends(add("add_one", 1))
        .depends(add("add_two", 2))
        .handler(|inputs: Inputs| async move {
            let value = inputs.args().get_i64("value").unwrap_or_default();
            let r1 = inputs.get::<i64>("add_one").copied().unwrap_or_default();
            let r2 = inputs.get::<i64>("add_two").copied().unwrap_or_default();
            Json(json!({"total": value + r1 + r2}))
        })
        .build()
        .expect("calculate endpoint");

    let read_item = Endpoint::builder()
        .depends(item_or_404())
        .handler(|inputs: Inputs| async move {
            Json(json!({"item": inputs.get::<String>("item")}))
        })
        .build()
        .expect("read_item endpoint");

    let app = Router::new()
        .get("/goal", passthrough(get_goal()))
        .get("/user-goal", passthrough(get_user_goal()))
        .get("/login", passthrough(login_check()))
        .get("/calculate/{value}", calculate)
        .get("/items/{item_id}", read_item);

    Server::bind(&cli.addr)
        .serve(app)
        .await
        .expect("server error");
}

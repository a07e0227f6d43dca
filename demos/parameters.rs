//! Path, query and body parameters with constraints and defaults.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example parameters -- --addr 127.0.0.1:3000
//!
//! Try:
//!   curl http://localhost:3000/items/5
//!   curl http://localhost:3000/items/0                      # 422, ge=1
//!   curl 'http://localhost:3000/items/?q=pen&skip=20'
//!   curl 'http://localhost:3000/items/?q=ab&limit=1000'     # 422, two violations
//!   curl -X PUT 'http://localhost:3000/items/validated/7?q=blue' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"pen","price":"1.5"}'

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use vetted::{Endpoint, FieldSpec, FieldType, Inputs, Json, Param, RecordSchema, Router, Server};

#[derive(Parser)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "VETTED_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

fn item() -> RecordSchema {
    RecordSchema::new("Item")
        .field(FieldSpec::new("name", FieldType::Str))
        .field(FieldSpec::new("description", FieldType::Str).optional())
        .field(FieldSpec::new("price", FieldType::Float))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    // GET /items/{item_id}
    let read_item = Endpoint::builder()
        .param(
            Param::path("item_id", FieldType::Int)
                .title("The ID of the item")
                .description("A unique identifier for the item")
                .ge(1.0),
        )
        .handler(|inputs: Inputs| async move {
            Json(json!({"item_id": inputs.args().get_i64("item_id")}))
        })
        .build()
        .expect("read_item endpoint");

    // GET /items/?q=&skip=&limit=
    let read_items = Endpoint::builder()
        .param(
            Param::query("q", FieldType::Str)
                .optional()
                .title("Query string")
                .description("Query string for searching items")
                .min_length(3)
                .max_length(50),
        )
        .param(Param::query("skip", FieldType::Int).default(0).ge(0.0))
        .param(Param::query("limit", FieldType::Int).default(10).le(100.0))
        .handler(|inputs: Inputs| async move { Json(inputs.args().to_value()) })
        .build()
        .expect("read_items endpoint");

    // PUT /items/validated/{item_id}?q= with an optional JSON body
    let update_item = Endpoint::builder()
        .param(Param::path("item_id", FieldType::Int).title("Item ID").ge(1.0))
        .param(Param::query("q", FieldType::Str).optional().min_length(3))
        .param(Param::body("item", item()).optional().description("Optional item data (JSON body)"))
        .handler(|inputs: Inputs| async move {
            let mut result = json!({"item_id": inputs.args().get_i64("item_id")});
            if let Some(q) = inputs.args().get_str("q") {
                result["q"] = json!(q);
            }
            if let Some(item) = inputs.body("item") {
                result["item"] = item.to_value();
            }
            Json(result)
        })
        .build()
        .expect("update_item endpoint");

    println!("{}", read_items.describe());

    let app = Router::new()
        .get("/items/{item_id}", read_item)
        .get("/items/", read_items)
        .put("/items/validated/{item_id}", update_item);

    Server::bind(&cli.addr)
        .serve(app)
        .await
        .expect("server error");
}

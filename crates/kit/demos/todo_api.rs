//! Wires a small todo API and feeds it a few synthetic requests.
//!
//! `cargo run -p switchyard-kit --example todo_api`

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use switchyard_kit::db::{Connection, Database, DbError, Executed, HandleSlot, Select, SqlValue, Where};
use switchyard_kit::{Claims, Jwt, JwtAuth, JwtConfig};
use switchyard_web::router::{get, options, post};
use switchyard_web::{handler_fn, middleware_fn, Dispatcher, HandlerError, Router};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

static DB_HANDLE: HandleSlot<MemoryConnection> = HandleSlot::new();

/// Stands in for a real driver: remembers every statement and answers with one canned row.
#[derive(Debug, Default)]
struct MemoryConnection {
    statements: Mutex<Vec<String>>,
}

impl Connection for MemoryConnection {
    fn execute(&self, sql: &str) -> Result<Executed, DbError> {
        self.statements.lock().unwrap_or_else(PoisonError::into_inner).push(sql.to_string());
        if sql.contains("missing_table") {
            return Err(DbError::query(1146, "Table 'todo.missing_table' doesn't exist"));
        }
        let row = json!({"id": 1, "title": "buy milk", "done": false});
        Ok(Executed { affected_rows: 1, rows: row.as_object().cloned().into_iter().collect() })
    }
}

#[derive(Debug, Deserialize)]
struct NewTodo {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

fn default_limit() -> u64 {
    20
}

fn router(db: &Database<MemoryConnection>, jwt: &Jwt) -> Router {
    let list_db = db.clone();
    let show_db = db.clone();
    let create_db = db.clone();

    Router::builder()
        .with_global_middleware(middleware_fn(|req, resp, next| {
            resp.header("Access-Control-Allow-Origin", "*")?
                .header("Access-Control-Allow-Headers", "Authorization, Content-Type")?;
            info!(method = %req.method(), path = req.path(), "request");
            next.run(req, resp)
        }))
        .route("*", options(handler_fn(|_req, resp| resp.set_status(StatusCode::NO_CONTENT).end())))
        .route(
            "/todos",
            get(handler_fn(move |req, resp| {
                let paging: Paging = req.query_as()?;
                let select = Select::from("todos").order_by("id").limit(paging.limit).offset(paging.offset);
                resp.json(&list_db.select(&select))
            })),
        )
        .route(
            "/todos/:id",
            get(handler_fn(move |req, resp| {
                let id: i64 = req.param("id").unwrap_or_default().parse()?;
                resp.json(&show_db.select(&Select::from("todos").filter(Where::column("id", id)).limit(1)))
            })),
        )
        .route(
            "/todos",
            post(handler_fn(move |req, resp| {
                let todo: NewTodo = req.body_as()?;
                let owner = req.extensions().get::<Claims>().and_then(|claims| claims.0["sub"].as_str().map(str::to_string));
                let result = create_db.insert(
                    "todos",
                    &[("title", todo.title.into()), ("owner", owner.into()), ("created_at", SqlValue::raw("NOW()"))],
                );
                resp.set_status(StatusCode::CREATED).json(&result)
            }))
            .with_middleware(JwtAuth::new(jwt.clone())),
        )
        .route("/broken", get(handler_fn(|_req, _resp| Err(HandlerError::msg("storage offline")))))
        .build()
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let jwt = Jwt::from(&JwtConfig { secret: "demo secret".to_string() });
    let db = Database::open(&DB_HANDLE, || Ok::<_, DbError>(MemoryConnection::default())).expect("in-memory connection");
    let dispatcher = Dispatcher::new(router(&db, &jwt));

    let token = jwt.build(&json!({"sub": "ada"})).expect("sign demo token");
    let requests = vec![
        http::Request::get("/todos?limit=5&offset=10").body(Bytes::new()),
        http::Request::get("/todos/1").body(Bytes::new()),
        http::Request::get("/todos/one").body(Bytes::new()),
        http::Request::post("/todos").body(Bytes::from_static(br#"{"title":"buy milk"}"#)),
        http::Request::post("/todos")
            .header("Authorization", format!("Bearer {token}"))
            .body(Bytes::from_static(br#"{"title":"buy milk"}"#)),
        http::Request::builder().method(Method::OPTIONS).uri("/todos").body(Bytes::new()),
        http::Request::get("/broken").body(Bytes::new()),
        http::Request::get("/nowhere").body(Bytes::new()),
    ];

    for request in requests {
        let request = request.expect("valid demo request");
        let line = format!("{} {}", request.method(), request.uri());
        let response = dispatcher.dispatch(request);
        info!(request = %line, status = %response.status(), body = %String::from_utf8_lossy(response.body()), "response");
    }

    let statements = db.connection().statements.lock().unwrap_or_else(PoisonError::into_inner).len();
    info!(statements, "done");
}

//! In-process TaskFlow API used by the unit tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{Board, BoardId, Column, ColumnId, Priority, Task, TaskId, UserId},
    protocol::{ColumnPatch, NewBoard, NewColumn, NewTask, Page, RegisterRequest, TaskPatch},
};
use tokio::{net::TcpListener, sync::Mutex};

pub const TOKEN: &str = "test-token";
pub const API_PREFIX: &str = "/api/v1";
/// Task timestamps go out without an offset, as the TaskFlow backend sends them.
pub const NAIVE_CREATED_AT: &str = "2024-05-01T10:00:00";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    pub boards: Vec<Board>,
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
    pub users: HashMap<String, String>,
    pub requests: Vec<RecordedRequest>,
    /// `(METHOD, path)` -> forced status and body.
    pub failures: HashMap<(String, String), (u16, String)>,
    pub task_fetch_delay: Option<Duration>,
    pub in_flight: usize,
    pub max_in_flight: usize,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    pub fn add_board(&mut self, id: i64, name: &str) {
        self.boards.push(Board {
            id: BoardId(id),
            name: name.into(),
            owner_id: Some(UserId(1)),
        });
    }

    pub fn add_column(&mut self, id: i64, board_id: i64, name: &str, position: Option<i64>) {
        self.columns.push(Column {
            id: ColumnId(id),
            board_id: BoardId(board_id),
            name: name.into(),
            position,
        });
    }

    pub fn add_task(&mut self, id: i64, column_id: i64, title: &str, position: Option<i64>) {
        self.tasks.push(Task {
            id: TaskId(id),
            column_id: ColumnId(column_id),
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            position,
            assignee_id: None,
            created_at: None,
        });
    }

    pub fn fail(&mut self, method: &str, path: &str, status: u16, body: &str) {
        self.failures.insert(
            (method.to_string(), format!("{API_PREFIX}{path}")),
            (status, body.to_string()),
        );
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        let full = format!("{API_PREFIX}{path}");
        self.requests
            .iter()
            .filter(|r| r.method.as_str() == method && r.path == full)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

pub type SharedState = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub api_base: String,
    pub state: SharedState,
}

pub async fn spawn(state: MockState) -> MockServer {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state: SharedState = Arc::new(Mutex::new(state));
    let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockServer {
        api_base: format!("http://{addr}{API_PREFIX}"),
        state,
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn status(code: u16, detail: &str) -> Response {
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(json!({ "detail": detail }))).into_response()
}

fn page<T: serde::Serialize>(items: Vec<T>) -> Response {
    Json(Page::of(items)).into_response()
}

fn task_json(task: &Task) -> Value {
    let mut value = serde_json::to_value(task).unwrap_or(Value::Null);
    value["created_at"] = json!(NAIVE_CREATED_AT);
    value
}

fn task_page<'a>(tasks: impl Iterator<Item = &'a Task>) -> Response {
    page(tasks.map(task_json).collect())
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_str(body).ok()
}

async fn handle(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = String::from_utf8_lossy(&body).into_owned();
    let path = uri.path().to_string();
    let recorded = RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: header_value(&headers, header::AUTHORIZATION),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        accept: header_value(&headers, header::ACCEPT),
        body: body.clone(),
    };

    let delay = {
        let mut guard = state.lock().await;
        guard.requests.push(recorded.clone());
        if let Some(forced) = guard
            .failures
            .get(&(method.as_str().to_string(), path.clone()))
            .cloned()
        {
            let code = StatusCode::from_u16(forced.0).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (code, forced.1).into_response();
        }
        guard.task_fetch_delay
    };

    let Some(rest) = path.strip_prefix(&format!("{API_PREFIX}/")) else {
        return status(404, "Not Found");
    };
    let segments: Vec<String> = rest
        .trim_end_matches('/')
        .split('/')
        .map(str::to_string)
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    let expected_auth = format!("Bearer {TOKEN}");
    if segments.first() != Some(&"auth")
        && recorded.authorization.as_deref() != Some(expected_auth.as_str())
    {
        return status(401, "No se pudieron validar las credenciales");
    }

    match (&method, segments.as_slice()) {
        (&Method::POST, ["auth", "register"]) => {
            let Some(req) = parse_body::<RegisterRequest>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            if guard.users.contains_key(&req.email) {
                return status(400, "Email ya registrado");
            }
            guard.users.insert(req.email.clone(), req.password);
            let id = guard.next_id();
            (
                StatusCode::CREATED,
                Json(json!({ "id": id, "email": req.email, "role": "member" })),
            )
                .into_response()
        }
        (&Method::POST, ["auth", "login"]) => {
            let form: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
                .into_owned()
                .collect();
            let guard = state.lock().await;
            let ok = match (form.get("username"), form.get("password")) {
                (Some(user), Some(password)) => guard.users.get(user) == Some(password),
                _ => false,
            };
            if !ok {
                return status(400, "Credenciales inválidas");
            }
            Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
        }
        (&Method::GET, ["boards"]) => {
            let guard = state.lock().await;
            page(guard.boards.clone())
        }
        (&Method::POST, ["boards"]) => {
            let Some(req) = parse_body::<NewBoard>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            let id = guard.next_id();
            guard.add_board(id, &req.name);
            let board = guard.boards.last().cloned();
            (StatusCode::CREATED, Json(board)).into_response()
        }
        (&Method::PATCH, ["boards", id]) => {
            let Some(req) = parse_body::<Value>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            let Some(board) = guard.boards.iter_mut().find(|b| b.id.0 == id) else {
                return status(404, "Tablero no encontrado o sin permisos");
            };
            if let Some(name) = req.get("name").and_then(Value::as_str) {
                board.name = name.to_string();
            }
            Json(board.clone()).into_response()
        }
        (&Method::DELETE, ["boards", id]) => {
            let mut guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            let Some(idx) = guard.boards.iter().position(|b| b.id.0 == id) else {
                return status(404, "Tablero no encontrado o sin permisos");
            };
            let board = guard.boards.remove(idx);
            Json(board).into_response()
        }
        (&Method::GET, ["boards", id, "columns"]) => {
            let guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            if !guard.boards.iter().any(|b| b.id.0 == id) {
                return status(404, "Tablero no encontrado o sin permisos");
            }
            page(
                guard
                    .columns
                    .iter()
                    .filter(|c| c.board_id.0 == id)
                    .cloned()
                    .collect(),
            )
        }
        (&Method::POST, ["columns"]) => {
            let Some(req) = parse_body::<NewColumn>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            let id = guard.next_id();
            guard.add_column(id, req.board_id.0, &req.name, Some(req.position));
            let column = guard.columns.last().cloned();
            (StatusCode::CREATED, Json(column)).into_response()
        }
        (&Method::PATCH, ["columns", id]) => {
            let Some(req) = parse_body::<ColumnPatch>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            let Some(column) = guard.columns.iter_mut().find(|c| c.id.0 == id) else {
                return status(404, "Columna no encontrada o sin permisos");
            };
            if let Some(name) = req.name {
                column.name = name;
            }
            if let Some(position) = req.position {
                column.position = Some(position);
            }
            Json(column.clone()).into_response()
        }
        (&Method::DELETE, ["columns", id]) => {
            let mut guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            let Some(idx) = guard.columns.iter().position(|c| c.id.0 == id) else {
                return status(404, "Columna no encontrada o sin permisos");
            };
            let column = guard.columns.remove(idx);
            guard.tasks.retain(|t| t.column_id != column.id);
            Json(column).into_response()
        }
        (&Method::GET, ["columns", id, "tasks"]) => {
            let id: i64 = id.parse().unwrap_or_default();
            let priority = recorded.query.as_deref().and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == "priority")
                    .and_then(|(_, v)| v.parse::<Priority>().ok())
            });
            {
                let mut guard = state.lock().await;
                if !guard.columns.iter().any(|c| c.id.0 == id) {
                    return status(404, "Columna no encontrada o sin permisos");
                }
                guard.in_flight += 1;
                guard.max_in_flight = guard.max_in_flight.max(guard.in_flight);
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut guard = state.lock().await;
            guard.in_flight -= 1;
            task_page(
                guard
                    .tasks
                    .iter()
                    .filter(|t| t.column_id.0 == id)
                    .filter(|t| priority.map_or(true, |p| t.priority == p)),
            )
        }
        (&Method::GET, ["tasks"]) => {
            let q = recorded
                .query
                .as_deref()
                .and_then(|q| {
                    url::form_urlencoded::parse(q.as_bytes())
                        .find(|(k, _)| k == "q")
                        .map(|(_, v)| v.to_lowercase())
                })
                .unwrap_or_default();
            let guard = state.lock().await;
            task_page(
                guard
                    .tasks
                    .iter()
                    .filter(|t| t.title.to_lowercase().contains(&q)),
            )
        }
        (&Method::POST, ["tasks"]) => {
            let Some(req) = parse_body::<NewTask>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            if !guard.columns.iter().any(|c| c.id == req.column_id) {
                return status(404, "Columna no encontrada o sin permisos");
            }
            let id = guard.next_id();
            guard.tasks.push(Task {
                id: TaskId(id),
                column_id: req.column_id,
                title: req.title,
                description: req.description,
                priority: req.priority,
                position: Some(0),
                assignee_id: None,
                created_at: None,
            });
            let task = guard.tasks.last().map(task_json);
            (StatusCode::CREATED, Json(task)).into_response()
        }
        (&Method::PATCH, ["tasks", id]) => {
            let Some(req) = parse_body::<TaskPatch>(&body) else {
                return status(422, "invalid body");
            };
            let mut guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            let Some(task) = guard.tasks.iter_mut().find(|t| t.id.0 == id) else {
                return status(404, "Tarea no encontrada o sin permisos");
            };
            if let Some(title) = req.title {
                task.title = title;
            }
            if let Some(description) = req.description {
                task.description = Some(description);
            }
            if let Some(priority) = req.priority {
                task.priority = priority;
            }
            if let Some(column_id) = req.column_id {
                task.column_id = column_id;
            }
            if let Some(position) = req.position {
                task.position = Some(position);
            }
            Json(task_json(task)).into_response()
        }
        (&Method::DELETE, ["tasks", id]) => {
            let mut guard = state.lock().await;
            let id: i64 = id.parse().unwrap_or_default();
            let Some(idx) = guard.tasks.iter().position(|t| t.id.0 == id) else {
                return status(404, "Tarea no encontrada o sin permisos");
            };
            let task = guard.tasks.remove(idx);
            Json(task).into_response()
        }
        _ => status(404, "Not Found"),
    }
}

/// Two boards; board 1 has three columns returned out of position order.
pub fn seeded_state() -> MockState {
    let mut state = MockState::default();
    state.users.insert("ana@example.com".into(), "secret".into());
    state.add_board(1, "Roadmap");
    state.add_board(2, "Ops");
    state.add_column(11, 1, "Done", Some(2));
    state.add_column(10, 1, "Todo", Some(0));
    state.add_column(12, 1, "Doing", Some(1));
    state.add_column(20, 2, "Inbox", Some(0));
    state.add_task(101, 10, "Write brief", Some(1));
    state.add_task(102, 10, "Pick stack", Some(0));
    state.add_task(103, 10, "Sketch UI", Some(1));
    state.add_task(104, 12, "Build API", None);
    state.add_task(201, 20, "Rotate keys", Some(0));
    state
}

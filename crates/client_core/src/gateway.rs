use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Board, BoardId, Column, ColumnId, Priority, Task, TaskId},
    error::ApiError,
    protocol::{
        BoardPatch, ColumnPatch, LoginForm, NewBoard, NewColumn, NewTask, Page, RegisterRequest,
        RegisteredUser, SearchQuery, TaskFilter, TaskPatch, TokenResponse,
    },
};
use tracing::debug;

use crate::error::{require_text, ClientError, ClientResult};

#[async_trait]
pub trait KanbanApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ClientResult<TokenResponse>;
    async fn register(&self, email: &str, password: &str) -> ClientResult<RegisteredUser>;

    async fn get_boards(&self, token: &str) -> ClientResult<Page<Board>>;
    async fn create_board(&self, name: &str, token: &str) -> ClientResult<Board>;
    async fn rename_board(&self, board_id: BoardId, name: &str, token: &str)
        -> ClientResult<Board>;
    async fn delete_board(&self, board_id: BoardId, token: &str) -> ClientResult<()>;

    async fn get_board_columns(&self, board_id: BoardId, token: &str)
        -> ClientResult<Page<Column>>;
    async fn create_column(
        &self,
        board_id: BoardId,
        name: &str,
        position: i64,
        token: &str,
    ) -> ClientResult<Column>;
    async fn update_column(
        &self,
        column_id: ColumnId,
        patch: &ColumnPatch,
        token: &str,
    ) -> ClientResult<Column>;
    async fn delete_column(&self, column_id: ColumnId, token: &str) -> ClientResult<()>;

    async fn get_tasks_by_column(
        &self,
        column_id: ColumnId,
        filter: TaskFilter,
        token: &str,
    ) -> ClientResult<Page<Task>>;
    async fn create_task(
        &self,
        column_id: ColumnId,
        title: &str,
        priority: Priority,
        token: &str,
        description: Option<&str>,
    ) -> ClientResult<Task>;
    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch, token: &str)
        -> ClientResult<Task>;
    async fn delete_task(&self, task_id: TaskId, token: &str) -> ClientResult<()>;
    async fn search_tasks(&self, query: &str, token: &str) -> ClientResult<Page<Task>>;
}

pub struct HttpApiClient {
    http: Client,
    api_base: String,
}

impl HttpApiClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_base)
    }

    pub fn with_timeout(api_base: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, api_base))
    }

    pub fn with_client(http: Client, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn bare_request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{path}", self.api_base);
        debug!(%method, %url, authenticated = token.is_some(), "api: request");
        let builder = self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        match token {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        self.bare_request(method, path, token)
            .header(header::CONTENT_TYPE, "application/json")
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path, token).json(body)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn fetch_ignoring_body(&self, builder: RequestBuilder) -> ClientResult<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Api(ApiError::from_response_parts(
        status.as_u16(),
        status.canonical_reason(),
        &body,
    )))
}

fn into_auth_error(err: ClientError) -> ClientError {
    match err {
        ClientError::Api(api) => ClientError::Auth {
            status: api.status,
            message: api.message,
        },
        other => other,
    }
}

#[async_trait]
impl KanbanApi for HttpApiClient {
    async fn login(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        require_text(email, "email")?;
        require_text(password, "password")?;
        let builder = self
            .bare_request(Method::POST, "/auth/login", None)
            .form(&LoginForm {
                username: email.to_string(),
                password: password.to_string(),
            });
        self.fetch(builder).await.map_err(into_auth_error)
    }

    async fn register(&self, email: &str, password: &str) -> ClientResult<RegisteredUser> {
        require_text(email, "email")?;
        require_text(password, "password")?;
        let builder = self.json_request(
            Method::POST,
            "/auth/register",
            None,
            &RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
            },
        );
        self.fetch(builder).await.map_err(into_auth_error)
    }

    async fn get_boards(&self, token: &str) -> ClientResult<Page<Board>> {
        self.fetch(self.request(Method::GET, "/boards/", Some(token)))
            .await
    }

    async fn create_board(&self, name: &str, token: &str) -> ClientResult<Board> {
        require_text(name, "name")?;
        let body = NewBoard {
            name: name.to_string(),
        };
        self.fetch(self.json_request(Method::POST, "/boards/", Some(token), &body))
            .await
    }

    async fn rename_board(
        &self,
        board_id: BoardId,
        name: &str,
        token: &str,
    ) -> ClientResult<Board> {
        require_text(name, "name")?;
        let body = BoardPatch {
            name: name.to_string(),
        };
        let path = format!("/boards/{board_id}");
        self.fetch(self.json_request(Method::PATCH, &path, Some(token), &body))
            .await
    }

    async fn delete_board(&self, board_id: BoardId, token: &str) -> ClientResult<()> {
        let path = format!("/boards/{board_id}");
        self.fetch_ignoring_body(self.request(Method::DELETE, &path, Some(token)))
            .await
    }

    async fn get_board_columns(
        &self,
        board_id: BoardId,
        token: &str,
    ) -> ClientResult<Page<Column>> {
        let path = format!("/boards/{board_id}/columns");
        self.fetch(self.request(Method::GET, &path, Some(token)))
            .await
    }

    async fn create_column(
        &self,
        board_id: BoardId,
        name: &str,
        position: i64,
        token: &str,
    ) -> ClientResult<Column> {
        require_text(name, "name")?;
        let body = NewColumn {
            board_id,
            name: name.to_string(),
            position,
        };
        self.fetch(self.json_request(Method::POST, "/columns/", Some(token), &body))
            .await
    }

    async fn update_column(
        &self,
        column_id: ColumnId,
        patch: &ColumnPatch,
        token: &str,
    ) -> ClientResult<Column> {
        if patch.is_empty() {
            return Err(ClientError::validation("column update must set a field"));
        }
        if let Some(name) = &patch.name {
            require_text(name, "name")?;
        }
        let path = format!("/columns/{column_id}");
        self.fetch(self.json_request(Method::PATCH, &path, Some(token), patch))
            .await
    }

    async fn delete_column(&self, column_id: ColumnId, token: &str) -> ClientResult<()> {
        let path = format!("/columns/{column_id}");
        self.fetch_ignoring_body(self.request(Method::DELETE, &path, Some(token)))
            .await
    }

    async fn get_tasks_by_column(
        &self,
        column_id: ColumnId,
        filter: TaskFilter,
        token: &str,
    ) -> ClientResult<Page<Task>> {
        let path = format!("/columns/{column_id}/tasks");
        let builder = self.request(Method::GET, &path, Some(token)).query(&filter);
        self.fetch(builder).await
    }

    async fn create_task(
        &self,
        column_id: ColumnId,
        title: &str,
        priority: Priority,
        token: &str,
        description: Option<&str>,
    ) -> ClientResult<Task> {
        require_text(title, "title")?;
        let body = NewTask {
            column_id,
            title: title.to_string(),
            priority,
            description: description.map(str::to_string),
        };
        self.fetch(self.json_request(Method::POST, "/tasks/", Some(token), &body))
            .await
    }

    async fn update_task(
        &self,
        task_id: TaskId,
        patch: &TaskPatch,
        token: &str,
    ) -> ClientResult<Task> {
        if patch.is_empty() {
            return Err(ClientError::validation("task update must set a field"));
        }
        let path = format!("/tasks/{task_id}");
        self.fetch(self.json_request(Method::PATCH, &path, Some(token), patch))
            .await
    }

    async fn delete_task(&self, task_id: TaskId, token: &str) -> ClientResult<()> {
        let path = format!("/tasks/{task_id}");
        self.fetch_ignoring_body(self.request(Method::DELETE, &path, Some(token)))
            .await
    }

    async fn search_tasks(&self, query: &str, token: &str) -> ClientResult<Page<Task>> {
        require_text(query, "query")?;
        let builder = self
            .request(Method::GET, "/tasks/", Some(token))
            .query(&SearchQuery { q: query });
        self.fetch(builder).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;

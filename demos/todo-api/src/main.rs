//! Todo API demo
//!
//! Describes a small REST API as data, binds it, and wraps the bound
//! interface in a typed trait implementation.
//!
//! ```text
//! TODO_API_URL=https://jsonplaceholder.typicode.com RUST_LOG=latch=debug cargo run -p todo-api-demo
//! ```

// Example-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use std::time::Duration;

use latch::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

// ============================================================================
// Data Types
// ============================================================================

/// A todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

/// Payload to create a todo.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

/// Partial update of a todo.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Description
// ============================================================================

/// The todo API, described as data.
#[must_use]
pub fn todo_api() -> InterfaceDescription {
    InterfaceDescription::new("TodoApi")
        .header("X-Client", "todo-api-demo")
        .method(
            MethodDescriptor::get("list_todos", "/todos")
                .query_param("userId")
                .query_param("completed")
                .error::<ApiProblem>(),
        )
        .method(
            MethodDescriptor::get("get_todo", "/todos/{id}")
                .path_param("id")
                .error::<ApiProblem>(),
        )
        .method(
            MethodDescriptor::post("create_todo", "/todos")
                .body_param("todo")
                .error::<ApiProblem>(),
        )
        .method(
            MethodDescriptor::patch("update_todo", "/todos/{id}")
                .path_param("id")
                .body_param("patch")
                .error::<ApiProblem>(),
        )
        .method(
            MethodDescriptor::delete("delete_todo", "/todos/{id}")
                .path_param("id")
                .returns_unit()
                .timeout(Duration::from_secs(5)),
        )
}

// ============================================================================
// Live implementation
// ============================================================================

/// Typed view of the todo API.
pub trait TodoApi {
    fn list_todos(
        &self,
        user_id: Option<u64>,
        completed: Option<bool>,
    ) -> impl Future<Output = latch::Result<Vec<Todo>>> + Send;

    fn get_todo(&self, id: u64) -> impl Future<Output = latch::Result<Todo>> + Send;

    fn create_todo(&self, todo: &NewTodo) -> impl Future<Output = latch::Result<Todo>> + Send;

    fn update_todo(
        &self,
        id: u64,
        patch: &TodoPatch,
    ) -> impl Future<Output = latch::Result<Todo>> + Send;

    fn delete_todo(&self, id: u64) -> impl Future<Output = latch::Result<()>> + Send;
}

/// [`TodoApi`] backed by a bound interface.
#[derive(Debug, Clone)]
pub struct TodoClient<C> {
    bound: BoundInterface<C>,
}

impl TodoClient<HyperClient> {
    /// Connect to `base_url` with retry and logging middleware.
    pub fn connect(base_url: &str) -> latch::Result<Self> {
        let client = HyperClient::builder()
            .with_retry(2)
            .with_logging()
            .build();
        Self::with_client(client, base_url)
    }
}

impl<C: HttpClient + 'static> TodoClient<C> {
    /// Bind the todo API over any transport.
    pub fn with_client(client: C, base_url: &str) -> latch::Result<Self> {
        let bound = Dispatcher::new(client, base_url)?.bind(&todo_api())?;
        Ok(Self { bound })
    }
}

impl<C: HttpClient + 'static> TodoApi for TodoClient<C> {
    async fn list_todos(
        &self,
        user_id: Option<u64>,
        completed: Option<bool>,
    ) -> latch::Result<Vec<Todo>> {
        self.bound.call("list_todos", args![user_id, completed]).await
    }

    async fn get_todo(&self, id: u64) -> latch::Result<Todo> {
        self.bound.call("get_todo", args![id]).await
    }

    async fn create_todo(&self, todo: &NewTodo) -> latch::Result<Todo> {
        self.bound.call("create_todo", args![todo]).await
    }

    async fn update_todo(&self, id: u64, patch: &TodoPatch) -> latch::Result<Todo> {
        self.bound.call("update_todo", args![id, patch]).await
    }

    async fn delete_todo(&self, id: u64) -> latch::Result<()> {
        self.bound.call("delete_todo", args![id]).await
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> latch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TODO_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let todos = TodoClient::connect(&base_url)?;
    tracing::info!(%base_url, "todo client ready");

    let open = todos.list_todos(Some(1), Some(false)).await?;
    println!("User 1 has {} open todos", open.len());

    let first = todos.get_todo(1).await?;
    println!("#{} {} (done: {})", first.id, first.title, first.completed);

    let created = todos
        .create_todo(&NewTodo {
            user_id: 1,
            title: "try latch".to_string(),
            completed: false,
        })
        .await?;
    println!("Created #{}", created.id);

    match todos.get_todo(0).await {
        Err(error) if error.is_not_found() => println!("Todo #0 does not exist"),
        Err(error) => return Err(error),
        Ok(todo) => println!("Unexpected todo {todo:?}"),
    }

    Ok(())
}

// ============================================================================
// Tests using wiremock
// ============================================================================

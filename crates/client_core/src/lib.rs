//! Client side of the TaskFlow kanban service: session handling, the REST
//! gateway, and the controller that keeps the on-screen board in sync.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub mod board;
pub mod config;
pub mod controller;
pub mod drag;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod notify;
pub mod session;

pub use board::{sort_by_position, BoardSnapshot, ColumnView};
pub use config::{load_settings, resolve_api_base, LaunchParams, Settings};
pub use controller::{BoardView, SyncController, ViewPhase};
pub use drag::DragContext;
pub use error::{ClientError, ClientResult};
pub use gateway::{HttpApiClient, KanbanApi};
pub use intent::{IgnoredDrop, Intent, MoveOutcome, Outcome};
pub use notify::{NoticeKind, NoopNotifier, Notifier};
pub use session::{
    FileSessionStorage, MemorySessionStorage, SessionStorage, SessionStore, TOKEN_STORAGE_KEY,
};

pub fn build_controller(
    settings: &Settings,
    launch: &LaunchParams,
    storage: Arc<dyn SessionStorage>,
    notifier: Arc<dyn Notifier>,
) -> Result<SyncController> {
    let api_base = resolve_api_base(launch, settings)?;
    info!(%api_base, "client: using api base");
    let api: Arc<dyn KanbanApi> = Arc::new(HttpApiClient::with_timeout(
        api_base,
        settings.request_timeout(),
    )?);
    let session =
        SessionStore::new(Arc::clone(&api), storage).with_launch_token(launch.token.clone());
    Ok(SyncController::new(api, session).with_notifier(notifier))
}

#[cfg(test)]
#[path = "tests/mock_server.rs"]
mod mock_server;

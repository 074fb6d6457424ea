//! Browser chat demo

mod page;
pub mod server;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

pub use server::{router, AppState};
pub use session::{ChatSession, PendingTurn, Turn};

use crate::config::ModelFamily;
use crate::engine::ChatBackend;
use crate::error::Result;

pub const DEFAULT_PORT: u16 = 7861;

/// Bind address for the demo. A set `DEBUG` variable selects local mode on an
/// OS-chosen port.
pub fn bind_addr(local: bool) -> SocketAddr {
    if local {
        ([127, 0, 0, 1], 0).into()
    } else {
        ([0, 0, 0, 0], DEFAULT_PORT).into()
    }
}

/// Serve the chat demo until the process is stopped.
pub async fn serve(backend: Arc<dyn ChatBackend>, model_type: ModelFamily) -> Result<()> {
    let local = std::env::var_os("DEBUG").is_some();
    let state = Arc::new(AppState::new(backend, model_type));
    let app = router(state);

    let listener = TcpListener::bind(bind_addr(local)).await?;
    let addr = listener.local_addr()?;
    if local {
        info!("chat demo running locally, open http://{addr}/");
    } else {
        info!(%addr, "chat demo listening");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

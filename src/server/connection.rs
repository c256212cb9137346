// Connection module
// Serves one accepted TCP stream as HTTP/1.1 on the local task set

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;

/// Spawn a task serving `stream` until the client closes it.
///
/// Keep-alive is on; no read or write timeout is applied, so a stalled
/// handler holds its connection open.
pub fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<AppState>,
    active: Arc<AtomicUsize>,
) {
    active.fetch_add(1, Ordering::SeqCst);
    tracing::trace!(%peer, "connection accepted");

    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| handler::handle_request(req, Arc::clone(&state), peer));

        if let Err(err) = http1::Builder::new()
            .keep_alive(true)
            .serve_connection(io, service)
            .await
        {
            tracing::debug!(%peer, error = %err, "connection closed with error");
        }

        active.fetch_sub(1, Ordering::SeqCst);
    });
}

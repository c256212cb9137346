// Server loop module
// Accepts connections until shutdown is signalled

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::serve_connection;
use crate::config::AppState;

/// Accept loop. Must run inside a `LocalSet`; connections are spawned
/// with `spawn_local`.
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    serve_connection(stream, peer, Arc::clone(&state), Arc::clone(&active));
                }
                Err(e) => tracing::error!(error = %e, "failed to accept connection"),
            },
            () = shutdown.notified() => {
                tracing::info!(
                    active_connections = active.load(Ordering::SeqCst),
                    "shutdown requested, no longer accepting connections"
                );
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::middleware::HandlerRegistry;
    use crate::plugins::PluginRegistry;
    use crate::routing::MemoryFs;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_request_then_stops() {
        let fs = Arc::new(MemoryFs::new().with_file("routes/index.ejs", "hello"));
        let state = Arc::new(AppState::new(
            Config::default(),
            fs,
            PluginRegistry::empty(),
            HandlerRegistry::with_builtins(),
        ));
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    state,
                    Arc::clone(&shutdown),
                ));

                let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
                client
                    .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                    .await
                    .unwrap();
                let mut raw = String::new();
                client.read_to_string(&mut raw).await.unwrap();
                assert!(raw.starts_with("HTTP/1.1 200 OK"));
                assert!(raw.ends_with("hello"));

                shutdown.notify_one();
                server.await.unwrap();
            })
            .await;
    }
}

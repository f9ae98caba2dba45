use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, broadcast};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ServerConfig;
use crate::connection::{Connection, PollTimeouts, SocketConnection};
use crate::host::Application;
use crate::http::response::StatusCode;
use crate::http::worker;
use crate::server::events::{RequestCompleted, RequestEvents};

const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Stops a running [`SocketServer`]. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // the acceptor is the only waiter; a stored permit covers a call
        // made before it starts waiting
        self.notify.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Counts a connection as active for as long as it lives.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// TCP front end: one request per accepted connection.
///
/// The acceptor runs on the async runtime and only ever waits on `accept`.
/// Each connection is handed to the blocking pool, which owns it until the
/// response is closed.
pub struct SocketServer {
    listener: TcpListener,
    app: Arc<dyn Application>,
    config: ServerConfig,
    events: RequestEvents,
    shutdown: ShutdownHandle,
    active: Arc<AtomicUsize>,
}

impl SocketServer {
    /// Binds `config.listen_addr`. Port 0 picks a free port.
    pub async fn bind(config: &ServerConfig, app: Arc<dyn Application>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        info!(addr = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            app,
            config: config.clone(),
            events: RequestEvents::new(config.event_capacity),
            shutdown: ShutdownHandle::default(),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// `http://host[:port]/vpath` for the bound address.
    pub fn root_url(&self) -> anyhow::Result<Url> {
        let addr = self.listener.local_addr()?;
        let ip = addr.ip();

        let host = if ip.is_loopback() || ip.is_unspecified() {
            "localhost".to_string()
        } else if ip.is_ipv6() {
            format!("[{ip}]")
        } else {
            ip.to_string()
        };

        // the url crate drops the default port on its own
        let url = Url::parse(&format!(
            "http://{host}:{}{}",
            addr.port(),
            self.app.paths().virtual_path()
        ))?;
        Ok(url)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestCompleted> {
        self.events.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accepts connections until shut down, then waits for the active ones
    /// to finish or for the drain timeout to pass.
    pub async fn run(self) -> anyhow::Result<()> {
        let backoff = self.config.accept_backoff();

        while !self.shutdown.is_shutdown() {
            tokio::select! {
                _ = self.shutdown.wait() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!(%peer, "Accepted connection");
                        self.dispatch(socket);
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed, retrying");
                        tokio::time::sleep(backoff).await;
                    }
                },
            }
        }

        let SocketServer { listener, active, config, .. } = self;
        drop(listener);
        info!("Shutting down");

        drain(&active, config.drain_timeout()).await;
        Ok(())
    }

    fn dispatch(&self, socket: TcpStream) {
        let stream = match socket.into_std().and_then(|s| {
            s.set_nonblocking(false)?;
            Ok(s)
        }) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Failed to take over accepted socket");
                return;
            }
        };

        let app = Arc::clone(&self.app);
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        let timeouts = self.config.poll_timeouts();
        let guard = ActiveGuard::new(Arc::clone(&self.active));

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            if let Err(e) = serve_connection(stream, app.as_ref(), &events, &shutdown, timeouts) {
                error!(error = %e, "Connection error");
            }
        });
    }
}

/// Runs one connection to completion on the calling thread.
fn serve_connection(
    stream: std::net::TcpStream,
    app: &dyn Application,
    events: &RequestEvents,
    shutdown: &ShutdownHandle,
    timeouts: PollTimeouts,
) -> anyhow::Result<()> {
    let mut conn = SocketConnection::new(stream, app.paths(), timeouts);

    if shutdown.is_shutdown() {
        conn.close();
        return Ok(());
    }

    let result = if conn.wait_for_request_bytes() == 0 {
        debug!(connection = %conn.id(), "No request bytes arrived");
        conn.write_error_and_close(StatusCode::BAD_REQUEST, None);
        Ok(())
    } else {
        worker::process(app, &mut conn)
    };

    conn.close();
    events.publish(&conn);
    result
}

async fn drain(active: &AtomicUsize, timeout: Duration) {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = active.load(Ordering::SeqCst);
        if remaining == 0 {
            info!("All connections drained");
            return;
        }
        if Instant::now() >= deadline {
            warn!(remaining, "Drain timed out with active connections");
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

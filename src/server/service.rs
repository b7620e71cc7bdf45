//! TCP Server Service
//!
//! Owns the acceptor and the per-connection lifecycle. The server moves
//! through four states:
//!
//! `Created -> Running (start) -> Stopping (stop) -> Drained (counter == 0)`
//!
//! `start` is rejected outside `Created`; `stop` outside `Running` is a
//! no-op. The in-flight counter is incremented at accept time and
//! decremented once the connection's response write has finished (or
//! failed), which is what makes the drain in `wait_drained` safe.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use super::framing;
use super::shutdown::Stoppable;
use crate::pool::executor::TaskPool;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);
const DRAIN_CHECK_INTERVAL: Duration = Duration::from_millis(500);

pub type RequestHandler = dyn Fn(String) -> String + Send + Sync;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("request handler is not set")]
    HandlerNotSet,
    #[error("server was already started")]
    AlreadyStarted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum State {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Drained = 3,
}

pub struct TcpServer {
    pool: TaskPool,
    handler: Option<Arc<RequestHandler>>,
    state: AtomicU8,
    connections: AtomicUsize,
    shutdown: Notify,
}

impl TcpServer {
    pub fn new(pool: TaskPool) -> Self {
        Self {
            pool,
            handler: None,
            state: AtomicU8::new(State::Created as u8),
            connections: AtomicUsize::new(0),
            shutdown: Notify::new(),
        }
    }

    /// Registers the request handler. Must be called before `start`; the
    /// handler is responsible for producing its own error envelopes.
    pub fn set_task<F>(&mut self, task: F)
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(task));
    }

    /// Binds IPv4 `0.0.0.0:port` and begins accepting. Returns the bound
    /// address (useful when `port` is 0).
    pub async fn start(self: Arc<Self>, port: u16) -> Result<SocketAddr, ServerError> {
        let handler = self
            .handler
            .clone()
            .ok_or(ServerError::HandlerNotSet)?;

        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let local_addr = listener.local_addr()?;

        self.state
            .compare_exchange(
                State::Created as u8,
                State::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| ServerError::AlreadyStarted)?;

        let server = self.clone();
        tokio::spawn(async move {
            server.accept_loop(listener, handler).await;
        });

        tracing::info!("Server started on port {}", local_addr.port());
        Ok(local_addr)
    }

    /// Idempotently closes the acceptor and begins the drain. In-flight
    /// connections are left to finish; `wait_drained` observes the end.
    pub fn stop(&self) {
        if self
            .state
            .compare_exchange(
                State::Running as u8,
                State::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        // notify_one stores a permit, so the acceptor wakes even if it is
        // between two awaits when stop is called.
        self.shutdown.notify_one();

        let in_flight = self.connections.load(Ordering::SeqCst);
        if in_flight > 0 {
            tracing::info!("Waiting for {} connections to finish", in_flight);
        }
    }

    /// Runs the drain monitor: checks the in-flight counter every 500 ms
    /// once the server is stopping, and returns when it reaches zero. The
    /// caller treats this as its run-to-completion point.
    pub async fn wait_drained(&self) {
        let mut ticker = tokio::time::interval(DRAIN_CHECK_INTERVAL);
        loop {
            ticker.tick().await;
            match self.state() {
                State::Drained => return,
                State::Stopping => {
                    if self.connections.load(Ordering::SeqCst) == 0 {
                        self.state.store(State::Drained as u8, Ordering::SeqCst);
                        tracing::info!("All connections finished, server drained");
                        return;
                    }
                }
                State::Created | State::Running => {}
            }
        }
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener, handler: Arc<RequestHandler>) {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!("New connection from {}", peer);
                        self.connections.fetch_add(1, Ordering::SeqCst);
                        let server = self.clone();
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            server.process_connection(stream, handler).await;
                        });
                    }
                    Err(error) => {
                        if self.state() != State::Running {
                            // The acceptor is being torn down; its socket
                            // errors are expected and terminal.
                            break;
                        }
                        tracing::error!("Error accepting connection: {}", error);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                }
            }
        }
        tracing::debug!("Acceptor closed");
        // Dropping the listener here refuses any further connections.
    }

    async fn process_connection(&self, mut stream: TcpStream, handler: Arc<RequestHandler>) {
        match framing::read_frame(&mut stream).await {
            Ok(Some(request)) => {
                tracing::debug!("Request: {}", escape_text(&request));
                match self.pool.submit(move || handler(request)) {
                    Ok(handle) => match handle.join().await {
                        Ok(response) => {
                            tracing::debug!("Response: {}", escape_text(&response));
                            if let Err(error) = framing::write_frame(&mut stream, &response).await {
                                tracing::error!("Error sending response: {}", error);
                            }
                        }
                        Err(error) => {
                            tracing::error!("Error processing connection: {}", error);
                        }
                    },
                    Err(error) => {
                        tracing::error!("Error processing connection: {}", error);
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("Connection closed before a request arrived");
            }
            Err(error) => {
                tracing::error!("Error reading request: {}", error);
            }
        }
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }

    fn state(&self) -> State {
        match self.state.load(Ordering::SeqCst) {
            0 => State::Created,
            1 => State::Running,
            2 => State::Stopping,
            _ => State::Drained,
        }
    }
}

impl Stoppable for TcpServer {
    fn stop(&self) {
        TcpServer::stop(self);
    }
}

fn escape_text(text: &str) -> String {
    text.replace("\r\n", "\\r\\n")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

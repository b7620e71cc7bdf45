//! TCP Client Module
//!
//! A minimal client for the worker's command protocol, speaking the same
//! `\r\n\r\n` framing as the server, plus the periodic requester that the
//! orchestrator role runs against a worker.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::server::framing;

const REQUEST_INTERVAL: Duration = Duration::from_secs(3);

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        tracing::debug!("Connected to server at {}:{}", host, port);
        Ok(Self { stream })
    }

    /// Sends one framed request and waits for the framed response, with
    /// the terminator stripped.
    pub async fn request(&mut self, body: &str) -> io::Result<String> {
        framing::write_frame(&mut self.stream, body).await?;
        framing::read_frame(&mut self.stream).await?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "connection closed before a response arrived",
            )
        })
    }
}

/// Fires an `[echo]` request at a worker every three seconds, logging the
/// outcome. Failures are reported and the cadence continues; the loop only
/// ends with the process.
pub struct PeriodicRequester {
    host: String,
    port: u16,
}

impl PeriodicRequester {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(REQUEST_INTERVAL);
        loop {
            ticker.tick().await;
            tracing::info!("Sending periodic request");
            match self.send_once().await {
                Ok(response) => tracing::info!("Received response: {}", response),
                Err(error) => tracing::error!("Periodic request failed: {}", error),
            }
        }
    }

    async fn send_once(&self) -> io::Result<String> {
        let mut client = Client::connect(&self.host, self.port).await?;
        client.request("[echo] Hello").await
    }
}

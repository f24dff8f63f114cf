//! TCP listener and the server's readiness loop.
//!
//! One readiness set covers the listener, the control input (stdin),
//! and every connection with an outstanding request. The protocol is
//! strictly one request per connection: read once into a bounded
//! buffer, reply (or drop silently), close.

use std::io;
use std::net::SocketAddr;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::ServerState;
use crate::signals::ShutdownSignal;

/// The rendezvous server: a loopback TCP listener plus the state it
/// serves. Everything runs on one event-loop task; the registry is
/// never touched from anywhere else.
pub struct RendezvousServer {
    config: ServerConfig,
    listener: TcpListener,
    state: ServerState,
}

impl RendezvousServer {
    /// Binds the listener on the loopback interface.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "server listening");
        Ok(Self {
            config,
            listener,
            state: ServerState::new(),
        })
    }

    /// The bound address (useful when the configured port was 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the event loop until `shutdown` fires, with stdin as the
    /// control input.
    ///
    /// On shutdown every open connection is dropped without a protocol
    /// message; clients treat the close like a QUIT.
    pub async fn run_until_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let control = BufReader::new(tokio::io::stdin());
        self.run_with_control(control, shutdown).await
    }

    /// Same loop with an explicit control input. Tests pass
    /// [`tokio::io::empty`] to leave the process's stdin alone.
    pub async fn run_with_control<R>(self, control: R, shutdown: ShutdownSignal) -> ServerResult<()>
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        let Self {
            config,
            listener,
            mut state,
        } = self;

        let mut control = control.lines();
        let mut control_open = true;
        let mut pending = FuturesUnordered::new();
        let shutdown = shutdown.wait();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(%addr, "new connection");
                        pending.push(read_one_request(stream, addr, config.recv_buffer));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                Some((stream, addr, request)) = pending.next(), if !pending.is_empty() => {
                    dispatch(&mut state, &config, stream, addr, request).await;
                }
                line = control.next_line(), if control_open => match line {
                    Ok(Some(line)) => handle_control(&state, line.trim()),
                    Ok(None) => {
                        debug!("control input closed");
                        control_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "control input error");
                        control_open = false;
                    }
                },
                _ = &mut shutdown => {
                    info!(open_connections = pending.len(), "shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Reads one bounded request from a fresh connection. Zero bytes means
/// the client closed without sending anything.
async fn read_one_request(
    mut stream: TcpStream,
    addr: SocketAddr,
    buf_size: usize,
) -> (TcpStream, SocketAddr, io::Result<Vec<u8>>) {
    let mut buf = vec![0u8; buf_size];
    let result = stream.read(&mut buf).await.map(|n| {
        buf.truncate(n);
        buf
    });
    (stream, addr, result)
}

/// Handles one completed request read: dispatch, reply, close.
///
/// A failure here only costs this connection, never the loop.
async fn dispatch(
    state: &mut ServerState,
    config: &ServerConfig,
    mut stream: TcpStream,
    addr: SocketAddr,
    request: io::Result<Vec<u8>>,
) {
    let data = match request {
        Ok(data) => data,
        Err(e) => {
            warn!(%addr, error = %e, "read failed");
            return;
        }
    };
    if data.is_empty() {
        debug!(%addr, "connection closed without a request");
        return;
    }

    let Some(reply) = state.handle_request(&data, addr) else {
        return;
    };

    let write = async {
        stream.write_all(&reply).await?;
        stream.flush().await
    };
    match tokio::time::timeout(config.request_timeout, write).await {
        Ok(Ok(())) => debug!(%addr, "reply sent"),
        Ok(Err(e)) => warn!(%addr, error = %e, "reply failed"),
        Err(_) => warn!(%addr, "reply timed out"),
    }
}

/// One line of operator input: `/info` lists registrations, anything
/// else is reported as unknown.
fn handle_control(state: &ServerState, line: &str) {
    if line.is_empty() {
        return;
    }
    if line == "/info" {
        print!("{}", state.info_listing());
    } else {
        eprintln!("Error: unknown command: {line}");
    }
}

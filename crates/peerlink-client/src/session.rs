//! The interactive session: one event loop per lifecycle state.
//!
//! A session starts in Zero (idle, awaiting a command), moves to Wait
//! when a bridge request finds no peer, and into Chat once a peer
//! connection exists — dialed via `/chat` or accepted while waiting.
//! Quit is terminal; its entry action sends a best-effort farewell to
//! an open peer socket.
//!
//! Every state is a `select!` over the user's input and whatever
//! socket defines the state, so `/quit` (and Ctrl+C, which is treated
//! the same) stays responsive no matter what the network does.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use peerlink_protocol::{MAX_MESSAGE_SIZE, Message, PeerAddr, QUIT_FAREWELL};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::rendezvous::RendezvousClient;
use crate::state::{BridgeOutcome, Input, Turn, bridge_outcome, classify};

/// Bound on the farewell QUIT write so quitting never hangs on a dead
/// peer.
const QUIT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Peer connections are only advertised and accepted on loopback.
const LOOPBACK: &str = "127.0.0.1";

/// Client lifecycle states. Wait and Chat own the socket that defines
/// them, so leaving a state closes its connection.
enum ClientState {
    Zero,
    Wait { listener: TcpListener },
    Chat { stream: TcpStream, turn: Turn },
    Quit { stream: Option<TcpStream> },
}

/// Outcome of attempting to send one chat line.
enum SendOutcome {
    Sent,
    Rejected,
    PeerGone,
}

/// An interactive client session.
pub struct Session {
    config: ClientConfig,
    rendezvous: RendezvousClient,
    registered: bool,
    peer: Option<PeerAddr>,
}

impl Session {
    /// Creates a session from a resolved configuration.
    pub fn new(config: ClientConfig) -> Self {
        let rendezvous = RendezvousClient::new(config.server_addr, config.request_timeout);
        Self {
            config,
            rendezvous,
            registered: false,
            peer: None,
        }
    }

    /// Runs the session on stdin until the user or the peer quits.
    ///
    /// Returns `Ok(())` on any orderly quit, so the process exits 0.
    pub async fn run(self) -> ClientResult<()> {
        let input = BufReader::new(tokio::io::stdin());
        self.run_with_input(input).await
    }

    /// Same loop with an explicit input source (tests feed a pipe).
    pub async fn run_with_input<R>(mut self, input: R) -> ClientResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        println!(
            "peerlink {} — commands: /register /bridge /chat /id /quit",
            self.config.client_id
        );
        let mut lines = input.lines();
        let mut state = ClientState::Zero;
        loop {
            state = match state {
                ClientState::Zero => self.zero_loop(&mut lines).await?,
                ClientState::Wait { listener } => self.wait_loop(&mut lines, listener).await?,
                ClientState::Chat { stream, turn } => {
                    self.chat_loop(&mut lines, stream, turn).await?
                }
                ClientState::Quit { stream } => {
                    self.quit(stream).await;
                    return Ok(());
                }
            };
        }
    }

    /// Zero: idle, dispatching commands.
    async fn zero_loop<R>(&mut self, lines: &mut Lines<R>) -> ClientResult<ClientState>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(ClientState::Quit { stream: None });
                    };
                    match classify(&line) {
                        Input::Id => println!("{}", self.config.client_id),
                        Input::Quit => return Ok(ClientState::Quit { stream: None }),
                        Input::Register => self.register().await,
                        Input::Bridge => {
                            if let Some(next) = self.bridge().await {
                                return Ok(next);
                            }
                        }
                        Input::Chat => {
                            if let Some(stream) = self.dial_peer().await {
                                return Ok(ClientState::Chat {
                                    stream,
                                    turn: Turn::initial(true),
                                });
                            }
                        }
                        Input::Empty => {}
                        Input::Unknown(cmd) => eprintln!("Error: invalid command: {cmd}"),
                        Input::Text(_) => {
                            eprintln!(
                                "Error: invalid command (use /register, /bridge, /chat, /id or /quit)"
                            );
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => return Ok(ClientState::Quit { stream: None }),
            }
        }
    }

    /// `/register`: one REGISTER/REGACK exchange. Duplicate and failed
    /// registrations are reported without changing state.
    async fn register(&mut self) {
        if self.registered {
            eprintln!("Error: already registered");
            return;
        }
        match self
            .rendezvous
            .register(&self.config.client_id, LOOPBACK, self.config.listen_port)
            .await
        {
            Ok(()) => {
                self.registered = true;
                println!(
                    "registered with server {} as {} ({}:{})",
                    self.rendezvous.server_addr(),
                    self.config.client_id,
                    LOOPBACK,
                    self.config.listen_port
                );
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    /// `/bridge`: one BRIDGE/BRIDGEACK exchange. An empty answer moves
    /// us to Wait; a peer in hand is remembered for `/chat`.
    async fn bridge(&mut self) -> Option<ClientState> {
        if !self.registered {
            eprintln!("Error: not registered (use /register first)");
            return None;
        }
        let peer = match self.rendezvous.bridge(&self.config.client_id).await {
            Ok(peer) => peer,
            Err(e) => {
                eprintln!("Error: {e}");
                return None;
            }
        };
        match bridge_outcome(peer) {
            BridgeOutcome::WaitForPeer => {
                match TcpListener::bind((LOOPBACK, self.config.listen_port)).await {
                    Ok(listener) => {
                        println!("no peer available yet, waiting for one to connect");
                        Some(ClientState::Wait { listener })
                    }
                    Err(e) => {
                        eprintln!(
                            "Error: cannot listen on {LOOPBACK}:{}: {e}",
                            self.config.listen_port
                        );
                        None
                    }
                }
            }
            BridgeOutcome::PeerKnown(peer) => {
                println!("peer available: {peer} — use /chat to connect");
                self.peer = Some(peer);
                None
            }
        }
    }

    /// `/chat`: dial the bridged peer.
    async fn dial_peer(&mut self) -> Option<TcpStream> {
        let Some(peer) = &self.peer else {
            eprintln!("Error: no peer known (use /bridge first)");
            return None;
        };
        let addr = format!("{}:{}", peer.ip, peer.port);
        match tokio::time::timeout(self.config.request_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                println!("connected to {peer}; it is your turn to type");
                Some(stream)
            }
            Ok(Err(e)) => {
                // The server hands out peers without reserving them, so
                // the peer may be gone or already chatting with someone.
                eprintln!("Error: failed to connect to {peer}: {e}");
                None
            }
            Err(_) => {
                eprintln!("Error: timed out connecting to {peer}");
                None
            }
        }
    }

    /// Wait: listening for the peer that was told to dial us.
    async fn wait_loop<R>(
        &mut self,
        lines: &mut Lines<R>,
        listener: TcpListener,
    ) -> ClientResult<ClientState>
    where
        R: AsyncBufRead + Unpin,
    {
        println!(
            "listening on {LOOPBACK}:{} — /quit to stop waiting",
            self.config.listen_port
        );
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        println!("peer connected from {addr}; waiting for their first message");
                        return Ok(ClientState::Chat {
                            stream,
                            turn: Turn::initial(false),
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(ClientState::Quit { stream: None });
                    };
                    match classify(&line) {
                        Input::Id => println!("{}", self.config.client_id),
                        Input::Quit => return Ok(ClientState::Quit { stream: None }),
                        Input::Empty => {}
                        _ => eprintln!("Error: invalid command while waiting (/id or /quit)"),
                    }
                }
                _ = tokio::signal::ctrl_c() => return Ok(ClientState::Quit { stream: None }),
            }
        }
    }

    /// Chat: strict turn-based messaging until either side quits.
    async fn chat_loop<R>(
        &mut self,
        lines: &mut Lines<R>,
        mut stream: TcpStream,
        mut turn: Turn,
    ) -> ClientResult<ClientState>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(ClientState::Quit { stream: Some(stream) });
                    };
                    match classify(&line) {
                        Input::Quit => return Ok(ClientState::Quit { stream: Some(stream) }),
                        Input::Id => println!("{}", self.config.client_id),
                        Input::Empty => {}
                        Input::Register | Input::Bridge | Input::Chat => {
                            eprintln!("Error: not available during chat (/id, /quit or a message)");
                        }
                        Input::Unknown(cmd) => eprintln!("Error: invalid command: {cmd}"),
                        Input::Text(text) => {
                            if turn == Turn::Recv {
                                // Not queued: the turn protocol forbids
                                // two sends without a receive between.
                                eprintln!("not your turn — waiting for {}", self.peer_label());
                                continue;
                            }
                            match self.send_chat(&mut stream, text).await {
                                SendOutcome::Sent => turn = turn.flip(),
                                SendOutcome::Rejected => {}
                                SendOutcome::PeerGone => {
                                    return Ok(ClientState::Quit { stream: None });
                                }
                            }
                        }
                    }
                }
                read = stream.read(&mut buf) => match read {
                    Ok(0) => {
                        println!("peer disconnected");
                        return Ok(ClientState::Quit { stream: None });
                    }
                    Ok(n) => {
                        if let Some(next) = self.on_peer_bytes(&buf[..n], &mut turn) {
                            return Ok(next);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: connection to peer lost: {e}");
                        return Ok(ClientState::Quit { stream: None });
                    }
                },
                _ = tokio::signal::ctrl_c() => return Ok(ClientState::Quit { stream: Some(stream) }),
            }
        }
    }

    /// Sends one CHAT message. Oversized input is rejected locally,
    /// since the peer reads each message with one bounded read.
    async fn send_chat(&self, stream: &mut TcpStream, text: String) -> SendOutcome {
        let bytes = Message::Chat { text }.encode();
        if bytes.len() > MAX_MESSAGE_SIZE {
            eprintln!(
                "Error: message too long ({} bytes, max {})",
                bytes.len(),
                MAX_MESSAGE_SIZE
            );
            return SendOutcome::Rejected;
        }
        let result = async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        }
        .await;
        match result {
            Ok(()) => SendOutcome::Sent,
            Err(e) => {
                eprintln!("Error: failed to send, peer is gone: {e}");
                SendOutcome::PeerGone
            }
        }
    }

    /// Handles one message worth of bytes from the peer. Returns the
    /// next state when the chat is over.
    fn on_peer_bytes(&self, data: &[u8], turn: &mut Turn) -> Option<ClientState> {
        match Message::decode(data) {
            Ok(Message::Chat { text }) => {
                if *turn == Turn::Send {
                    // A conforming peer never talks during our turn.
                    warn!("peer sent CHAT out of turn, ignoring");
                } else {
                    println!("{}: {text}", self.peer_label());
                    *turn = turn.flip();
                }
                None
            }
            Ok(Message::Quit { farewell }) => {
                if farewell.is_empty() {
                    println!("peer left the chat");
                } else {
                    println!("peer left the chat: {farewell}");
                }
                Some(ClientState::Quit { stream: None })
            }
            Ok(other) => {
                warn!(verb = %other.verb(), "unexpected verb on chat connection, ignoring");
                None
            }
            Err(e) => {
                warn!(error = %e, "malformed message from peer, ignoring");
                None
            }
        }
    }

    /// Quit entry action: best-effort farewell, never blocking.
    async fn quit(&mut self, stream: Option<TcpStream>) {
        if let Some(mut stream) = stream {
            let farewell = Message::Quit {
                farewell: QUIT_FAREWELL.to_string(),
            };
            let write = async {
                stream.write_all(&farewell.encode()).await?;
                stream.flush().await
            };
            match tokio::time::timeout(QUIT_WRITE_TIMEOUT, write).await {
                Ok(Ok(())) => println!("sent QUIT to peer"),
                Ok(Err(e)) => debug!(error = %e, "farewell not delivered"),
                Err(_) => debug!("farewell write timed out"),
            }
        }
        self.peer = None;
        println!("bye");
    }

    fn peer_label(&self) -> &str {
        self.peer
            .as_ref()
            .map(|p| p.client_id.as_str())
            .unwrap_or("peer")
    }
}

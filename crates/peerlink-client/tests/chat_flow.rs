//! End-to-end client flow: register, bridge, wait, dial, chat, quit.
//!
//! Two sessions talk through a real rendezvous server and then to each
//! other over a real peer connection. Input is fed through pipes, paced
//! so each command lands after the previous one took effect.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};

use peerlink_client::{ClientConfig, Session};
use peerlink_server::{RendezvousServer, ServerConfig, SignalHandler};

fn config(id: &str, listen_port: u16, server_addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        client_id: id.to_string(),
        listen_port,
        server_addr,
        request_timeout: Duration::from_secs(5),
    }
}

async fn start_server() -> (SocketAddr, SignalHandler) {
    let server = RendezvousServer::bind(ServerConfig::new(0)).await.unwrap();
    let addr = server.local_addr().unwrap();
    let signals = SignalHandler::new();
    let shutdown = signals.shutdown();
    tokio::spawn(async move {
        server
            .run_with_control(tokio::io::empty(), shutdown)
            .await
            .unwrap();
    });
    (addr, signals)
}

async fn feed(input: &mut DuplexStream, line: &str) {
    input.write_all(line.as_bytes()).await.unwrap();
    input.write_all(b"\n").await.unwrap();
    // Let the command take effect before the next one.
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn full_bridge_and_chat_flow() {
    tokio::time::timeout(Duration::from_secs(30), scenario())
        .await
        .expect("scenario timed out");
}

async fn scenario() {
    let (server_addr, signals) = start_server().await;

    let (alice_input, mut alice_feed) = tokio::io::duplex(256);
    let alice = Session::new(config("alice", 47101, server_addr));
    let alice_task = tokio::spawn(alice.run_with_input(BufReader::new(alice_input)));

    let (bob_input, mut bob_feed) = tokio::io::duplex(256);
    let bob = Session::new(config("bob", 47102, server_addr));
    let bob_task = tokio::spawn(bob.run_with_input(BufReader::new(bob_input)));

    // Alice registers first and bridges into the empty registry, which
    // puts her in the waiting state, listening on her port.
    feed(&mut alice_feed, "/register").await;
    feed(&mut alice_feed, "/bridge").await;

    // Bob registers, is handed alice, and dials her.
    feed(&mut bob_feed, "/register").await;
    feed(&mut bob_feed, "/bridge").await;
    feed(&mut bob_feed, "/chat").await;

    // Bob dialed, so he sends first; turns alternate from there.
    feed(&mut bob_feed, "hello alice").await;
    feed(&mut alice_feed, "hi bob").await;

    // Bob quits; his farewell QUIT moves alice to quit as well.
    feed(&mut bob_feed, "/quit").await;

    bob_task.await.unwrap().unwrap();
    alice_task.await.unwrap().unwrap();

    signals.trigger_shutdown();
}

#[tokio::test]
async fn waiting_client_can_quit_without_a_peer() {
    tokio::time::timeout(Duration::from_secs(30), async {
        let (server_addr, signals) = start_server().await;

        let (input, mut source) = tokio::io::duplex(256);
        let session = Session::new(config("carol", 47103, server_addr));
        let task = tokio::spawn(session.run_with_input(BufReader::new(input)));

        feed(&mut source, "/register").await;
        feed(&mut source, "/bridge").await;
        feed(&mut source, "/quit").await;

        task.await.unwrap().unwrap();
        signals.trigger_shutdown();
    })
    .await
    .expect("scenario timed out");
}

#[tokio::test]
async fn closing_input_quits_the_session() {
    tokio::time::timeout(Duration::from_secs(30), async {
        let (server_addr, signals) = start_server().await;

        let (input, source) = tokio::io::duplex(256);
        let session = Session::new(config("dave", 47104, server_addr));
        let task = tokio::spawn(session.run_with_input(BufReader::new(input)));

        drop(source);

        task.await.unwrap().unwrap();
        signals.trigger_shutdown();
    })
    .await
    .expect("scenario timed out");
}

#![allow(dead_code)]

use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bridge_runtime::{read_frame, write_frame};
use core_bridge::{
    bridge, BridgeHandle, BridgeMetrics, BridgePump, HeadlessClient, ObservationConfig,
    QueueFullPolicy, RequestHandler, RequestServer, ServerConfig, ShutdownReport,
};
use serde_json::Value;

/// A request server on an ephemeral port plus, optionally, a host thread that
/// owns the simulation and pumps the bridge.
pub struct Harness {
    server: RequestServer,
    handle: BridgeHandle,
    pub metrics: Arc<BridgeMetrics>,
    running: Arc<AtomicBool>,
    host: Option<JoinHandle<HeadlessClient>>,
    pump: Option<BridgePump>,
}

impl Harness {
    pub fn start(client: HeadlessClient) -> Self {
        Self::build(client, 64, QueueFullPolicy::Reject, true)
    }

    /// No host thread: queued work is never run.
    pub fn without_host(capacity: usize) -> Self {
        Self::build(HeadlessClient::new(), capacity, QueueFullPolicy::Reject, false)
    }

    fn build(
        mut client: HeadlessClient,
        capacity: usize,
        policy: QueueFullPolicy,
        with_host: bool,
    ) -> Self {
        let metrics = Arc::new(BridgeMetrics::default());
        let (handle, mut pump) = bridge(capacity, policy, Arc::clone(&metrics));
        let handler = RequestHandler::new(
            handle.clone(),
            ObservationConfig::default(),
            Duration::from_millis(if with_host { 5_000 } else { 100 }),
            Arc::clone(&metrics),
        );
        let config = ServerConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            accept_poll_ms: 5,
            ..ServerConfig::default()
        };
        let server = RequestServer::start(&config, handler).expect("server should start");

        let running = Arc::new(AtomicBool::new(true));
        let (host, pump) = if with_host {
            let running = Arc::clone(&running);
            let host = thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    pump.run_pending(&mut client);
                    thread::sleep(Duration::from_millis(2));
                }
                pump.run_pending(&mut client);
                client
            });
            (Some(host), None)
        } else {
            (None, Some(pump))
        };

        Self {
            server,
            handle,
            metrics,
            running,
            host,
            pump,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn connect(&self) -> Connection {
        let stream = TcpStream::connect(self.addr()).expect("connect to request server");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("set read timeout");
        Connection { stream }
    }

    /// Block until every unit queued before this call has run.
    pub fn sync(&self) {
        self.handle
            .call("sync", |_| (), Duration::from_secs(5))
            .expect("host thread should drain the queue");
    }

    /// Stop the server and the host, handing back the simulation.
    pub fn finish(mut self) -> (Option<HeadlessClient>, ShutdownReport) {
        self.handle.close();
        let report = self.server.stop();
        self.running.store(false, Ordering::SeqCst);
        let client = self
            .host
            .take()
            .map(|host| host.join().expect("host thread panicked"));
        if let Some(pump) = self.pump.as_mut() {
            pump.discard_pending();
        }
        (client, report)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    pub fn send_raw(&mut self, frame: &[u8]) -> Option<String> {
        write_frame(&mut self.stream, frame).expect("write request frame");
        read_frame(&mut self.stream, 1 << 20)
            .expect("read reply frame")
            .map(|bytes| String::from_utf8(bytes).expect("reply is utf-8"))
    }

    pub fn send(&mut self, message: &str) -> String {
        self.send_raw(message.as_bytes())
            .expect("server closed the connection")
    }

    pub fn json(&mut self, message: &str) -> Value {
        let reply = self.send(message);
        serde_json::from_str(&reply).unwrap_or_else(|err| panic!("{reply}: {err}"))
    }

    pub fn act(&mut self, action_type: &str, parameters: Value) -> Value {
        self.json(&bridge_runtime::execute_action_message(
            action_type,
            &parameters,
        ))
    }
}

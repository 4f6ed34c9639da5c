//! The request-reply socket.
//!
//! One worker thread accepts a client, serves its frames strictly one at a
//! time, and goes back to accepting once the client disconnects. Frames use
//! the length-prefixed codec from `bridge_runtime::frame`.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bridge_runtime::{read_frame, write_frame, FrameError, UNKNOWN_COMMAND_REPLY};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::dispatch::RequestHandler;

const LOG_PREVIEW_CHARS: usize = 256;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind request socket at {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure request socket: {0}")]
    Configure(#[source] io::Error),
    #[error("failed to spawn request worker: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether the worker exited within the shutdown timeout.
    pub joined: bool,
    pub elapsed_ms: u64,
}

pub struct RequestServer {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    active: Arc<Mutex<Option<TcpStream>>>,
    worker: Option<JoinHandle<()>>,
    finished: Receiver<()>,
    shutdown_timeout: Duration,
    report: Option<ShutdownReport>,
}

struct Worker {
    listener: TcpListener,
    handler: RequestHandler,
    shutdown: Arc<AtomicBool>,
    active: Arc<Mutex<Option<TcpStream>>>,
    max_frame_bytes: usize,
    accept_poll: Duration,
    // Dropped when the worker returns, which is what `stop` waits on.
    _finished: Sender<()>,
}

impl RequestServer {
    pub fn start(config: &ServerConfig, handler: RequestHandler) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind).map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(ServerError::Configure)?;
        let local_addr = listener.local_addr().map_err(ServerError::Configure)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let active = Arc::new(Mutex::new(None));
        let (finished_tx, finished_rx) = bounded(1);
        let worker = Worker {
            listener,
            handler,
            shutdown: Arc::clone(&shutdown),
            active: Arc::clone(&active),
            max_frame_bytes: config.max_frame_bytes,
            accept_poll: config.accept_poll(),
            _finished: finished_tx,
        };
        let worker = thread::Builder::new()
            .name("ai-bridge-server".into())
            .spawn(move || worker.run())
            .map_err(ServerError::Spawn)?;

        info!(
            target: "ai_bridge::server",
            bind = %local_addr,
            "server.listening"
        );

        Ok(Self {
            local_addr,
            shutdown,
            active,
            worker: Some(worker),
            finished: finished_rx,
            shutdown_timeout: config.shutdown_timeout(),
            report: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close the client socket, then wait up to the configured timeout for
    /// the worker to exit. Repeated calls return the first report.
    pub fn stop(&mut self) -> ShutdownReport {
        if let Some(report) = self.report {
            return report;
        }
        let started = Instant::now();
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(stream) = self.active.lock().take() {
            // Unblocks the worker's pending read.
            let _ = stream.shutdown(Shutdown::Both);
        }

        let joined = match self.finished.recv_timeout(self.shutdown_timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        };
        if let Some(worker) = self.worker.take() {
            if joined {
                if worker.join().is_err() {
                    warn!(target: "ai_bridge::server", "server.worker_panicked");
                }
            } else {
                warn!(
                    target: "ai_bridge::server",
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "server.shutdown_forced"
                );
            }
        }

        let report = ShutdownReport {
            joined,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            target: "ai_bridge::server",
            joined = report.joined,
            elapsed_ms = report.elapsed_ms,
            "server.stopped"
        );
        self.report = Some(report);
        report
    }
}

impl Drop for RequestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Worker {
    fn run(self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.serve(stream, peer),
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.accept_poll);
                }
                Err(err) => {
                    warn!(target: "ai_bridge::server", error = %err, "client.accept_failed");
                    thread::sleep(self.accept_poll);
                }
            }
        }
    }

    fn serve(&self, mut stream: TcpStream, peer: SocketAddr) {
        info!(target: "ai_bridge::server", %peer, "client.connected");
        if let Err(err) = stream.set_nonblocking(false) {
            warn!(target: "ai_bridge::server", %peer, error = %err, "client.configure_failed");
            return;
        }
        if let Err(err) = stream.set_nodelay(true) {
            warn!(target: "ai_bridge::server", %peer, error = %err, "client.nodelay_failed");
        }
        match stream.try_clone() {
            Ok(clone) => *self.active.lock() = Some(clone),
            Err(err) => {
                warn!(target: "ai_bridge::server", %peer, error = %err, "client.clone_failed")
            }
        }

        while !self.shutdown.load(Ordering::SeqCst) {
            let frame = match read_frame(&mut stream, self.max_frame_bytes) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    self.report_transport_error(peer, "request.receive_failed", &err);
                    break;
                }
            };

            let reply = match std::str::from_utf8(&frame) {
                Ok(text) => {
                    info!(
                        target: "ai_bridge::server",
                        %peer,
                        request = %preview(text),
                        "request.received"
                    );
                    self.handler.handle(text)
                }
                Err(_) => {
                    warn!(
                        target: "ai_bridge::server",
                        %peer,
                        len = frame.len(),
                        "request.not_utf8"
                    );
                    UNKNOWN_COMMAND_REPLY.to_string()
                }
            };

            if let Err(err) = write_frame(&mut stream, reply.as_bytes()) {
                self.report_transport_error(peer, "reply.send_failed", &err);
                break;
            }
            info!(
                target: "ai_bridge::server",
                %peer,
                reply = %preview(&reply),
                "reply.sent"
            );
        }

        self.active.lock().take();
        info!(target: "ai_bridge::server", %peer, "client.disconnected");
    }

    fn report_transport_error(&self, peer: SocketAddr, event: &'static str, err: &FrameError) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        warn!(target: "ai_bridge::server", %peer, error = %err, "{}", event);
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

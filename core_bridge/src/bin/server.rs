use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{error, info};

use core_bridge::{
    bridge, load_bridge_config_from_env, BridgeMetrics, HeadlessClient, RequestHandler,
    RequestServer,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, metadata) = load_bridge_config_from_env();
    let metrics = Arc::new(BridgeMetrics::default());
    let (handle, mut pump) = bridge(
        config.queue.capacity,
        config.queue.policy(),
        Arc::clone(&metrics),
    );
    let handler = RequestHandler::new(
        handle.clone(),
        config.observation.clone(),
        config.server.observation_timeout(),
        Arc::clone(&metrics),
    );

    let mut server = match RequestServer::start(&config.server, handler) {
        Ok(server) => server,
        Err(err) => {
            error!(target: "ai_bridge::server", error = %err, "server.start_failed");
            std::process::exit(1);
        }
    };

    info!(
        target: "ai_bridge::server",
        bind = %server.local_addr(),
        config = ?metadata.path(),
        tick_ms = config.host.tick_ms,
        "AI bridge headless host ready"
    );

    let mut client = HeadlessClient::demo();
    let tick = config.host.tick_interval();
    let mut ticks = 0u64;
    loop {
        let started = Instant::now();
        let report = pump.run_pending(&mut client);
        client.tick();
        ticks += 1;
        if report.executed + report.failed + report.panicked > 0 {
            info!(
                target: "ai_bridge::bridge",
                tick = ticks,
                executed = report.executed,
                failed = report.failed,
                panicked = report.panicked,
                "tick.pumped"
            );
        }
        if config.host.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
        if let Some(remaining) = tick.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    handle.close();
    let shutdown = server.stop();
    let discarded = pump.discard_pending();
    info!(
        target: "ai_bridge::server",
        ticks,
        joined = shutdown.joined,
        elapsed_ms = shutdown.elapsed_ms,
        discarded,
        metrics = %metrics.snapshot().to_json(),
        "AI bridge headless host stopped"
    );
}

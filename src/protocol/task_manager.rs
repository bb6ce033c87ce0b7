use crate::network::TransportError;
use crate::router::NodeContext;
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::interval;

type Inbound = Vec<u8>;

pub(crate) fn start_tasks(
    ctx: &Arc<NodeContext>,
    shutdown_tx: &broadcast::Sender<()>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
) -> Vec<JoinHandle<()>> {
    let listen_handle = {
        let ctx = ctx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            listen_task(ctx, inbound_tx, &mut shutdown_rx).await;
        })
    };

    let process_handle = {
        let ctx = ctx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            process_task(ctx, inbound_rx, &mut shutdown_rx).await;
        })
    };

    let route_handle = {
        let ctx = ctx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            route_task(ctx, &mut shutdown_rx).await;
        })
    };

    let probe_handle = {
        let ctx = ctx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            probe_task(ctx, &mut shutdown_rx).await;
        })
    };

    debug!("[{}] all node tasks started", ctx.name);
    vec![listen_handle, process_handle, route_handle, probe_handle]
}

/// Reads datagrams and queues them undecoded, so a bad packet never stalls
/// the socket.
async fn listen_task(
    ctx: Arc<NodeContext>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    let mut buffer = vec![0u8; ctx.config.recv_buffer.max(1)];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] listen task shutting down", ctx.name);
                break;
            }
            result = ctx.transport.recv(&mut buffer) => {
                if !ctx.is_running.load(Ordering::Relaxed) {
                    break;
                }

                match result {
                    Ok((len, addr)) => {
                        debug!("[{}] received {} bytes from {}", ctx.name, len, addr);
                        if inbound_tx.send(buffer[..len].to_vec()).is_err() {
                            debug!("[{}] processing queue closed", ctx.name);
                            break;
                        }
                    }
                    Err(TransportError::Closed) => break,
                    Err(e) => {
                        error!("[{}] failed to receive datagram: {}", ctx.name, e);
                        tokio::select! {
                            _ = shutdown_rx.recv() => break,
                            _ = tokio::time::sleep(ctx.config.recv_backoff()) => {}
                        }
                    }
                }
            }
        }
    }
}

/// Single consumer of the inbound queue. Handling messages one at a time in
/// receipt order is what keeps graph updates from racing each other.
async fn process_task(
    ctx: Arc<NodeContext>,
    mut inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] process task shutting down", ctx.name);
                break;
            }
            raw = inbound_rx.recv() => {
                let Some(raw) = raw else {
                    break;
                };
                if !ctx.is_running.load(Ordering::Relaxed) {
                    break;
                }

                ctx.process_raw(&raw).await;
            }
        }
    }
}

async fn route_task(ctx: Arc<NodeContext>, shutdown_rx: &mut broadcast::Receiver<()>) {
    let mut interval = interval(ctx.config.route_interval());

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] route task shutting down", ctx.name);
                break;
            }
            _ = interval.tick() => {
                if !ctx.is_running.load(Ordering::Relaxed) {
                    break;
                }

                // Keep the last good table and try again next period
                if let Err(e) = ctx.recompute_routes().await {
                    error!("[{}] route computation failed: {}", ctx.name, e);
                }
            }
        }
    }
}

async fn probe_task(ctx: Arc<NodeContext>, shutdown_rx: &mut broadcast::Receiver<()>) {
    let mut interval = interval(ctx.config.hello_interval());
    let lsa_every = ctx.config.lsa_every_ticks();
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] probe task shutting down", ctx.name);
                break;
            }
            _ = interval.tick() => {
                if !ctx.is_running.load(Ordering::Relaxed) {
                    break;
                }

                ctx.probe().await;
                if tick % lsa_every == 0 {
                    ctx.announce().await;
                }
                tick = tick.wrapping_add(1);
            }
        }
    }

    info!("[{}] probing stopped after {} ticks", ctx.name, tick);
}

//! Shutdown state.
//!
//! Ctrl+C exits immediately unless a watch session has subscribed through
//! [`shutdown_signal`]; in that case the dev server is unblocked and the
//! session is notified so it can return normally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam::channel::{Receiver, Sender};
use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// A watch session is waiting on the shutdown channel
static SUBSCRIBED: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

static CHANNEL: OnceLock<(Sender<()>, Receiver<()>)> = OnceLock::new();

fn channel() -> &'static (Sender<()>, Receiver<()>) {
    CHANNEL.get_or_init(crossbeam::channel::unbounded)
}

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        }

        if SUBSCRIBED.load(Ordering::SeqCst) {
            let _ = channel().0.send(());
        } else {
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server so Ctrl+C unblocks its request loop.
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

/// Receiver that yields once Ctrl+C is pressed.
pub fn shutdown_signal() -> Receiver<()> {
    SUBSCRIBED.store(true, Ordering::SeqCst);
    channel().1.clone()
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

//! Startup wiring: store, bridge, input guard, and the application's flags.
//!
//! Must be called from inside a tokio runtime. A current-thread runtime gives
//! the same single event loop a browser page has.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::bridge::{AppCommand, Bridge, BridgeReply};
use crate::config::BridgeConfig;
use crate::guard::{ElementLookup, InputGuard};
use crate::store::DocumentStore;
use crate::types::InitFlags;

/// The application's ends of the port channels.
#[derive(Debug)]
pub struct AppPorts {
    pub commands: mpsc::UnboundedSender<AppCommand>,
    pub replies: mpsc::UnboundedReceiver<BridgeReply>,
}

/// Everything the application needs after startup.
#[derive(Debug)]
pub struct Embedded {
    pub flags: InitFlags,
    pub ports: AppPorts,
    /// Completes once `ports.commands` and all its clones are dropped.
    pub bridge: JoinHandle<()>,
    /// Resolves to whether the input guard found its element.
    pub guard: JoinHandle<bool>,
}

/// A fresh collision-resistant id for `InitFlags::cuid`.
///
/// This is a v4 UUID in 32-hex `simple` form, not a cuid: it has no
/// timestamp prefix and does not sort by creation time. The application only
/// needs uniqueness, so any caller-supplied id works as well.
pub fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Start the bridge over `store` and schedule the input guard on `page`.
///
/// `cuid` is passed through to the application untouched.
pub fn embed<S, D>(store: Arc<S>, cuid: String, page: D, config: &BridgeConfig) -> Embedded
where
    S: DocumentStore + ?Sized + 'static,
    D: ElementLookup + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();

    let bridge = tokio::spawn(Bridge::new(store, reply_tx).run(command_rx));
    let guard = tokio::spawn(InputGuard::from_config(config).attach_deferred(page));

    Embedded {
        flags: InitFlags { cuid },
        ports: AppPorts {
            commands: command_tx,
            replies: reply_rx,
        },
        bridge,
        guard,
    }
}

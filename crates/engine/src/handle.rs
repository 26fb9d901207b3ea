// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live views of a signal as it moves through the engine.

use portico_core::{Signal, SignalId};
use std::sync::Arc;
use tokio::sync::watch;

/// Engine-side publisher of a signal's latest state.
#[derive(Clone)]
pub struct SignalTracker {
    tx: Arc<watch::Sender<Signal>>,
}

impl SignalTracker {
    pub fn new(signal: Signal) -> Self {
        let (tx, _) = watch::channel(signal);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, signal: &Signal) {
        self.tx.send_replace(signal.clone());
    }

    #[cfg(test)]
    pub fn current(&self) -> Signal {
        self.tx.borrow().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.tx.borrow().is_terminal()
    }

    pub fn handle(&self) -> SignalHandle {
        SignalHandle { rx: self.tx.subscribe() }
    }
}

/// Caller-side view returned by `submit`.
#[derive(Clone)]
pub struct SignalHandle {
    rx: watch::Receiver<Signal>,
}

impl SignalHandle {
    pub fn id(&self) -> SignalId {
        self.rx.borrow().id
    }

    /// Latest known state.
    pub fn signal(&self) -> Signal {
        self.rx.borrow().clone()
    }

    /// Wait for the signal to reach `complete` or `error`.
    ///
    /// If the engine goes away first, the last published state is returned.
    pub async fn wait(&mut self) -> Signal {
        if let Ok(signal) = self.rx.wait_for(Signal::is_terminal).await {
            return signal.clone();
        }
        self.rx.borrow().clone()
    }
}

impl std::fmt::Debug for SignalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let signal = self.rx.borrow();
        f.debug_struct("SignalHandle").field("id", &signal.id).field("status", &signal.status).finish()
    }
}

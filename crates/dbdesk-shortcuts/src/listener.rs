//! The process-wide key listener
//!
//! A UI host forwards key-down events through a [`KeySender`]; one tokio task
//! hands each of them to the dispatcher in arrival order. Only one listener
//! may be installed per dispatcher at a time.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::combo::KeyEvent;
use crate::dispatcher::ShortcutDispatcher;
use crate::error::{Result, ShortcutError};

const EVENT_BUFFER: usize = 256;

/// Feeds key events to an installed listener
#[derive(Clone)]
pub struct KeySender {
    tx: mpsc::Sender<KeyEvent>,
}

impl KeySender {
    pub async fn send(&self, event: KeyEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ShortcutError::ListenerClosed)
    }

    /// Non-blocking send for synchronous hosts
    pub fn try_send(&self, event: KeyEvent) -> Result<()> {
        self.tx
            .try_send(event)
            .map_err(|_| ShortcutError::ListenerClosed)
    }
}

pub struct KeyListener {
    dispatcher: ShortcutDispatcher,
    sender: KeySender,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl KeyListener {
    /// Start listening. Must be called inside a tokio runtime.
    pub fn install(dispatcher: &ShortcutDispatcher) -> Result<Self> {
        dispatcher.claim_listener()?;

        let (tx, mut rx) = mpsc::channel::<KeyEvent>(EVENT_BUFFER);
        let (stop, mut stopped) = oneshot::channel::<()>();
        let worker = dispatcher.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    event = rx.recv() => match event {
                        Some(event) => {
                            let outcome = worker.dispatch(&event);
                            trace!("{:?} -> {:?}", event.key, outcome);
                        }
                        None => break,
                    },
                }
            }
            debug!("Key listener stopped");
        });

        info!("Key listener installed");
        Ok(Self {
            dispatcher: dispatcher.clone(),
            sender: KeySender { tx },
            stop,
            task,
        })
    }

    pub fn sender(&self) -> KeySender {
        self.sender.clone()
    }

    /// Stop the listener and wait for it. Events still queued are dropped.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            debug!("Key listener task ended abnormally: {}", e);
        }
        self.dispatcher.release_listener();
    }
}

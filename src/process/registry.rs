//! Registry of mailboxes and the per-thread process context.
//!
//! A [`Registry`] maps every [`ProcessId`] to its [`Mailbox`], creating queues
//! lazily on first access. Mailboxes live as long as the registry; nothing
//! tears them down.
//!
//! A [`Process`] is the explicit context one thread uses to take part in the
//! protocol. [`Process::current`] hands out the ambient context of the calling
//! thread, bound to [`Registry::global`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::{Mailbox, Message};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::ProcessId;

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

thread_local! {
    static CURRENT: Process = Registry::global().process();
}

/// Process-wide map from process identity to inbound queue.
pub struct Registry {
    config: Config,
    mailboxes: Mutex<HashMap<ProcessId, Mailbox>>,
}

impl Registry {
    /// Creates an isolated registry.
    #[must_use]
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            mailboxes: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the process-wide registry, configured from the environment on
    /// first use.
    pub fn global() -> &'static Arc<Self> {
        GLOBAL.get_or_init(|| {
            let config = Config::from_env().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "ignoring malformed registry configuration");
                Config::default()
            });
            Self::new(config)
        })
    }

    /// Returns the configuration shared by this registry's processes.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the mailbox of `pid`, creating it on first access.
    pub fn mailbox(&self, pid: ProcessId) -> Mailbox {
        self.mailboxes
            .lock()
            .entry(pid)
            .or_insert_with(|| Mailbox::new(pid))
            .clone()
    }

    /// Enqueues `msg` for `pid`. Never blocks.
    pub fn send(&self, pid: ProcessId, msg: Message) {
        self.mailbox(pid).post(msg);
    }

    /// Mints a fresh process context with its own mailbox.
    #[must_use]
    pub fn process(self: &Arc<Self>) -> Process {
        let id = ProcessId::next();
        let mailbox = self.mailbox(id);
        tracing::debug!(process = %id, "process registered");
        Process {
            id,
            mailbox,
            registry: Arc::clone(self),
        }
    }

    /// Returns the number of mailboxes created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mailboxes.lock().len()
    }

    /// Returns true if no mailbox was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mailboxes.lock().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("mailboxes", &self.len())
            .finish()
    }
}

/// The protocol context of one thread.
///
/// A `Process` must only block on its mailbox from one thread at a time.
/// Clones share identity and mailbox; they exist so the ambient context can
/// be handed out by value.
#[derive(Clone, Debug)]
pub struct Process {
    id: ProcessId,
    mailbox: Mailbox,
    registry: Arc<Registry>,
}

impl Process {
    /// Returns the ambient context of the calling thread, creating it against
    /// [`Registry::global`] on first use.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Returns this process's identity.
    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Returns this process's mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Returns the registry this process belongs to.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Blocks until the next protocol message arrives.
    ///
    /// With a configured wait timeout, an expired wait fails with
    /// [`ErrorKind::Interrupted`](crate::ErrorKind::Interrupted).
    pub fn receive(&self) -> Result<Message> {
        match self.registry.config.wait_timeout {
            None => Ok(self.mailbox.recv()),
            Some(timeout) => self.mailbox.recv_timeout(timeout).ok_or_else(|| {
                tracing::error!(process = %self.id, ?timeout, "mailbox wait interrupted");
                Error::interrupted(format!(
                    "process {} waited {timeout:?} without a protocol message",
                    self.id
                ))
            }),
        }
    }

    /// Returns the number of messages waiting in this process's mailbox.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }
}

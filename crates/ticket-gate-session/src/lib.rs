#![warn(missing_docs)]
//! # ticket-gate-session
//!
//! ## Purpose
//! Holds the two ticket references one browser context remembers between
//! page loads: `pending_ticket` and `my_ticket`.
//!
//! ## Responsibilities
//! - Define the [`SessionStore`] seam (`get`/`set`/`clear`) the controller
//!   writes through.
//! - Provide an in-memory store for tests and embedded use.
//! - Provide a JSON-file store so a fresh process entry sees the session left
//!   behind by the previous one.
//!
//! ## Data flow
//! The access state machine emits session effects; the controller applies
//! them to a [`SessionStore`] before performing any navigation.
//!
//! ## Ownership and lifetimes
//! Stores hand out owned [`TicketId`] clones; callers never borrow into store
//! internals.
//!
//! ## Error model
//! Only I/O and decoding of the file store can fail; failures surface as
//! [`SessionError`]. A missing session file is an empty session.
//!
//! ## Security and privacy notes
//! `my_ticket` is a bearer capability for this browser. The file store writes
//! it to disk with the process umask; tickets are never logged in clear.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ticket_gate_core::TicketId;

/// The two keys a session may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionSlot {
    /// Ticket awaiting return from the ad network or registration.
    PendingTicket,
    /// Ticket this browser is authorized to present without re-auth.
    MyTicket,
}

impl SessionSlot {
    /// Every slot, in storage order.
    pub const ALL: [SessionSlot; 2] = [SessionSlot::PendingTicket, SessionSlot::MyTicket];

    /// Storage key name.
    pub fn key(self) -> &'static str {
        match self {
            Self::PendingTicket => "pending_ticket",
            Self::MyTicket => "my_ticket",
        }
    }
}

/// Point-in-time copy of both slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Value of `pending_ticket`.
    #[serde(default)]
    pub pending_ticket: Option<TicketId>,
    /// Value of `my_ticket`.
    #[serde(default)]
    pub my_ticket: Option<TicketId>,
}

impl SessionSnapshot {
    /// Returns the value held in `slot`.
    pub fn get(&self, slot: SessionSlot) -> Option<&TicketId> {
        match slot {
            SessionSlot::PendingTicket => self.pending_ticket.as_ref(),
            SessionSlot::MyTicket => self.my_ticket.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: SessionSlot) -> &mut Option<TicketId> {
        match slot {
            SessionSlot::PendingTicket => &mut self.pending_ticket,
            SessionSlot::MyTicket => &mut self.my_ticket,
        }
    }
}

/// Key/value memory for one browser context.
pub trait SessionStore: Send + Sync {
    /// Reads one slot.
    ///
    /// # Errors
    /// Returns [`SessionError`] when the backing storage cannot be read.
    fn get(&self, slot: SessionSlot) -> Result<Option<TicketId>, SessionError>;

    /// Writes one slot.
    ///
    /// # Errors
    /// Returns [`SessionError`] when the backing storage cannot be written.
    fn set(&self, slot: SessionSlot, ticket: &TicketId) -> Result<(), SessionError>;

    /// Clears one slot. Clearing an empty slot is a no-op.
    ///
    /// # Errors
    /// Returns [`SessionError`] when the backing storage cannot be written.
    fn clear(&self, slot: SessionSlot) -> Result<(), SessionError>;

    /// Reads both slots.
    ///
    /// # Errors
    /// Propagates the first read failure.
    fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(SessionSnapshot {
            pending_ticket: self.get(SessionSlot::PendingTicket)?,
            my_ticket: self.get(SessionSlot::MyTicket)?,
        })
    }

    /// Clears both slots.
    ///
    /// # Errors
    /// Propagates the first write failure.
    fn clear_all(&self) -> Result<(), SessionError> {
        for slot in SessionSlot::ALL {
            self.clear(slot)?;
        }
        Ok(())
    }
}

/// In-memory store, scoped to the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: Mutex<BTreeMap<SessionSlot, TicketId>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, slot: SessionSlot) -> Result<Option<TicketId>, SessionError> {
        let slots = self.slots.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(slots.get(&slot).cloned())
    }

    fn set(&self, slot: SessionSlot, ticket: &TicketId) -> Result<(), SessionError> {
        let mut slots = self.slots.lock().map_err(|_| SessionError::Poisoned)?;
        slots.insert(slot, ticket.clone());
        Ok(())
    }

    fn clear(&self, slot: SessionSlot) -> Result<(), SessionError> {
        let mut slots = self.slots.lock().map_err(|_| SessionError::Poisoned)?;
        slots.remove(&slot);
        Ok(())
    }
}

/// JSON-file store; every write rewrites the file through a temp-file rename.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionSnapshot, SessionError> {
        match fs::read(&self.path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(SessionSnapshot::default()),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| SessionError::Decode {
                path: self.path.clone(),
                source,
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Ok(SessionSnapshot::default())
            }
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn store(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        let io_error = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let encoded = serde_json::to_vec_pretty(snapshot).map_err(SessionError::Encode)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;
        tracing::debug!(path = %self.path.display(), "session file written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut SessionSnapshot)) -> Result<(), SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        let mut snapshot = self.load()?;
        let before = snapshot.clone();
        apply(&mut snapshot);
        if snapshot == before {
            return Ok(());
        }
        self.store(&snapshot)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, slot: SessionSlot) -> Result<Option<TicketId>, SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(self.load()?.get(slot).cloned())
    }

    fn set(&self, slot: SessionSlot, ticket: &TicketId) -> Result<(), SessionError> {
        self.update(|snapshot| *snapshot.slot_mut(slot) = Some(ticket.clone()))
    }

    fn clear(&self, slot: SessionSlot) -> Result<(), SessionError> {
        self.update(|snapshot| *snapshot.slot_mut(slot) = None)
    }

    fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        self.load()
    }
}

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session file could not be read or written.
    #[error("session file {path} i/o failure: {source}")]
    Io {
        /// Backing file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Session file exists but is not a valid snapshot.
    #[error("session file {path} is corrupt: {source}")]
    Decode {
        /// Backing file path.
        path: PathBuf,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// Snapshot could not be encoded.
    #[error("session encode failure: {0}")]
    Encode(serde_json::Error),
    /// A previous holder of the store lock panicked.
    #[error("session store lock poisoned")]
    Poisoned,
}

//! Session registry: at most one active dialog per channel.
//!
//! Entries map a channel to the requester that owns the dialog and the
//! sending half of the session's event channel. All operations are single-key
//! and the lock is never held across an await.

use crate::{
    core::ids::{ChannelId, UserId},
    dialog::event::InboundEvent,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug)]
struct Entry {
    id: u64,
    requester: UserId,
    sender: mpsc::UnboundedSender<InboundEvent>,
}

/// Shared registry of active dialog sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ChannelId, Entry>>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

/// Result of [`SessionRegistry::begin`].
#[derive(Debug)]
pub enum Begin {
    /// The channel was free; the caller now owns the session slot.
    Started(SessionHandle),
    /// Another session already owns the channel.
    AlreadyActive,
}

/// What a newly started session needs to run.
#[derive(Debug)]
pub struct SessionHandle {
    /// Removes the registry entry when dropped
    pub guard: SessionGuard,
    /// Events routed to this session, in delivery order
    pub events: mpsc::UnboundedReceiver<InboundEvent>,
    /// Fires when the registry shuts down
    pub cancel: CancellationToken,
}

/// Owns a channel's registry entry; dropping it frees the channel.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    channel: ChannelId,
    id: u64,
}

impl SessionGuard {
    /// Channel this guard holds.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.channel, self.id);
    }
}

impl SessionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChannelId, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `channel` for a session owned by `requester`.
    pub fn begin(self: &Arc<Self>, channel: ChannelId, requester: UserId) -> Begin {
        let (sender, events) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut sessions = self.lock();
            if sessions.contains_key(&channel) {
                debug!("Channel {} already has an active session", channel);
                return Begin::AlreadyActive;
            }
            sessions.insert(
                channel,
                Entry {
                    id,
                    requester,
                    sender,
                },
            );
        }

        info!("Session {} started in channel {} for user {}", id, channel, requester);
        Begin::Started(SessionHandle {
            guard: SessionGuard {
                registry: Arc::clone(self),
                channel,
                id,
            },
            events,
            cancel: self.shutdown.child_token(),
        })
    }

    /// Forwards `event` to the session in its channel if the event comes
    /// from that session's requester.
    ///
    /// Returns `true` when the event was consumed and must not be handled as
    /// anything else.
    pub fn route(&self, event: &InboundEvent) -> bool {
        let sessions = self.lock();
        let Some(entry) = sessions.get(&event.channel()) else {
            return false;
        };

        if entry.requester != event.user() {
            return false;
        }

        if entry.sender.send(event.clone()).is_err() {
            debug!("Session {} in channel {} no longer takes events", entry.id, event.channel());
            return false;
        }
        true
    }

    /// Whether `channel` has an active session.
    #[must_use]
    pub fn is_active(&self, channel: ChannelId) -> bool {
        self.lock().contains_key(&channel)
    }

    /// Number of active sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Cancels every running session. Sessions remove themselves as they
    /// wind down.
    pub fn shutdown(&self) {
        info!("Shutting down {} active sessions", self.active_count());
        self.shutdown.cancel();
    }

    fn remove(&self, channel: ChannelId, id: u64) {
        let mut sessions = self.lock();
        if sessions.get(&channel).is_some_and(|entry| entry.id == id) {
            sessions.remove(&channel);
            debug!("Session {} in channel {} removed", id, channel);
        }
    }
}

//! Process-wide broadcast of session changes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::broadcast;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::AuthUser;

const DEFAULT_CAPACITY: usize = 64;

/// A change in who is signed in or which accounts exist
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn {
        user_id: Uuid,
        email: String,
        at: DateTime<Utc>,
    },
    SignedOut {
        user_id: Uuid,
        /// `jti` of the revoked token
        #[serde(skip)]
        token_id: String,
        at: DateTime<Utc>,
    },
    UserCreated {
        user_id: Uuid,
        email: String,
        at: DateTime<Utc>,
    },
    UserDeleted {
        user_id: Uuid,
        at: DateTime<Utc>,
    },
    /// Last event a subscriber sees before the hub goes away
    Closed,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SignedIn { .. } => "signed_in",
            SessionEvent::SignedOut { .. } => "signed_out",
            SessionEvent::UserCreated { .. } => "user_created",
            SessionEvent::UserDeleted { .. } => "user_deleted",
            SessionEvent::Closed => "closed",
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            SessionEvent::SignedIn { user_id, .. }
            | SessionEvent::SignedOut { user_id, .. }
            | SessionEvent::UserCreated { user_id, .. }
            | SessionEvent::UserDeleted { user_id, .. } => Some(*user_id),
            SessionEvent::Closed => None,
        }
    }

    /// Admins see events about every account, everyone else only about their own.
    pub fn visible_to(&self, user: &AuthUser) -> bool {
        user.is_admin() || self.user_id().map_or(true, |id| id == user.user_id)
    }

    /// The subscriber's own token was revoked or its account deleted.
    pub fn ends_session_of(&self, user: &AuthUser) -> bool {
        match self {
            SessionEvent::SignedOut {
                user_id, token_id, ..
            } => *user_id == user.user_id && *token_id == user.token_id,
            SessionEvent::UserDeleted { user_id, .. } => *user_id == user.user_id,
            _ => false,
        }
    }
}

/// Fan-out point for [`SessionEvent`]s. Created once at startup and shut down on exit.
#[derive(Clone, Debug)]
pub struct SessionHub {
    sender: broadcast::Sender<SessionEvent>,
    closed: Arc<AtomicBool>,
}

impl SessionHub {
    pub fn init() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        info!(capacity, "Session hub initialized");
        Self {
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: SessionEvent) -> usize {
        if self.is_closed() {
            debug!(event = event.name(), "Session hub closed; dropping event");
            return 0;
        }
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    /// `None` once the hub has been shut down.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<SessionEvent>> {
        (!self.is_closed()).then(|| self.sender.subscribe())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Tells every subscriber to finish and refuses new ones.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let notified = self.sender.send(SessionEvent::Closed).unwrap_or(0);
        info!(subscribers = notified, "Session hub shut down");
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::init()
    }
}

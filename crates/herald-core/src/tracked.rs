use std::{
    borrow::Borrow,
    hash::{Hash, Hasher},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use herald_types::{Notification, NotificationId};

use crate::error::{NotificationError, Result};

/// Delivery window of a scheduled notification.
///
/// Always satisfies `created_at <= delivery_time <= expiration_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    created_at: DateTime<Utc>,
    delivery_time: DateTime<Utc>,
    expiration_time: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn new(
        created_at: DateTime<Utc>,
        delivery_time: DateTime<Utc>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if delivery_time < created_at {
            return Err(NotificationError::scheduling(
                delivery_time,
                "delivery time cannot be in the past",
            ));
        }
        if expiration_time.is_some_and(|expiration| delivery_time > expiration) {
            return Err(NotificationError::scheduling(
                delivery_time,
                "delivery time cannot be after expiration time",
            ));
        }

        Ok(Self {
            created_at,
            delivery_time,
            expiration_time,
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn delivery_time(&self) -> DateTime<Utc> {
        self.delivery_time
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration_time
    }
}

/// Notification payload plus the identity the manager assigned to it.
///
/// Equality and hashing use `id` only, so registries can be searched by
/// [`NotificationId`].
#[derive(Debug, Clone)]
pub struct TrackedNotification {
    pub id: NotificationId,
    pub notification: Arc<Notification>,
    pub schedule: Option<Schedule>,
}

impl TrackedNotification {
    pub fn new(id: NotificationId, notification: Notification, schedule: Option<Schedule>) -> Self {
        Self {
            id,
            notification: Arc::new(notification),
            schedule,
        }
    }
}

impl PartialEq for TrackedNotification {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrackedNotification {}

impl Hash for TrackedNotification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Borrow<NotificationId> for TrackedNotification {
    fn borrow(&self) -> &NotificationId {
        &self.id
    }
}

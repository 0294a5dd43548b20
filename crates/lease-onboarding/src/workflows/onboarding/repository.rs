use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Account, Subscriber, SubscriberId};

/// Storage port for subscriber aggregates. Implementations must apply each
/// `update` as a single atomic read-modify-write on the row; the scheduler
/// and the request path coordinate only through this store.
pub trait SubscriberRepository: Send + Sync {
    fn insert(&self, subscriber: Subscriber) -> Result<(), RepositoryError>;
    fn update(&self, subscriber: Subscriber) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SubscriberId) -> Result<Option<Subscriber>, RepositoryError>;
}

/// Storage port for login accounts, keyed by the owning subscriber.
pub trait AccountRepository: Send + Sync {
    fn insert(&self, account: Account) -> Result<(), RepositoryError>;
    fn update(&self, account: Account) -> Result<(), RepositoryError>;
    fn fetch(&self, subscriber_id: &SubscriberId) -> Result<Option<Account>, RepositoryError>;
    /// Accounts still waiting for their welcome credential delivery.
    fn pending_welcome(&self) -> Result<Vec<Account>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound delivery channel for the welcome credential message.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        message: &str,
    ) -> Result<DeliveryReceipt, NotificationError>;
}

/// Provider response for one delivery attempt. A non-success receipt counts
/// as a failure for retry purposes, same as a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub status_code: u16,
}

impl DeliveryReceipt {
    pub const fn accepted(status_code: u16) -> Self {
        Self {
            success: true,
            status_code,
        }
    }

    pub const fn rejected(status_code: u16) -> Self {
        Self {
            success: false,
            status_code,
        }
    }
}

/// Notification transport failure.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

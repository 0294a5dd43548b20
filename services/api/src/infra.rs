use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use lease_onboarding::workflows::onboarding::{
    Account, AccountRepository, DeliveryReceipt, NotificationError, NotificationPort,
    RepositoryError, Subscriber, SubscriberId, SubscriberRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubscriberRepository {
    records: Arc<Mutex<HashMap<SubscriberId, Subscriber>>>,
}

impl SubscriberRepository for InMemorySubscriberRepository {
    fn insert(&self, subscriber: Subscriber) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&subscriber.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(subscriber.id, subscriber);
        Ok(())
    }

    fn update(&self, subscriber: Subscriber) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&subscriber.id) {
            guard.insert(subscriber.id, subscriber);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SubscriberId) -> Result<Option<Subscriber>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAccountRepository {
    records: Arc<Mutex<HashMap<SubscriberId, Account>>>,
}

impl AccountRepository for InMemoryAccountRepository {
    fn insert(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&account.subscriber_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(account.subscriber_id, account);
        Ok(())
    }

    fn update(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&account.subscriber_id) {
            guard.insert(account.subscriber_id, account);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, subscriber_id: &SubscriberId) -> Result<Option<Account>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(subscriber_id).cloned())
    }

    fn pending_welcome(&self) -> Result<Vec<Account>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|account| account.pending_welcome_notification)
            .cloned()
            .collect())
    }
}

/// Development stand-in for the real notification provider: logs the
/// destination and reports success without sending anything.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationPort;

#[async_trait::async_trait]
impl NotificationPort for LoggingNotificationPort {
    async fn send(
        &self,
        destination: &str,
        _message: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        info!(destination, "welcome notification dispatched (logging stub)");
        Ok(DeliveryReceipt::accepted(202))
    }
}

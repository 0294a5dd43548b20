use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::workflows::onboarding::domain::{
    hash_credential, Account, Address, KybProfile, MaritalStatus, NewSubscriber, Subscriber,
    SubscriberId,
};
use crate::workflows::onboarding::events::EventBus;
use crate::workflows::onboarding::repository::{
    AccountRepository, DeliveryReceipt, NotificationError, NotificationPort, RepositoryError,
    SubscriberRepository,
};
use crate::workflows::onboarding::scoring::{ScoringConfig, ScoringSnapshot};
use crate::workflows::onboarding::service::SubscriberLifecycle;

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn paris_address() -> Address {
    Address {
        street_line_1: "12 rue de la Roquette".to_string(),
        street_line_2: None,
        city: "Paris".to_string(),
        postal_code: "75011".to_string(),
        country: "FR".to_string(),
    }
}

pub(super) fn lead() -> NewSubscriber {
    NewSubscriber {
        first_name: "Nadia".to_string(),
        last_name: "Bensaid".to_string(),
        email: "nadia.bensaid@example.fr".to_string(),
        phone: "+33612345678".to_string(),
        driver_license_number: "13AB45678".to_string(),
        address: Some(paris_address()),
    }
}

/// Dossier that maxes every criterion: age 30, home city, local nationality,
/// married with two children, combined income over the top tier, 3+ years of
/// VTC experience, a 10-year-old license, and a clean record.
pub(super) fn strong_kyb_profile() -> KybProfile {
    KybProfile {
        birth_date: NaiveDate::from_ymd_opt(1995, 3, 10).expect("valid date"),
        nationality: "FR".to_string(),
        marital_status: MaritalStatus::Married,
        children_count: 2,
        monthly_income: 3_000,
        spouse_monthly_income: Some(2_200),
        vtc_experience_since: NaiveDate::from_ymd_opt(2022, 1, 15).expect("valid date"),
        license_issued_on: NaiveDate::from_ymd_opt(2015, 5, 20).expect("valid date"),
        license_points_healthy: true,
        accident_free: true,
        no_outstanding_fines: true,
        vehicle_cost: 18_500,
    }
}

pub(super) fn strong_snapshot() -> ScoringSnapshot {
    let kyb = strong_kyb_profile();
    ScoringSnapshot {
        as_of: as_of(),
        birth_date: kyb.birth_date,
        residence_city: "Paris".to_string(),
        nationality: kyb.nationality,
        marital_status: kyb.marital_status,
        children_count: kyb.children_count,
        monthly_income: kyb.monthly_income,
        spouse_monthly_income: kyb.spouse_monthly_income.unwrap_or(0),
        vtc_experience_since: kyb.vtc_experience_since,
        license_issued_on: kyb.license_issued_on,
        license_points_healthy: kyb.license_points_healthy,
        accident_free: kyb.accident_free,
        no_outstanding_fines: kyb.no_outstanding_fines,
        vehicle_cost: kyb.vehicle_cost,
    }
}

pub(super) fn pending_account(retries: u8) -> Account {
    Account {
        subscriber_id: SubscriberId::generate(),
        username: "driver@example.fr".to_string(),
        password_hash: hash_credential("seed-credential"),
        active: true,
        pending_welcome_notification: true,
        notification_retry_count: retries,
    }
}

pub(super) type TestLifecycle =
    SubscriberLifecycle<MemorySubscriberRepository, MemoryAccountRepository>;

pub(super) fn build_lifecycle() -> (
    TestLifecycle,
    Arc<MemorySubscriberRepository>,
    Arc<MemoryAccountRepository>,
    EventBus,
) {
    let subscribers = Arc::new(MemorySubscriberRepository::default());
    let accounts = Arc::new(MemoryAccountRepository::default());
    let bus = EventBus::default();
    let lifecycle = SubscriberLifecycle::new(
        subscribers.clone(),
        accounts.clone(),
        bus.clone(),
        ScoringConfig::default(),
    );
    (lifecycle, subscribers, accounts, bus)
}

#[derive(Default, Clone)]
pub(super) struct MemorySubscriberRepository {
    records: Arc<Mutex<HashMap<SubscriberId, Subscriber>>>,
}

impl SubscriberRepository for MemorySubscriberRepository {
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
        if !guard.contains_key(&subscriber.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(subscriber.id, subscriber);
        Ok(())
    }

    fn fetch(&self, id: &SubscriberId) -> Result<Option<Subscriber>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAccountRepository {
    records: Arc<Mutex<HashMap<SubscriberId, Account>>>,
}

impl MemoryAccountRepository {
    pub(super) fn seed(&self, account: Account) {
        self.records
            .lock()
            .expect("account mutex poisoned")
            .insert(account.subscriber_id, account);
    }

    pub(super) fn get(&self, subscriber_id: &SubscriberId) -> Option<Account> {
        self.records
            .lock()
            .expect("account mutex poisoned")
            .get(subscriber_id)
            .cloned()
    }
}

impl AccountRepository for MemoryAccountRepository {
    fn insert(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("account mutex poisoned");
        if guard.contains_key(&account.subscriber_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(account.subscriber_id, account);
        Ok(())
    }

    fn update(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("account mutex poisoned");
        if !guard.contains_key(&account.subscriber_id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(account.subscriber_id, account);
        Ok(())
    }

    fn fetch(&self, subscriber_id: &SubscriberId) -> Result<Option<Account>, RepositoryError> {
        let guard = self.records.lock().expect("account mutex poisoned");
        Ok(guard.get(subscriber_id).cloned())
    }

    fn pending_welcome(&self) -> Result<Vec<Account>, RepositoryError> {
        let guard = self.records.lock().expect("account mutex poisoned");
        Ok(guard
            .values()
            .filter(|account| account.pending_welcome_notification)
            .cloned()
            .collect())
    }
}

/// Per-delivery behavior for the stub notification port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    Accept,
    Reject(u16),
    Fail,
}

/// Scriptable notification port recording every destination it was asked to
/// reach; behavior can be overridden per destination to exercise isolation.
pub(super) struct StubNotificationPort {
    default: Delivery,
    overrides: HashMap<String, Delivery>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubNotificationPort {
    pub(super) fn accepting() -> Self {
        Self::with_default(Delivery::Accept)
    }

    pub(super) fn failing() -> Self {
        Self::with_default(Delivery::Fail)
    }

    pub(super) fn rejecting(status_code: u16) -> Self {
        Self::with_default(Delivery::Reject(status_code))
    }

    fn with_default(default: Delivery) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn with_override(mut self, destination: &str, behavior: Delivery) -> Self {
        self.overrides.insert(destination.to_string(), behavior);
        self
    }

    pub(super) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl NotificationPort for StubNotificationPort {
    async fn send(
        &self,
        destination: &str,
        _message: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(destination.to_string());

        let behavior = self
            .overrides
            .get(destination)
            .copied()
            .unwrap_or(self.default);
        match behavior {
            Delivery::Accept => Ok(DeliveryReceipt::accepted(202)),
            Delivery::Reject(status_code) => Ok(DeliveryReceipt::rejected(status_code)),
            Delivery::Fail => Err(NotificationError::Transport("stub offline".to_string())),
        }
    }
}

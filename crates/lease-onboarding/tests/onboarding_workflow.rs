use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use lease_onboarding::workflows::onboarding::{
    Account, AccountRepository, Address, DeliveryReceipt, DomainEventPayload, EventBus, KybProfile,
    MaritalStatus, NewSubscriber, NotificationError, NotificationPort, NotificationRetryScheduler,
    RepositoryError, SchedulerSettings, ScoringConfig, Subscriber, SubscriberId,
    SubscriberLifecycle, SubscriberRepository, SubscriberStatus, VehicleId,
};
use uuid::Uuid;

#[derive(Default, Clone)]
struct InMemorySubscribers {
    records: Arc<Mutex<HashMap<SubscriberId, Subscriber>>>,
}

impl SubscriberRepository for InMemorySubscribers {
    fn insert(&self, subscriber: Subscriber) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("mutex poisoned");
        if guard.contains_key(&subscriber.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(subscriber.id, subscriber);
        Ok(())
    }

    fn update(&self, subscriber: Subscriber) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("mutex poisoned");
        if !guard.contains_key(&subscriber.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(subscriber.id, subscriber);
        Ok(())
    }

    fn fetch(&self, id: &SubscriberId) -> Result<Option<Subscriber>, RepositoryError> {
        Ok(self.records.lock().expect("mutex poisoned").get(id).cloned())
    }
}

#[derive(Default, Clone)]
struct InMemoryAccounts {
    records: Arc<Mutex<HashMap<SubscriberId, Account>>>,
}

impl InMemoryAccounts {
    fn get(&self, id: &SubscriberId) -> Option<Account> {
        self.records.lock().expect("mutex poisoned").get(id).cloned()
    }
}

impl AccountRepository for InMemoryAccounts {
    fn insert(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("mutex poisoned");
        if guard.contains_key(&account.subscriber_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(account.subscriber_id, account);
        Ok(())
    }

    fn update(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("mutex poisoned");
        if !guard.contains_key(&account.subscriber_id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(account.subscriber_id, account);
        Ok(())
    }

    fn fetch(&self, subscriber_id: &SubscriberId) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("mutex poisoned")
            .get(subscriber_id)
            .cloned())
    }

    fn pending_welcome(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("mutex poisoned")
            .values()
            .filter(|account| account.pending_welcome_notification)
            .cloned()
            .collect())
    }
}

/// Port that fails a configurable number of times before accepting.
struct EventuallyUpPort {
    failures_left: Mutex<u32>,
}

impl EventuallyUpPort {
    fn after_failures(count: u32) -> Self {
        Self {
            failures_left: Mutex::new(count),
        }
    }
}

#[async_trait]
impl NotificationPort for EventuallyUpPort {
    async fn send(
        &self,
        _destination: &str,
        _message: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        let mut remaining = self.failures_left.lock().expect("mutex poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(NotificationError::Transport("smtp relay down".to_string()));
        }
        Ok(DeliveryReceipt::accepted(202))
    }
}

fn lead() -> NewSubscriber {
    NewSubscriber {
        first_name: "Karim".to_string(),
        last_name: "Haddad".to_string(),
        email: "karim.haddad@example.fr".to_string(),
        phone: "+33699887766".to_string(),
        driver_license_number: "75XY12345".to_string(),
        address: Some(Address {
            street_line_1: "8 avenue Parmentier".to_string(),
            street_line_2: None,
            city: "Paris".to_string(),
            postal_code: "75011".to_string(),
            country: "FR".to_string(),
        }),
    }
}

fn kyb_profile() -> KybProfile {
    KybProfile {
        birth_date: NaiveDate::from_ymd_opt(1992, 11, 4).expect("valid date"),
        nationality: "FR".to_string(),
        marital_status: MaritalStatus::Married,
        children_count: 2,
        monthly_income: 2_800,
        spouse_monthly_income: Some(2_400),
        vtc_experience_since: NaiveDate::from_ymd_opt(2021, 2, 1).expect("valid date"),
        license_issued_on: NaiveDate::from_ymd_opt(2012, 7, 9).expect("valid date"),
        license_points_healthy: true,
        accident_free: true,
        no_outstanding_fines: true,
        vehicle_cost: 19_200,
    }
}

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        interval: Duration::from_secs(60),
        run_timeout: Duration::from_secs(5),
        max_attempts: 3,
    }
}

#[tokio::test]
async fn subscriber_reaches_active_and_receives_the_welcome_credential() {
    let subscribers = Arc::new(InMemorySubscribers::default());
    let accounts = Arc::new(InMemoryAccounts::default());
    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let lifecycle = SubscriberLifecycle::new(
        subscribers.clone(),
        accounts.clone(),
        bus.clone(),
        ScoringConfig::default(),
    );

    let id = lifecycle.create(lead()).expect("lead created");
    lifecycle.submit_kyb(&id, kyb_profile()).expect("kyb submitted");
    lifecycle.verify_kyb(&id).expect("kyb verified");

    let as_of = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
    let score = lifecycle.calculate_score(&id, as_of).expect("score calculated");
    assert_eq!(score.personal_data, 297);
    assert_eq!(score.total, 787);

    let vehicle = VehicleId(Uuid::new_v4());
    lifecycle.assign_vehicle(&id, vehicle).expect("vehicle assigned");
    assert_eq!(
        lifecycle.get(&id).expect("present").status,
        SubscriberStatus::Active
    );

    // First scheduler run hits a dead relay, second delivers.
    let provisioned_hash = accounts.get(&id).expect("account provisioned").password_hash;
    let port = Arc::new(EventuallyUpPort::after_failures(1));
    let scheduler = NotificationRetryScheduler::new(accounts.clone(), port, settings());

    let first = scheduler.run_once().await.expect("first run completes");
    assert_eq!(first.retried, 1);
    assert_eq!(
        accounts.get(&id).expect("present").notification_retry_count,
        1
    );

    let second = scheduler.run_once().await.expect("second run completes");
    assert_eq!(second.delivered, 1);
    let account = accounts.get(&id).expect("present");
    assert!(account.active);
    assert!(!account.pending_welcome_notification);
    assert_eq!(account.notification_retry_count, 0);
    assert_ne!(account.password_hash, provisioned_hash);

    // The bus saw the whole story, in order.
    let expect_payload = |events: &mut tokio::sync::broadcast::Receiver<_>| {
        events.try_recv().expect("event available")
    };
    assert!(matches!(
        expect_payload(&mut events).payload,
        DomainEventPayload::SubscriberCreated { subscriber_id, .. } if subscriber_id == id
    ));
    assert!(matches!(
        expect_payload(&mut events).payload,
        DomainEventPayload::KybVerified { subscriber_id } if subscriber_id == id
    ));
    assert!(matches!(
        expect_payload(&mut events).payload,
        DomainEventPayload::VehicleAssigned { subscriber_id, vehicle_id }
            if subscriber_id == id && vehicle_id == vehicle
    ));
}

#[tokio::test]
async fn undeliverable_account_is_deactivated_after_three_attempts() {
    let subscribers = Arc::new(InMemorySubscribers::default());
    let accounts = Arc::new(InMemoryAccounts::default());
    let lifecycle = SubscriberLifecycle::new(
        subscribers,
        accounts.clone(),
        EventBus::default(),
        ScoringConfig::default(),
    );

    let id = lifecycle.create(lead()).expect("lead created");
    lifecycle.submit_kyb(&id, kyb_profile()).expect("kyb submitted");
    lifecycle.verify_kyb(&id).expect("kyb verified");

    let port = Arc::new(EventuallyUpPort::after_failures(u32::MAX));
    let scheduler = NotificationRetryScheduler::new(accounts.clone(), port, settings());

    for expected_attempts in 1..=3u8 {
        let report = scheduler.run_once().await.expect("run completes");
        assert_eq!(report.retried, 1);
        assert_eq!(
            accounts.get(&id).expect("present").notification_retry_count,
            expected_attempts
        );
    }

    // Fourth run finds the counter at the cap and gives up on the account.
    let report = scheduler.run_once().await.expect("run completes");
    assert_eq!(report.deactivated, 1);
    let account = accounts.get(&id).expect("present");
    assert!(!account.active);
    assert!(!account.pending_welcome_notification);

    // Nothing left for later runs.
    let report = scheduler.run_once().await.expect("run completes");
    assert_eq!(report.scanned, 0);
}

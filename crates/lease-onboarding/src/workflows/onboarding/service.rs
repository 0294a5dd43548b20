use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{
    Account, KybProfile, NewSubscriber, Subscriber, SubscriberId, SubscriberStatus, VehicleId,
};
use super::events::{DomainEventPayload, EventBus};
use super::repository::{AccountRepository, RepositoryError, SubscriberRepository};
use super::scoring::{DetailedScore, ScoringConfig, ScoringEngine, ScoringError, ScoringSnapshot};

/// Service owning every subscriber state transition. Each operation is atomic
/// with respect to one aggregate; events are published after the store commit
/// and never participate in it.
pub struct SubscriberLifecycle<S, A> {
    subscribers: Arc<S>,
    accounts: Arc<A>,
    events: EventBus,
    engine: ScoringEngine,
}

impl<S, A> SubscriberLifecycle<S, A>
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    pub fn new(
        subscribers: Arc<S>,
        accounts: Arc<A>,
        events: EventBus,
        scoring_config: ScoringConfig,
    ) -> Self {
        Self {
            subscribers,
            accounts,
            events,
            engine: ScoringEngine::new(scoring_config),
        }
    }

    /// Register a new lead and announce it on the bus.
    pub fn create(&self, lead: NewSubscriber) -> Result<SubscriberId, LifecycleError> {
        let subscriber = Subscriber::from_lead(lead);
        let id = subscriber.id;
        let email = subscriber.email.clone();

        self.subscribers.insert(subscriber)?;
        self.events.publish(DomainEventPayload::SubscriberCreated {
            subscriber_id: id,
            email,
        });

        info!(subscriber_id = %id, "subscriber created as lead");
        Ok(id)
    }

    /// Attach the KYB dossier and move the lead into the verification queue.
    pub fn submit_kyb(
        &self,
        id: &SubscriberId,
        profile: KybProfile,
    ) -> Result<(), LifecycleError> {
        let mut subscriber = self
            .subscribers
            .fetch(id)?
            .ok_or(LifecycleError::SubscriberNotFound(*id))?;

        apply_transition(&mut subscriber, SubscriberStatus::KybPending)?;
        subscriber.kyb = Some(profile);
        self.subscribers.update(subscriber)?;

        info!(subscriber_id = %id, "kyb dossier submitted");
        Ok(())
    }

    /// Mark a pending subscriber verified and provision their login account.
    ///
    /// An unknown id is a silent no-op so that retried verification commands
    /// stay idempotent; a wrong-state subscriber is an error.
    pub fn verify_kyb(&self, id: &SubscriberId) -> Result<(), LifecycleError> {
        let Some(mut subscriber) = self.subscribers.fetch(id)? else {
            debug!(subscriber_id = %id, "verify skipped, subscriber absent");
            return Ok(());
        };

        apply_transition(&mut subscriber, SubscriberStatus::KybVerified)?;

        let account = Account::provision(subscriber.id, subscriber.email.clone());
        self.accounts.insert(account)?;
        self.subscribers.update(subscriber)?;
        self.events
            .publish(DomainEventPayload::KybVerified { subscriber_id: *id });

        info!(subscriber_id = %id, "kyb verified, account provisioned");
        Ok(())
    }

    /// Mark a pending subscriber rejected; same absence semantics as verify.
    pub fn reject_kyb(&self, id: &SubscriberId) -> Result<(), LifecycleError> {
        let Some(mut subscriber) = self.subscribers.fetch(id)? else {
            debug!(subscriber_id = %id, "reject skipped, subscriber absent");
            return Ok(());
        };

        apply_transition(&mut subscriber, SubscriberStatus::KybRejected)?;
        self.subscribers.update(subscriber)?;
        self.events
            .publish(DomainEventPayload::KybRejected { subscriber_id: *id });

        info!(subscriber_id = %id, "kyb rejected");
        Ok(())
    }

    /// Hand a fleet vehicle to a verified subscriber, activating the
    /// subscription.
    pub fn assign_vehicle(
        &self,
        id: &SubscriberId,
        vehicle_id: VehicleId,
    ) -> Result<(), LifecycleError> {
        let mut subscriber = self
            .subscribers
            .fetch(id)?
            .ok_or(LifecycleError::SubscriberNotFound(*id))?;

        apply_transition(&mut subscriber, SubscriberStatus::Active)?;
        subscriber.assigned_vehicle = Some(vehicle_id);
        self.subscribers.update(subscriber)?;
        self.events.publish(DomainEventPayload::VehicleAssigned {
            vehicle_id,
            subscriber_id: *id,
        });

        info!(subscriber_id = %id, vehicle_id = %vehicle_id, "vehicle assigned, subscription active");
        Ok(())
    }

    /// Terminal transition, reachable from every state and idempotent: a
    /// second call on an already deactivated subscriber is an Ok no-op, as is
    /// a call for an id that never existed.
    pub fn deactivate(&self, id: &SubscriberId) -> Result<(), LifecycleError> {
        let Some(mut subscriber) = self.subscribers.fetch(id)? else {
            debug!(subscriber_id = %id, "deactivate skipped, subscriber absent");
            return Ok(());
        };

        if subscriber.status == SubscriberStatus::Deactivated {
            debug!(subscriber_id = %id, "subscriber already deactivated");
            return Ok(());
        }

        apply_transition(&mut subscriber, SubscriberStatus::Deactivated)?;
        self.subscribers.update(subscriber)?;

        if let Some(mut account) = self.accounts.fetch(id)? {
            account.active = false;
            account.pending_welcome_notification = false;
            self.accounts.update(account)?;
        }

        self.events
            .publish(DomainEventPayload::SubscriberDeactivated { subscriber_id: *id });

        info!(subscriber_id = %id, "subscriber deactivated");
        Ok(())
    }

    /// Run the scoring engine against the aggregate's KYB data and persist
    /// the fresh score, replacing any previous one.
    pub fn calculate_score(
        &self,
        id: &SubscriberId,
        as_of: NaiveDate,
    ) -> Result<DetailedScore, LifecycleError> {
        let mut subscriber = self
            .subscribers
            .fetch(id)?
            .ok_or(LifecycleError::SubscriberNotFound(*id))?;

        let snapshot = ScoringSnapshot::for_subscriber(&subscriber, as_of)?;
        let score = self.engine.calculate(&snapshot);

        subscriber.score = Some(score);
        self.subscribers.update(subscriber)?;

        info!(subscriber_id = %id, total = score.total, "risk score calculated");
        Ok(score)
    }

    /// Fetch an aggregate for presentation.
    pub fn get(&self, id: &SubscriberId) -> Result<Subscriber, LifecycleError> {
        self.subscribers
            .fetch(id)?
            .ok_or(LifecycleError::SubscriberNotFound(*id))
    }

    /// Fetch the login account, if one has been provisioned.
    pub fn account(&self, id: &SubscriberId) -> Result<Option<Account>, LifecycleError> {
        Ok(self.accounts.fetch(id)?)
    }

    /// Subscription handle for downstream consumers of lifecycle events.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<super::events::DomainEvent> {
        self.events.subscribe()
    }
}

fn apply_transition(
    subscriber: &mut Subscriber,
    target: SubscriberStatus,
) -> Result<(), LifecycleError> {
    if !subscriber.status.can_transition_to(target) {
        return Err(LifecycleError::InvalidTransition {
            from: subscriber.status,
            to: target,
        });
    }
    subscriber.status = target;
    Ok(())
}

/// Error raised by lifecycle operations. Business-rule violations are
/// returned synchronously and never retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("subscriber {0} not found")]
    SubscriberNotFound(SubscriberId),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: SubscriberStatus,
        to: SubscriberStatus,
    },
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Sanitized aggregate representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberView {
    pub subscriber_id: SubscriberId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<DetailedScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_vehicle: Option<VehicleId>,
}

impl From<&Subscriber> for SubscriberView {
    fn from(subscriber: &Subscriber) -> Self {
        Self {
            subscriber_id: subscriber.id,
            status: subscriber.status.label(),
            score: subscriber.score,
            assigned_vehicle: subscriber.assigned_vehicle,
        }
    }
}

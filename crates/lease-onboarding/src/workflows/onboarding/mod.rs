//! Subscriber lifecycle and scoring pipeline.
//!
//! Four collaborating pieces: the [`scoring`] engine (pure risk rubric), the
//! [`service`] lifecycle state machine, the [`events`] broadcast bus, and the
//! [`scheduler`] welcome-notification retry job. Persistence and delivery sit
//! behind the ports in [`repository`].

pub mod domain;
pub mod events;
pub mod repository;
pub mod router;
pub mod scheduler;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    generate_one_time_credential, hash_credential, Account, Address, KybProfile, MaritalStatus,
    NewSubscriber, Subscriber, SubscriberId, SubscriberStatus, VehicleId,
};
pub use events::{DomainEvent, DomainEventPayload, EventBus, EventId};
pub use repository::{
    AccountRepository, DeliveryReceipt, NotificationError, NotificationPort, RepositoryError,
    SubscriberRepository,
};
pub use router::onboarding_router;
pub use scheduler::{NotificationRetryScheduler, RunReport, SchedulerError, SchedulerSettings};
pub use scoring::{
    DetailedScore, ScoringConfig, ScoringEngine, ScoringError, ScoringSnapshot,
};
pub use service::{LifecycleError, SubscriberLifecycle, SubscriberView};

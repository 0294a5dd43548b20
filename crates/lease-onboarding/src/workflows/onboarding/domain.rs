use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::scoring::DetailedScore;

/// Identifier wrapper for subscriber aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier for a vehicle in the leasing fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub Uuid);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Postal address value object, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_line_1: String,
    pub street_line_2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Civil status used by the personal-data scoring criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub const fn is_married(self) -> bool {
        matches!(self, MaritalStatus::Married)
    }
}

/// Verification/activation status of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriberStatus {
    Lead,
    KybPending,
    KybVerified,
    KybRejected,
    Active,
    Deactivated,
}

impl SubscriberStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubscriberStatus::Lead => "lead",
            SubscriberStatus::KybPending => "kyb_pending",
            SubscriberStatus::KybVerified => "kyb_verified",
            SubscriberStatus::KybRejected => "kyb_rejected",
            SubscriberStatus::Active => "active",
            SubscriberStatus::Deactivated => "deactivated",
        }
    }

    /// Explicit transition table; every status change is validated here.
    pub const fn allowed_targets(self) -> &'static [SubscriberStatus] {
        match self {
            SubscriberStatus::Lead => {
                &[SubscriberStatus::KybPending, SubscriberStatus::Deactivated]
            }
            SubscriberStatus::KybPending => &[
                SubscriberStatus::KybVerified,
                SubscriberStatus::KybRejected,
                SubscriberStatus::Deactivated,
            ],
            SubscriberStatus::KybVerified => {
                &[SubscriberStatus::Active, SubscriberStatus::Deactivated]
            }
            SubscriberStatus::KybRejected => &[SubscriberStatus::Deactivated],
            SubscriberStatus::Active => &[SubscriberStatus::Deactivated],
            SubscriberStatus::Deactivated => &[],
        }
    }

    pub fn can_transition_to(self, target: SubscriberStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, SubscriberStatus::Deactivated)
    }
}

impl std::fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity and contact data captured when a lead is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscriber {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub driver_license_number: String,
    pub address: Option<Address>,
}

/// Financial and identity data collected during KYB submission.
///
/// The license-points, accident, and fines flags stand in for feeds the
/// verification provider does not expose yet; callers must supply them
/// explicitly rather than the engine assuming a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KybProfile {
    pub birth_date: NaiveDate,
    /// Nationality code, e.g. `FR` or a regional-bloc form like `EU-PT`.
    pub nationality: String,
    pub marital_status: MaritalStatus,
    pub children_count: u8,
    pub monthly_income: u32,
    pub spouse_monthly_income: Option<u32>,
    pub vtc_experience_since: NaiveDate,
    pub license_issued_on: NaiveDate,
    pub license_points_healthy: bool,
    pub accident_free: bool,
    pub no_outstanding_fines: bool,
    /// Catalogue cost of the vehicle the subscriber is applying to lease.
    pub vehicle_cost: u32,
}

/// Aggregate root for a prospective or active lease subscriber.
///
/// Mutated only through the lifecycle service; records are never deleted,
/// `Deactivated` is the terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub driver_license_number: String,
    pub address: Option<Address>,
    pub status: SubscriberStatus,
    pub kyb: Option<KybProfile>,
    pub score: Option<DetailedScore>,
    pub assigned_vehicle: Option<VehicleId>,
}

impl Subscriber {
    pub fn from_lead(lead: NewSubscriber) -> Self {
        Self {
            id: SubscriberId::generate(),
            first_name: lead.first_name,
            last_name: lead.last_name,
            email: lead.email,
            phone: lead.phone,
            driver_license_number: lead.driver_license_number,
            address: lead.address,
            status: SubscriberStatus::Lead,
            kyb: None,
            score: None,
            assigned_vehicle: None,
        }
    }
}

/// Login account provisioned once a subscriber passes KYB verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub subscriber_id: SubscriberId,
    pub username: String,
    pub password_hash: String,
    pub active: bool,
    pub pending_welcome_notification: bool,
    pub notification_retry_count: u8,
}

impl Account {
    /// Provision the 1:1 account for a freshly verified subscriber. The
    /// welcome notification stays pending until the scheduler delivers the
    /// credential (or exhausts its retries).
    pub fn provision(subscriber_id: SubscriberId, username: String) -> Self {
        let initial_credential = generate_one_time_credential();
        Self {
            subscriber_id,
            username,
            password_hash: hash_credential(&initial_credential),
            active: true,
            pending_welcome_notification: true,
            notification_retry_count: 0,
        }
    }
}

/// One-time login credential carried by the welcome notification.
pub fn generate_one_time_credential() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Only the hash of a credential is ever persisted.
pub fn hash_credential(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    format!("{:x}", hasher.finalize())
}

mod config;
pub(crate) mod rules;

pub use config::ScoringConfig;
pub use rules::{
    DRIVING_RECORD_CAP, INCOME_CAP, PERSONAL_DATA_CAP, PROFESSIONAL_EXPERIENCE_CAP, TOTAL_CAP,
    VEHICLE_COST_CAP,
};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{MaritalStatus, Subscriber};

/// Stateless engine applying the weighted multi-factor risk rubric.
///
/// `calculate` is pure: the snapshot carries every input, including the
/// evaluation date, so the same snapshot always yields the same score.
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Each criterion is clamped to its own cap BEFORE the five are summed,
    /// then the sum is clamped to the grand total. Summing raw values and
    /// clamping once at the end would produce different results whenever a
    /// single criterion overshoots its cap.
    pub fn calculate(&self, snapshot: &ScoringSnapshot) -> DetailedScore {
        let personal_data = rules::personal_data(snapshot, &self.config).min(PERSONAL_DATA_CAP);
        let vehicle_cost = rules::vehicle_cost(snapshot).min(VEHICLE_COST_CAP);
        let income = rules::income(snapshot).min(INCOME_CAP);
        let professional_experience =
            rules::professional_experience(snapshot).min(PROFESSIONAL_EXPERIENCE_CAP);
        let driving_record = rules::driving_record(snapshot).min(DRIVING_RECORD_CAP);

        let total = (personal_data + vehicle_cost + income + professional_experience
            + driving_record)
            .min(TOTAL_CAP);

        DetailedScore {
            personal_data,
            vehicle_cost,
            income,
            professional_experience,
            driving_record,
            total,
        }
    }
}

/// Immutable result of one scoring run; a new run replaces the old value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedScore {
    pub personal_data: u16,
    pub vehicle_cost: u16,
    pub income: u16,
    pub professional_experience: u16,
    pub driving_record: u16,
    pub total: u16,
}

/// Complete, validated input set for one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSnapshot {
    /// Date the run is evaluated against; part of the snapshot so age and
    /// seniority computations stay deterministic.
    pub as_of: NaiveDate,
    pub birth_date: NaiveDate,
    pub residence_city: String,
    pub nationality: String,
    pub marital_status: MaritalStatus,
    pub children_count: u8,
    pub monthly_income: u32,
    pub spouse_monthly_income: u32,
    pub vtc_experience_since: NaiveDate,
    pub license_issued_on: NaiveDate,
    pub license_points_healthy: bool,
    pub accident_free: bool,
    pub no_outstanding_fines: bool,
    pub vehicle_cost: u32,
}

impl ScoringSnapshot {
    /// Gather the scoring inputs off an aggregate, failing on the first
    /// missing field. Completeness is the caller's responsibility; the engine
    /// itself never sees a partial snapshot.
    pub fn for_subscriber(
        subscriber: &Subscriber,
        as_of: NaiveDate,
    ) -> Result<Self, ScoringError> {
        let kyb = subscriber
            .kyb
            .as_ref()
            .ok_or(ScoringError::IncompleteInput { field: "kyb" })?;
        let address = subscriber
            .address
            .as_ref()
            .ok_or(ScoringError::IncompleteInput { field: "address" })?;

        Ok(Self {
            as_of,
            birth_date: kyb.birth_date,
            residence_city: address.city.clone(),
            nationality: kyb.nationality.clone(),
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
        })
    }

    pub(crate) fn age_years(&self) -> u32 {
        self.as_of.years_since(self.birth_date).unwrap_or(0)
    }

    pub(crate) fn experience_months(&self) -> u32 {
        whole_months_between(self.vtc_experience_since, self.as_of)
    }

    pub(crate) fn license_age_years(&self) -> u32 {
        self.as_of.years_since(self.license_issued_on).unwrap_or(0)
    }
}

/// Calendar months fully elapsed between two dates; zero when `to` precedes
/// `from`.
fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut months =
        (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Raised when scoring is invoked before the KYB data is complete.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("scoring input missing: {field}")]
    IncompleteInput { field: &'static str },
}

use super::config::ScoringConfig;
use super::ScoringSnapshot;

pub const PERSONAL_DATA_CAP: u16 = 297;
pub const VEHICLE_COST_CAP: u16 = 170;
pub const INCOME_CAP: u16 = 85;
// The experience step bands top out at 150, so this cap is currently
// unreachable. Product has not confirmed whether the bands or the cap are
// wrong; keep both as agreed with them.
pub const PROFESSIONAL_EXPERIENCE_CAP: u16 = 297;
pub const DRIVING_RECORD_CAP: u16 = 85;
pub const TOTAL_CAP: u16 = 935;

const VEHICLE_COST_TIER_1: u32 = 20_000;
const VEHICLE_COST_TIER_2: u32 = 30_000;
const VEHICLE_COST_TIER_3: u32 = 40_000;

const INCOME_TIER_1: u32 = 5_000;
const INCOME_TIER_2: u32 = 3_500;
const INCOME_TIER_3: u32 = 2_000;

/// Age, residence, nationality, civil status, and dependents. The five
/// criteria sum to exactly the cap when every one scores its maximum.
pub(crate) fn personal_data(snapshot: &ScoringSnapshot, config: &ScoringConfig) -> u16 {
    let age = snapshot.age_years();
    let age_score = if (25..=50).contains(&age) {
        60
    } else if age > 50 {
        40
    } else {
        20
    };

    let residence_score = if snapshot
        .residence_city
        .eq_ignore_ascii_case(&config.home_city)
    {
        60
    } else {
        30
    };

    let nationality_score = if snapshot.nationality == config.local_nationality {
        60
    } else if snapshot.nationality.starts_with(&config.regional_bloc_prefix) {
        40
    } else {
        20
    };

    let marital_score = if snapshot.marital_status.is_married() {
        60
    } else {
        30
    };

    let dependents_score = if snapshot.children_count >= 2 {
        57
    } else if snapshot.children_count == 1 {
        40
    } else {
        20
    };

    age_score + residence_score + nationality_score + marital_score + dependents_score
}

/// Inverse step function of the vehicle catalogue cost: the cheaper the
/// vehicle, the higher the score (100/80/60/40% of the cap).
pub(crate) fn vehicle_cost(snapshot: &ScoringSnapshot) -> u16 {
    if snapshot.vehicle_cost < VEHICLE_COST_TIER_1 {
        VEHICLE_COST_CAP
    } else if snapshot.vehicle_cost < VEHICLE_COST_TIER_2 {
        VEHICLE_COST_CAP * 80 / 100
    } else if snapshot.vehicle_cost < VEHICLE_COST_TIER_3 {
        VEHICLE_COST_CAP * 60 / 100
    } else {
        VEHICLE_COST_CAP * 40 / 100
    }
}

/// Combined household income banded against descending thresholds, inclusive
/// at the lower bound of each tier.
pub(crate) fn income(snapshot: &ScoringSnapshot) -> u16 {
    let combined = snapshot.monthly_income + snapshot.spouse_monthly_income;
    if combined >= INCOME_TIER_1 {
        INCOME_CAP
    } else if combined >= INCOME_TIER_2 {
        INCOME_CAP * 80 / 100
    } else if combined >= INCOME_TIER_3 {
        INCOME_CAP * 60 / 100
    } else {
        INCOME_CAP * 40 / 100
    }
}

/// Monotonic step function of months spent driving professionally; below six
/// months the criterion contributes nothing.
pub(crate) fn professional_experience(snapshot: &ScoringSnapshot) -> u16 {
    let months = snapshot.experience_months();
    if months >= 24 {
        150
    } else if months >= 12 {
        100
    } else if months >= 6 {
        50
    } else {
        0
    }
}

/// License seniority plus fixed bonuses for the stand-in record criteria
/// (points, accidents, fines). The raw sum can exceed the cap, which is why
/// the caller clamps before totalling.
pub(crate) fn driving_record(snapshot: &ScoringSnapshot) -> u16 {
    let license_years = snapshot.license_age_years();
    let seniority_score = if license_years >= 5 {
        30
    } else if license_years >= 3 {
        20
    } else {
        10
    };

    let mut score = seniority_score;
    if snapshot.license_points_healthy {
        score += 20;
    }
    if snapshot.accident_free {
        score += 20;
    }
    if snapshot.no_outstanding_fines {
        score += 20;
    }
    score
}

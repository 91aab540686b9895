use anyhow::{Context, Result};
use chrono::NaiveDate;
use products_hr::{PayGradeId, UserId};
use uuid::Uuid;

/// Fallback pay grade for seeded positions when `HR_SEED_PAY_GRADE` is unset.
const DEMO_PAY_GRADE: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub seed_actor: UserId,
    pub seed_pay_grade: PayGradeId,
    pub seed_effective_date: NaiveDate,
    pub allow_dirty: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let seed_actor = match env_trimmed("HR_SEED_ACTOR") {
            Some(raw) => raw.parse().context("invalid HR_SEED_ACTOR")?,
            None => UserId::from_uuid(Uuid::nil()),
        };
        let seed_pay_grade = match env_trimmed("HR_SEED_PAY_GRADE") {
            Some(raw) => raw.parse().context("invalid HR_SEED_PAY_GRADE")?,
            None => PayGradeId::from_uuid(DEMO_PAY_GRADE),
        };
        let seed_effective_date = match env_trimmed("HR_SEED_EFFECTIVE_DATE") {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .context("HR_SEED_EFFECTIVE_DATE must be YYYY-MM-DD")?,
            None => chrono::Utc::now().date_naive(),
        };
        let allow_dirty = env_trimmed("HR_ALLOW_DIRTY")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            seed_actor,
            seed_pay_grade,
            seed_effective_date,
            allow_dirty,
        })
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

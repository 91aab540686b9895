use chrono::{DateTime, NaiveDate, Utc};
use entity::position;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::{
    department::warn_on_inverted_window,
    error::{HrError, HrResult},
    ids::{DepartmentId, PayGradeId, PositionId, UserId},
    rules::{FieldRule, RuleTable, non_negative, nullable},
};

pub const DEFAULT_HEADCOUNT_BUDGET: i32 = 1;

/// Audit columns are stamped from the acting user and have no entry.
pub const POSITION_RULES: RuleTable = RuleTable {
    entity: "position",
    rules: &[
        FieldRule::optional("positionCode").required().upper().unique(),
        FieldRule::optional("positionTitle").required().trimmed(),
        FieldRule::optional("positionTitleArabic").trimmed(),
        FieldRule::optional("description"),
        FieldRule::optional("departmentId").required(),
        FieldRule::optional("reportsToPositionId"),
        FieldRule::optional("level").required().trimmed(),
        FieldRule::optional("jobFamily"),
        FieldRule::optional("payGradeId").required(),
        // Always present once DEFAULT_HEADCOUNT_BUDGET fills it in.
        FieldRule::optional("headcountBudget"),
        FieldRule::optional("currentHeadcount"),
        FieldRule::optional("isActive"),
        FieldRule::optional("effectiveDate").required(),
        FieldRule::optional("endDate"),
    ],
};

/// Write input for a new position. `availableHeadcount` is derived and has no
/// field here, so payloads carrying it are rejected by [`Self::from_json`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPosition {
    pub position_code: Option<String>,
    pub position_title: Option<String>,
    pub position_title_arabic: Option<String>,
    pub description: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub reports_to_position_id: Option<PositionId>,
    pub level: Option<String>,
    pub job_family: Option<String>,
    pub pay_grade_id: Option<PayGradeId>,
    pub headcount_budget: Option<i32>,
    pub current_headcount: Option<i32>,
    pub is_active: Option<bool>,
    pub effective_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewPosition {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        department_id: DepartmentId,
        level: impl Into<String>,
        pay_grade_id: PayGradeId,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            position_code: Some(code.into()),
            position_title: Some(title.into()),
            department_id: Some(department_id),
            level: Some(level.into()),
            pay_grade_id: Some(pay_grade_id),
            effective_date: Some(effective_date),
            ..Self::default()
        }
    }

    pub fn from_json(value: serde_json::Value) -> HrResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| HrError::mismatch("position", err.to_string()))
    }

    pub fn with_headcount(mut self, budget: i32, current: i32) -> Self {
        self.headcount_budget = Some(budget);
        self.current_headcount = Some(current);
        self
    }

    pub fn reporting_to(mut self, position: PositionId) -> Self {
        self.reports_to_position_id = Some(position);
        self
    }

    pub fn in_job_family(mut self, family: impl Into<String>) -> Self {
        self.job_family = Some(family.into());
        self
    }

    pub fn validate(self) -> HrResult<ValidPosition> {
        let rules = &POSITION_RULES;
        let headcount_budget = non_negative(
            "headcountBudget",
            self.headcount_budget.unwrap_or(DEFAULT_HEADCOUNT_BUDGET),
        )?;
        let current_headcount =
            non_negative("currentHeadcount", self.current_headcount.unwrap_or(0))?;
        let valid = ValidPosition {
            position_code: rules.required_text("positionCode", self.position_code)?,
            position_title: rules.required_text("positionTitle", self.position_title)?,
            position_title_arabic: rules
                .text("positionTitleArabic", self.position_title_arabic)?,
            description: rules.text("description", self.description)?,
            department_id: rules.required_value("departmentId", self.department_id)?,
            reports_to_position_id: self.reports_to_position_id,
            level: rules.required_text("level", self.level)?,
            job_family: rules.text("jobFamily", self.job_family)?,
            pay_grade_id: rules.required_value("payGradeId", self.pay_grade_id)?,
            headcount_budget,
            current_headcount,
            is_active: self.is_active.unwrap_or(true),
            effective_date: rules.required_value("effectiveDate", self.effective_date)?,
            end_date: self.end_date,
        };
        warn_on_over_allocation(
            &valid.position_code,
            valid.headcount_budget,
            valid.current_headcount,
        );
        warn_on_inverted_window(&valid.position_code, valid.effective_date, valid.end_date);
        Ok(valid)
    }
}

/// A [`NewPosition`] that passed the rule table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidPosition {
    pub position_code: String,
    pub position_title: String,
    pub position_title_arabic: Option<String>,
    pub description: Option<String>,
    pub department_id: DepartmentId,
    pub reports_to_position_id: Option<PositionId>,
    pub level: String,
    pub job_family: Option<String>,
    pub pay_grade_id: PayGradeId,
    pub headcount_budget: i32,
    pub current_headcount: i32,
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl ValidPosition {
    pub(crate) fn into_active_model(self, id: PositionId, actor: UserId) -> position::ActiveModel {
        position::ActiveModel {
            id: Set(id.into_uuid()),
            position_code: Set(self.position_code),
            position_title: Set(self.position_title),
            position_title_arabic: Set(self.position_title_arabic),
            description: Set(self.description),
            department_id: Set(self.department_id.into_uuid()),
            reports_to_position_id: Set(self.reports_to_position_id.map(PositionId::into_uuid)),
            level: Set(self.level),
            job_family: Set(self.job_family),
            pay_grade_id: Set(self.pay_grade_id.into_uuid()),
            headcount_budget: Set(self.headcount_budget),
            current_headcount: Set(self.current_headcount),
            is_active: Set(self.is_active),
            effective_date: Set(self.effective_date),
            end_date: Set(self.end_date),
            created_by: Set(actor.into_uuid()),
            updated_by: Set(actor.into_uuid()),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PositionChanges {
    pub position_code: Option<String>,
    pub position_title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub position_title_arabic: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub department_id: Option<DepartmentId>,
    #[serde(default, deserialize_with = "nullable")]
    pub reports_to_position_id: Option<Option<PositionId>>,
    pub level: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub job_family: Option<Option<String>>,
    pub pay_grade_id: Option<PayGradeId>,
    pub headcount_budget: Option<i32>,
    pub current_headcount: Option<i32>,
    pub is_active: Option<bool>,
    pub effective_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
}

impl PositionChanges {
    pub fn from_json(value: serde_json::Value) -> HrResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| HrError::mismatch("position", err.to_string()))
    }

    pub(crate) fn apply_to(self, active: &mut position::ActiveModel) -> HrResult<()> {
        let rules = &POSITION_RULES;
        if let Some(code) = rules.changed_text("positionCode", self.position_code)? {
            active.position_code = Set(code);
        }
        if let Some(title) = rules.changed_text("positionTitle", self.position_title)? {
            active.position_title = Set(title);
        }
        if let Some(arabic) =
            rules.changed_nullable_text("positionTitleArabic", self.position_title_arabic)?
        {
            active.position_title_arabic = Set(arabic);
        }
        if let Some(description) = rules.changed_nullable_text("description", self.description)? {
            active.description = Set(description);
        }
        if let Some(department) = self.department_id {
            active.department_id = Set(department.into_uuid());
        }
        if let Some(reports_to) = self.reports_to_position_id {
            active.reports_to_position_id = Set(reports_to.map(PositionId::into_uuid));
        }
        if let Some(level) = rules.changed_text("level", self.level)? {
            active.level = Set(level);
        }
        if let Some(family) = rules.changed_nullable_text("jobFamily", self.job_family)? {
            active.job_family = Set(family);
        }
        if let Some(pay_grade) = self.pay_grade_id {
            active.pay_grade_id = Set(pay_grade.into_uuid());
        }
        if let Some(budget) = self.headcount_budget {
            active.headcount_budget = Set(non_negative("headcountBudget", budget)?);
        }
        if let Some(current) = self.current_headcount {
            active.current_headcount = Set(non_negative("currentHeadcount", current)?);
        }
        if let Some(is_active) = self.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(effective_date) = self.effective_date {
            active.effective_date = Set(effective_date);
        }
        if let Some(end_date) = self.end_date {
            active.end_date = Set(end_date);
        }
        Ok(())
    }
}

/// Stored position. Serializes through [`PositionView`] so the derived
/// `availableHeadcount` is present in every external form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub id: PositionId,
    pub position_code: String,
    pub position_title: String,
    pub position_title_arabic: Option<String>,
    pub description: Option<String>,
    pub department_id: DepartmentId,
    pub reports_to_position_id: Option<PositionId>,
    pub level: String,
    pub job_family: Option<String>,
    pub pay_grade_id: PayGradeId,
    pub headcount_budget: i32,
    pub current_headcount: i32,
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Budgeted slots not yet filled. Negative when over-allocated.
    pub fn available_headcount(&self) -> i32 {
        self.headcount_budget - self.current_headcount
    }

    pub fn is_over_allocated(&self) -> bool {
        self.current_headcount > self.headcount_budget
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_date <= date
            && self.end_date.is_none_or(|end| end >= date)
    }

    pub fn view(&self) -> PositionView<'_> {
        PositionView {
            id: self.id,
            position_code: &self.position_code,
            position_title: &self.position_title,
            position_title_arabic: self.position_title_arabic.as_deref(),
            description: self.description.as_deref(),
            department_id: self.department_id,
            reports_to_position_id: self.reports_to_position_id,
            level: &self.level,
            job_family: self.job_family.as_deref(),
            pay_grade_id: self.pay_grade_id,
            headcount_budget: self.headcount_budget,
            current_headcount: self.current_headcount,
            available_headcount: self.available_headcount(),
            is_active: self.is_active,
            effective_date: self.effective_date,
            end_date: self.end_date,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

/// Read-only projection of a [`Position`] with its derived fields filled in.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView<'a> {
    pub id: PositionId,
    pub position_code: &'a str,
    pub position_title: &'a str,
    pub position_title_arabic: Option<&'a str>,
    pub description: Option<&'a str>,
    pub department_id: DepartmentId,
    pub reports_to_position_id: Option<PositionId>,
    pub level: &'a str,
    pub job_family: Option<&'a str>,
    pub pay_grade_id: PayGradeId,
    pub headcount_budget: i32,
    pub current_headcount: i32,
    pub available_headcount: i32,
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<position::Model> for Position {
    fn from(model: position::Model) -> Self {
        Self {
            id: PositionId::from_uuid(model.id),
            position_code: model.position_code,
            position_title: model.position_title,
            position_title_arabic: model.position_title_arabic,
            description: model.description,
            department_id: DepartmentId::from_uuid(model.department_id),
            reports_to_position_id: model.reports_to_position_id.map(PositionId::from_uuid),
            level: model.level,
            job_family: model.job_family,
            pay_grade_id: PayGradeId::from_uuid(model.pay_grade_id),
            headcount_budget: model.headcount_budget,
            current_headcount: model.current_headcount,
            is_active: model.is_active,
            effective_date: model.effective_date,
            end_date: model.end_date,
            created_by: UserId::from_uuid(model.created_by),
            updated_by: UserId::from_uuid(model.updated_by),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

pub(crate) fn warn_on_over_allocation(code: &str, budget: i32, current: i32) {
    if current > budget {
        warn!(%code, budget, current, "position is over-allocated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(budget: i32, current: i32) -> Position {
        let now = Utc::now();
        let actor = UserId::generate();
        Position {
            id: PositionId::generate(),
            position_code: "SWE1".into(),
            position_title: "Software Engineer I".into(),
            position_title_arabic: None,
            description: None,
            department_id: DepartmentId::generate(),
            reports_to_position_id: None,
            level: "Junior".into(),
            job_family: Some("Engineering".into()),
            pay_grade_id: PayGradeId::generate(),
            headcount_budget: budget,
            current_headcount: current,
            is_active: true,
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn serialization_carries_available_headcount() {
        let value = serde_json::to_value(sample(5, 2)).unwrap();
        assert_eq!(value["availableHeadcount"], json!(3));
        assert_eq!(value["positionCode"], json!("SWE1"));
        assert_eq!(value["headcountBudget"], json!(5));
    }

    #[test]
    fn available_headcount_follows_current_values() {
        let mut position = sample(4, 1);
        assert_eq!(position.available_headcount(), 3);
        position.current_headcount = 6;
        assert_eq!(position.available_headcount(), -2);
        assert!(position.is_over_allocated());
        let text = serde_json::to_string(&position).unwrap();
        assert!(text.contains("\"availableHeadcount\":-2"));
    }

    #[test]
    fn available_headcount_is_not_writable() {
        let err = NewPosition::from_json(json!({
            "positionCode": "swe1",
            "availableHeadcount": 10
        }))
        .unwrap_err();
        assert!(matches!(err, HrError::TypeMismatch { .. }));
    }

    #[test]
    fn every_required_field_is_enforced() {
        let complete = json!({
            "positionCode": "swe1",
            "positionTitle": "Software Engineer I",
            "departmentId": DepartmentId::generate(),
            "level": "Junior",
            "payGradeId": PayGradeId::generate(),
            "effectiveDate": "2024-01-01"
        });
        assert!(NewPosition::from_json(complete.clone()).unwrap().validate().is_ok());

        for field in POSITION_RULES.required_fields() {
            let mut input = complete.clone();
            input.as_object_mut().unwrap().remove(field);
            let err = NewPosition::from_json(input).unwrap().validate().unwrap_err();
            match err {
                HrError::MissingRequiredField { field: missing } => assert_eq!(missing, field),
                other => panic!("{field}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn missing_department_is_reported() {
        let input = NewPosition {
            department_id: None,
            ..NewPosition::new(
                "swe1",
                "Software Engineer I",
                DepartmentId::generate(),
                "Junior",
                PayGradeId::generate(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
        };
        let err = input.validate().unwrap_err();
        assert!(matches!(
            err,
            HrError::MissingRequiredField {
                field: "departmentId"
            }
        ));
    }

    #[test]
    fn defaults_headcount_and_status() {
        let valid = NewPosition::new(
            " swe1 ",
            " Software Engineer I ",
            DepartmentId::generate(),
            " Junior ",
            PayGradeId::generate(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .validate()
        .unwrap();
        assert_eq!(valid.position_code, "SWE1");
        assert_eq!(valid.position_title, "Software Engineer I");
        assert_eq!(valid.level, "Junior");
        assert_eq!(valid.headcount_budget, DEFAULT_HEADCOUNT_BUDGET);
        assert_eq!(valid.current_headcount, 0);
        assert!(valid.is_active);
    }

    #[test]
    fn negative_headcount_is_rejected() {
        let input = NewPosition::new(
            "swe1",
            "Software Engineer I",
            DepartmentId::generate(),
            "Junior",
            PayGradeId::generate(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .with_headcount(-1, 0);
        let err = input.validate().unwrap_err();
        match err {
            HrError::TypeMismatch { field, .. } => assert_eq!(field, "headcountBudget"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn over_allocation_is_advisory() {
        let valid = NewPosition::new(
            "swe1",
            "Software Engineer I",
            DepartmentId::generate(),
            "Junior",
            PayGradeId::generate(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .with_headcount(1, 3)
        .validate()
        .unwrap();
        assert_eq!(valid.current_headcount, 3);
    }
}

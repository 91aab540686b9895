use chrono::{DateTime, NaiveDate, Utc};
use entity::department;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{HrError, HrResult},
    ids::{DepartmentId, EmployeeId, UserId},
    rules::{FieldRule, RuleTable, nullable},
};

/// Audit columns are stamped from the acting user and have no entry.
pub const DEPARTMENT_RULES: RuleTable = RuleTable {
    entity: "department",
    rules: &[
        FieldRule::optional("departmentCode")
            .required()
            .upper()
            .unique(),
        FieldRule::optional("departmentName").required().trimmed(),
        FieldRule::optional("departmentNameArabic").trimmed(),
        FieldRule::optional("description"),
        FieldRule::optional("parentDepartmentId"),
        FieldRule::optional("departmentHeadId"),
        FieldRule::optional("costCenter"),
        FieldRule::optional("isActive"),
        FieldRule::optional("effectiveDate").required(),
        FieldRule::optional("endDate"),
    ],
};

/// Write input for a new department.
///
/// Every field is optional at the type level; missing required values are
/// reported by [`DEPARTMENT_RULES`] rather than by the deserializer.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewDepartment {
    pub department_code: Option<String>,
    pub department_name: Option<String>,
    pub department_name_arabic: Option<String>,
    pub description: Option<String>,
    pub parent_department_id: Option<DepartmentId>,
    pub department_head_id: Option<EmployeeId>,
    pub cost_center: Option<String>,
    pub is_active: Option<bool>,
    pub effective_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewDepartment {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            department_code: Some(code.into()),
            department_name: Some(name.into()),
            effective_date: Some(effective_date),
            ..Self::default()
        }
    }

    pub fn from_json(value: serde_json::Value) -> HrResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| HrError::mismatch("department", err.to_string()))
    }

    pub fn with_parent(mut self, parent: DepartmentId) -> Self {
        self.parent_department_id = Some(parent);
        self
    }

    pub fn with_head(mut self, head: EmployeeId) -> Self {
        self.department_head_id = Some(head);
        self
    }

    pub fn validate(self) -> HrResult<ValidDepartment> {
        let rules = &DEPARTMENT_RULES;
        let valid = ValidDepartment {
            department_code: rules.required_text("departmentCode", self.department_code)?,
            department_name: rules.required_text("departmentName", self.department_name)?,
            department_name_arabic: rules
                .text("departmentNameArabic", self.department_name_arabic)?,
            description: rules.text("description", self.description)?,
            parent_department_id: self.parent_department_id,
            department_head_id: self.department_head_id,
            cost_center: rules.text("costCenter", self.cost_center)?,
            is_active: self.is_active.unwrap_or(true),
            effective_date: rules.required_value("effectiveDate", self.effective_date)?,
            end_date: self.end_date,
        };
        warn_on_inverted_window(&valid.department_code, valid.effective_date, valid.end_date);
        Ok(valid)
    }
}

/// A [`NewDepartment`] that passed the rule table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidDepartment {
    pub department_code: String,
    pub department_name: String,
    pub department_name_arabic: Option<String>,
    pub description: Option<String>,
    pub parent_department_id: Option<DepartmentId>,
    pub department_head_id: Option<EmployeeId>,
    pub cost_center: Option<String>,
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl ValidDepartment {
    pub(crate) fn into_active_model(
        self,
        id: DepartmentId,
        actor: UserId,
    ) -> department::ActiveModel {
        department::ActiveModel {
            id: Set(id.into_uuid()),
            department_code: Set(self.department_code),
            department_name: Set(self.department_name),
            department_name_arabic: Set(self.department_name_arabic),
            description: Set(self.description),
            parent_department_id: Set(self.parent_department_id.map(DepartmentId::into_uuid)),
            department_head_id: Set(self.department_head_id.map(EmployeeId::into_uuid)),
            cost_center: Set(self.cost_center),
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

/// Partial update. Omitted fields are left alone; nullable fields accept an
/// explicit `null` to clear them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepartmentChanges {
    pub department_code: Option<String>,
    pub department_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub department_name_arabic: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub parent_department_id: Option<Option<DepartmentId>>,
    #[serde(default, deserialize_with = "nullable")]
    pub department_head_id: Option<Option<EmployeeId>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cost_center: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub effective_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
}

impl DepartmentChanges {
    pub fn from_json(value: serde_json::Value) -> HrResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| HrError::mismatch("department", err.to_string()))
    }

    pub(crate) fn apply_to(self, active: &mut department::ActiveModel) -> HrResult<()> {
        let rules = &DEPARTMENT_RULES;
        if let Some(code) = rules.changed_text("departmentCode", self.department_code)? {
            active.department_code = Set(code);
        }
        if let Some(name) = rules.changed_text("departmentName", self.department_name)? {
            active.department_name = Set(name);
        }
        if let Some(arabic) =
            rules.changed_nullable_text("departmentNameArabic", self.department_name_arabic)?
        {
            active.department_name_arabic = Set(arabic);
        }
        if let Some(description) = rules.changed_nullable_text("description", self.description)? {
            active.description = Set(description);
        }
        if let Some(parent) = self.parent_department_id {
            active.parent_department_id = Set(parent.map(DepartmentId::into_uuid));
        }
        if let Some(head) = self.department_head_id {
            active.department_head_id = Set(head.map(EmployeeId::into_uuid));
        }
        if let Some(cost_center) = rules.changed_nullable_text("costCenter", self.cost_center)? {
            active.cost_center = Set(cost_center);
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

/// Stored department as exposed to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub department_code: String,
    pub department_name: String,
    pub department_name_arabic: Option<String>,
    pub description: Option<String>,
    pub parent_department_id: Option<DepartmentId>,
    pub department_head_id: Option<EmployeeId>,
    pub cost_center: Option<String>,
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    /// Active and inside its validity window on `date` (both ends inclusive).
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_date <= date
            && self.end_date.is_none_or(|end| end >= date)
    }

    pub fn is_root(&self) -> bool {
        self.parent_department_id.is_none()
    }
}

impl From<department::Model> for Department {
    fn from(model: department::Model) -> Self {
        Self {
            id: DepartmentId::from_uuid(model.id),
            department_code: model.department_code,
            department_name: model.department_name,
            department_name_arabic: model.department_name_arabic,
            description: model.description,
            parent_department_id: model.parent_department_id.map(DepartmentId::from_uuid),
            department_head_id: model.department_head_id.map(EmployeeId::from_uuid),
            cost_center: model.cost_center,
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

pub(crate) fn warn_on_inverted_window(code: &str, effective: NaiveDate, end: Option<NaiveDate>) {
    if let Some(end) = end.filter(|end| *end < effective) {
        warn!(%code, %effective, %end, "end date precedes effective date");
    }
}

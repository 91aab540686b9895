use anyhow::Result;
use products_hr::{
    Department, DepartmentId, DepartmentStore, NewDepartment, NewPosition, Position, PositionId,
    PositionStore, SeaOrmHrStore,
};
use tracing::info;

use crate::config::AppConfig;

struct DemoDepartment {
    code: &'static str,
    name: &'static str,
    name_arabic: Option<&'static str>,
    parent: Option<&'static str>,
}

struct DemoPosition {
    code: &'static str,
    title: &'static str,
    department: &'static str,
    level: &'static str,
    job_family: &'static str,
    reports_to: Option<&'static str>,
    budget: i32,
    current: i32,
}

const DEPARTMENTS: &[DemoDepartment] = &[
    DemoDepartment {
        code: "CORP",
        name: "Corporate",
        name_arabic: Some("الإدارة العامة"),
        parent: None,
    },
    DemoDepartment {
        code: "ENG",
        name: "Engineering",
        name_arabic: Some("الهندسة"),
        parent: Some("CORP"),
    },
    DemoDepartment {
        code: "OPS",
        name: "Operations",
        name_arabic: None,
        parent: Some("CORP"),
    },
    DemoDepartment {
        code: "HR",
        name: "Human Resources",
        name_arabic: Some("الموارد البشرية"),
        parent: Some("CORP"),
    },
];

const POSITIONS: &[DemoPosition] = &[
    DemoPosition {
        code: "CEO",
        title: "Chief Executive Officer",
        department: "CORP",
        level: "Executive",
        job_family: "Leadership",
        reports_to: None,
        budget: 1,
        current: 1,
    },
    DemoPosition {
        code: "EM1",
        title: "Engineering Manager",
        department: "ENG",
        level: "Manager",
        job_family: "Engineering",
        reports_to: Some("CEO"),
        budget: 2,
        current: 1,
    },
    DemoPosition {
        code: "SWE1",
        title: "Software Engineer I",
        department: "ENG",
        level: "Junior",
        job_family: "Engineering",
        reports_to: Some("EM1"),
        budget: 5,
        current: 2,
    },
    DemoPosition {
        code: "OPSLEAD",
        title: "Operations Lead",
        department: "OPS",
        level: "Senior",
        job_family: "Operations",
        reports_to: Some("CEO"),
        budget: 1,
        current: 0,
    },
    DemoPosition {
        code: "HRBP",
        title: "HR Business Partner",
        department: "HR",
        level: "Senior",
        job_family: "People",
        reports_to: Some("CEO"),
        budget: 2,
        current: 1,
    },
];

/// Inserts the demo organisation. Codes that already exist are skipped, so
/// running the seed twice is harmless.
pub async fn run(store: &SeaOrmHrStore, config: &AppConfig) -> Result<()> {
    let mut created = 0usize;
    for demo in DEPARTMENTS {
        if store.department_by_code(demo.code).await?.is_some() {
            continue;
        }
        let parent = match demo.parent {
            Some(code) => Some(department_id(store, code).await?),
            None => None,
        };
        let mut input = NewDepartment::new(demo.code, demo.name, config.seed_effective_date);
        input.department_name_arabic = demo.name_arabic.map(str::to_string);
        input.parent_department_id = parent;
        let dept: Department = store.create_department(input, config.seed_actor).await?;
        info!(code = %dept.department_code, "seeded department");
        created += 1;
    }

    for demo in POSITIONS {
        if store.position_by_code(demo.code).await?.is_some() {
            continue;
        }
        let department = department_id(store, demo.department).await?;
        let mut input = NewPosition::new(
            demo.code,
            demo.title,
            department,
            demo.level,
            config.seed_pay_grade,
            config.seed_effective_date,
        )
        .with_headcount(demo.budget, demo.current)
        .in_job_family(demo.job_family);
        if let Some(manager) = demo.reports_to {
            input = input.reporting_to(position_id(store, manager).await?);
        }
        let position: Position = store.create_position(input, config.seed_actor).await?;
        info!(
            code = %position.position_code,
            available = position.available_headcount(),
            "seeded position"
        );
        created += 1;
    }

    info!(created, "seed finished");
    Ok(())
}

async fn department_id(store: &SeaOrmHrStore, code: &str) -> Result<DepartmentId> {
    store
        .department_by_code(code)
        .await?
        .map(|dept| dept.id)
        .ok_or_else(|| anyhow::anyhow!("seed department {code} missing"))
}

async fn position_id(store: &SeaOrmHrStore, code: &str) -> Result<PositionId> {
    store
        .position_by_code(code)
        .await?
        .map(|position| position.id)
        .ok_or_else(|| anyhow::anyhow!("seed position {code} missing"))
}

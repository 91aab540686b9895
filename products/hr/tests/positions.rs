mod common;

use common::{date, department, jan_first, position, store};
use products_hr::{
    HrError, KnownReferences, NewPosition, PayGradeId, PositionChanges, PositionId,
    PositionStore, SeaOrmHrStore, UserId,
};
use entity::position as position_row;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::json;
use tokio::task::JoinSet;
use uuid::Uuid;

#[tokio::test]
async fn serialized_position_carries_available_headcount() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    let grade = PayGradeId::generate();

    let created = store
        .create_position(
            NewPosition::new("swe1", "Software Engineer I", eng.id, "Junior", grade, jan_first())
                .with_headcount(5, 2),
            actor,
        )
        .await
        .unwrap();

    assert_eq!(created.position_code, "SWE1");
    assert_eq!(created.available_headcount(), 3);

    let object = serde_json::to_value(&created).unwrap();
    assert_eq!(object["availableHeadcount"], json!(3));
    assert_eq!(object["departmentId"], json!(eng.id.to_string()));
    assert_eq!(object["payGradeId"], json!(grade.to_string()));

    let wire = serde_json::to_string(&created).unwrap();
    assert!(wire.contains("\"availableHeadcount\":3"));
}

#[tokio::test]
async fn headcount_defaults_apply_on_create() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;

    let created = position(&store, "lead", eng.id, "Lead", actor).await;

    assert_eq!(created.headcount_budget, 1);
    assert_eq!(created.current_headcount, 0);
    assert_eq!(created.available_headcount(), 1);
    assert!(created.is_active);
}

#[tokio::test]
async fn position_without_department_is_rejected() {
    let store = store().await;
    let input = NewPosition::from_json(json!({
        "positionCode": "swe1",
        "positionTitle": "Software Engineer I",
        "level": "Junior",
        "payGradeId": PayGradeId::generate(),
        "effectiveDate": "2024-01-01"
    }))
    .unwrap();

    let err = store
        .create_position(input, UserId::generate())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HrError::MissingRequiredField {
            field: "departmentId"
        }
    ));
}

#[tokio::test]
async fn available_headcount_is_not_accepted_as_input() {
    let err = NewPosition::from_json(json!({
        "positionCode": "swe1",
        "availableHeadcount": 4
    }))
    .unwrap_err();
    assert!(matches!(err, HrError::TypeMismatch { .. }));

    let err = PositionChanges::from_json(json!({ "availableHeadcount": 4 })).unwrap_err();
    assert!(matches!(err, HrError::TypeMismatch { .. }));
}

#[tokio::test]
async fn unknown_department_is_an_invalid_reference() {
    let store = store().await;
    let input = NewPosition::new(
        "swe1",
        "Software Engineer I",
        products_hr::DepartmentId::generate(),
        "Junior",
        PayGradeId::generate(),
        jan_first(),
    );

    let err = store
        .create_position(input, UserId::generate())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HrError::InvalidReference {
            field: "departmentId",
            ..
        }
    ));
}

#[tokio::test]
async fn position_codes_are_case_insensitively_unique() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    position(&store, "swe1", eng.id, "Junior", actor).await;

    let err = store
        .create_position(
            NewPosition::new(
                "SWE1 ",
                "Duplicate",
                eng.id,
                "Junior",
                PayGradeId::generate(),
                jan_first(),
            ),
            actor,
        )
        .await
        .unwrap_err();

    match err {
        HrError::DuplicateKey { field, value } => {
            assert_eq!(field, "positionCode");
            assert_eq!(value, "SWE1");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn headcount_changes_are_reflected_on_read() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    let created = store
        .create_position(
            NewPosition::new(
                "swe2",
                "Software Engineer II",
                eng.id,
                "Mid",
                PayGradeId::generate(),
                jan_first(),
            )
            .with_headcount(2, 0),
            actor,
        )
        .await
        .unwrap();

    let filled = store.adjust_headcount(created.id, 3, actor).await.unwrap();
    assert_eq!(filled.current_headcount, 3);
    assert!(filled.is_over_allocated());
    assert_eq!(
        serde_json::to_value(&filled).unwrap()["availableHeadcount"],
        json!(-1)
    );

    let err = store
        .adjust_headcount(created.id, -4, actor)
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::TypeMismatch { .. }));

    let widened = store
        .update_position(
            created.id,
            PositionChanges {
                headcount_budget: Some(6),
                ..PositionChanges::default()
            },
            actor,
        )
        .await
        .unwrap();
    assert_eq!(widened.available_headcount(), 3);
    let reread = store.position(created.id).await.unwrap().unwrap();
    assert_eq!(reread.available_headcount(), 3);
}

#[tokio::test]
async fn indexed_lookups_filter_as_expected() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    let ops = department(&store, "ops", None, actor).await;

    let manager = store
        .create_position(
            NewPosition::new(
                "em1",
                "Engineering Manager",
                eng.id,
                "Manager",
                PayGradeId::generate(),
                jan_first(),
            )
            .in_job_family("Engineering"),
            actor,
        )
        .await
        .unwrap();
    let report = store
        .create_position(
            NewPosition::new(
                "swe1",
                "Software Engineer I",
                eng.id,
                "Junior",
                PayGradeId::generate(),
                jan_first(),
            )
            .in_job_family("Engineering")
            .reporting_to(manager.id),
            actor,
        )
        .await
        .unwrap();
    let sre = position(&store, "sre1", ops.id, "Junior", actor).await;
    store
        .retire_position(sre.id, date(2024, 3, 31), actor)
        .await
        .unwrap();

    let ids = |positions: Vec<products_hr::Position>| -> Vec<PositionId> {
        positions.into_iter().map(|p| p.id).collect()
    };

    assert_eq!(
        ids(store.positions_in_department(eng.id).await.unwrap()),
        vec![manager.id, report.id]
    );
    assert_eq!(ids(store.direct_reports(manager.id).await.unwrap()), vec![report.id]);
    assert_eq!(
        ids(store.positions_at_level(" Junior ").await.unwrap()),
        vec![sre.id, report.id]
    );
    assert_eq!(
        ids(store.positions_in_job_family("Engineering").await.unwrap()),
        vec![manager.id, report.id]
    );
    assert_eq!(
        ids(store.active_positions().await.unwrap()),
        vec![manager.id, report.id]
    );
    assert_eq!(
        store.position_by_code(" swe1").await.unwrap().map(|p| p.id),
        Some(report.id)
    );
}

#[tokio::test]
async fn retired_positions_remain_readable() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    let created = position(&store, "intern", eng.id, "Junior", actor).await;

    let retired = store
        .retire_position(created.id, date(2024, 8, 31), actor)
        .await
        .unwrap();

    assert!(!retired.is_active);
    assert_eq!(retired.end_date, Some(date(2024, 8, 31)));
    assert!(!retired.is_effective_on(date(2024, 9, 1)));
    assert!(store.position(created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_pay_grade_is_an_invalid_reference() {
    let actor = UserId::generate();
    let known_grade = PayGradeId::generate();
    let store = SeaOrmHrStore::new(common::connect().await).with_references(
        KnownReferences::default()
            .with_user(actor)
            .with_pay_grade(known_grade),
    );
    let eng = department(&store, "eng", None, actor).await;

    let ok = store
        .create_position(
            NewPosition::new("swe1", "SWE I", eng.id, "Junior", known_grade, jan_first()),
            actor,
        )
        .await;
    assert!(ok.is_ok());

    let err = store
        .create_position(
            NewPosition::new(
                "swe2",
                "SWE II",
                eng.id,
                "Mid",
                PayGradeId::generate(),
                jan_first(),
            ),
            actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HrError::InvalidReference {
            field: "payGradeId",
            ..
        }
    ));
}

#[tokio::test]
async fn concurrent_fills_all_land() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    let created = position(&store, "swe1", eng.id, "Junior", actor).await;
    assert_eq!(created.current_headcount, 0);

    let mut fills = JoinSet::new();
    for _ in 0..10 {
        let store = store.clone();
        fills.spawn(async move { store.adjust_headcount(created.id, 1, actor).await });
    }
    let mut succeeded = 0;
    while let Some(joined) = fills.join_next().await {
        joined.unwrap().unwrap();
        succeeded += 1;
    }

    assert_eq!(succeeded, 10);
    let stored = store.position(created.id).await.unwrap().unwrap();
    assert_eq!(stored.current_headcount, 10);
    assert_eq!(stored.available_headcount(), -9);
}

#[tokio::test]
async fn concurrent_vacates_stop_at_zero() {
    let store = store().await;
    let actor = UserId::generate();
    let eng = department(&store, "eng", None, actor).await;
    let created = store
        .create_position(
            NewPosition::new("ops", "Ops", eng.id, "Junior", PayGradeId::generate(), jan_first())
                .with_headcount(5, 3),
            actor,
        )
        .await
        .unwrap();

    let mut vacates = JoinSet::new();
    for _ in 0..5 {
        let store = store.clone();
        vacates.spawn(async move { store.adjust_headcount(created.id, -1, actor).await });
    }
    let mut refused = 0;
    while let Some(joined) = vacates.join_next().await {
        match joined.unwrap() {
            Ok(_) => {}
            Err(HrError::TypeMismatch { .. }) => refused += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(refused, 2);
    let stored = store.position(created.id).await.unwrap().unwrap();
    assert_eq!(stored.current_headcount, 0);
}

#[tokio::test]
async fn adjusting_a_missing_position_is_not_found() {
    let store = store().await;
    let err = store
        .adjust_headcount(PositionId::generate(), 1, UserId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::NotFound { entity: "position", .. }));
}

#[tokio::test]
async fn foreign_keys_reject_writes_that_skip_the_store() {
    let store = store().await;
    let actor = UserId::generate();

    let orphan = position_row::ActiveModel {
        id: Set(Uuid::new_v4()),
        position_code: Set("ORPHAN".into()),
        position_title: Set("Orphan".into()),
        position_title_arabic: Set(None),
        description: Set(None),
        department_id: Set(Uuid::new_v4()),
        reports_to_position_id: Set(None),
        level: Set("Junior".into()),
        job_family: Set(None),
        pay_grade_id: Set(Uuid::new_v4()),
        headcount_budget: Set(1),
        current_headcount: Set(0),
        is_active: Set(true),
        effective_date: Set(jan_first()),
        end_date: Set(None),
        created_by: Set(actor.into_uuid()),
        updated_by: Set(actor.into_uuid()),
        ..Default::default()
    };
    let err = HrError::from(orphan.insert(store.connection()).await.unwrap_err());

    match err {
        HrError::InvalidReference { field, detail } => {
            assert_eq!(field, "reference");
            assert!(detail.contains("FOREIGN KEY"), "{detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

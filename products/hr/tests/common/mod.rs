#![allow(dead_code)]

use std::{
    io,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use products_hr::{
    Department, DepartmentId, DepartmentStore, NewDepartment, NewPosition, PayGradeId, Position,
    PositionStore, ReferenceDirectory, SeaOrmHrStore, UserId,
};
use sea_orm::{Database, DatabaseConnection};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub async fn connect() -> DatabaseConnection {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&conn, None).await.unwrap();
    conn
}

pub async fn store() -> SeaOrmHrStore {
    SeaOrmHrStore::new(connect().await)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn jan_first() -> NaiveDate {
    date(2024, 1, 1)
}

pub async fn department<R: ReferenceDirectory>(
    store: &SeaOrmHrStore<R>,
    code: &str,
    parent: Option<DepartmentId>,
    actor: UserId,
) -> Department {
    let mut input = NewDepartment::new(code, format!("{code} department"), jan_first());
    input.parent_department_id = parent;
    store.create_department(input, actor).await.unwrap()
}

pub async fn position<R: ReferenceDirectory>(
    store: &SeaOrmHrStore<R>,
    code: &str,
    department: DepartmentId,
    level: &str,
    actor: UserId,
) -> Position {
    let input = NewPosition::new(
        code,
        format!("{code} title"),
        department,
        level,
        PayGradeId::generate(),
        jan_first(),
    );
    store.create_position(input, actor).await.unwrap()
}

/// Log lines written while the returned guard is alive on this thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

//! Parent and reporting-line maintenance.
//!
//! Plain store updates accept any existing id as a parent, including the
//! record itself. Reorganisations that must keep the tree acyclic go through
//! [`HierarchyService`].

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    department::{Department, DepartmentChanges},
    error::{HrError, HrResult},
    ids::{DepartmentId, PositionId, UserId},
    position::{Position, PositionChanges},
    repository::{DepartmentStore, PositionStore},
};

/// A department with its active sub-departments, ordered by code.
#[derive(Clone, Debug, Serialize)]
pub struct DepartmentNode {
    #[serde(flatten)]
    pub department: Department,
    pub children: Vec<DepartmentNode>,
}

impl DepartmentNode {
    /// Number of departments in this subtree, the root included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(DepartmentNode::size).sum::<usize>()
    }
}

pub struct HierarchyService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ?Sized> HierarchyService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: DepartmentStore + ?Sized> HierarchyService<'_, S> {
    /// Parents of `id`, nearest first.
    pub async fn department_ancestors(&self, id: DepartmentId) -> HrResult<Vec<Department>> {
        let start = self
            .store
            .department(id)
            .await?
            .ok_or_else(|| HrError::NotFound {
                entity: "department",
                id: id.to_string(),
            })?;
        self.ancestors_of(&start).await
    }

    async fn ancestors_of(&self, start: &Department) -> HrResult<Vec<Department>> {
        let mut seen = HashSet::from([start.id]);
        let mut chain = Vec::new();
        let mut next = start.parent_department_id;
        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                return Err(HrError::HierarchyCycle {
                    entity: "department",
                    id: parent_id.to_string(),
                });
            }
            let parent = self
                .store
                .department(parent_id)
                .await?
                .ok_or_else(|| HrError::InvalidReference {
                    field: "parentDepartmentId",
                    detail: parent_id.to_string(),
                })?;
            next = parent.parent_department_id;
            chain.push(parent);
        }
        Ok(chain)
    }

    /// Re-parents a department, refusing moves that would close a loop.
    pub async fn move_department(
        &self,
        id: DepartmentId,
        new_parent: Option<DepartmentId>,
        actor: UserId,
    ) -> HrResult<Department> {
        if let Some(parent_id) = new_parent {
            let parent = self
                .store
                .department(parent_id)
                .await?
                .ok_or_else(|| HrError::InvalidReference {
                    field: "parentDepartmentId",
                    detail: parent_id.to_string(),
                })?;
            let closes_loop = parent.id == id
                || self
                    .ancestors_of(&parent)
                    .await?
                    .iter()
                    .any(|ancestor| ancestor.id == id);
            if closes_loop {
                return Err(HrError::HierarchyCycle {
                    entity: "department",
                    id: id.to_string(),
                });
            }
        }

        let changes = DepartmentChanges {
            parent_department_id: Some(new_parent),
            ..DepartmentChanges::default()
        };
        let moved = self.store.update_department(id, changes, actor).await?;
        info!(%id, parent = ?new_parent, "department moved");
        Ok(moved)
    }

    /// Active departments arranged under their parents.
    ///
    /// Departments whose parent is retired or missing become roots. Members of
    /// a parent loop have no root to hang from and are left out.
    pub async fn department_tree(&self) -> HrResult<Vec<DepartmentNode>> {
        let active = self.store.active_departments().await?;
        let known: HashSet<DepartmentId> = active.iter().map(|dept| dept.id).collect();
        let total = active.len();

        let mut roots = Vec::new();
        let mut by_parent: BTreeMap<DepartmentId, Vec<Department>> = BTreeMap::new();
        for dept in active {
            match dept.parent_department_id {
                Some(parent) if known.contains(&parent) => {
                    by_parent.entry(parent).or_default().push(dept)
                }
                _ => roots.push(dept),
            }
        }

        let mut placed = HashSet::new();
        let tree: Vec<DepartmentNode> = roots
            .into_iter()
            .map(|root| attach(root, &mut by_parent, &mut placed))
            .collect();

        let placed_count: usize = tree.iter().map(DepartmentNode::size).sum();
        if placed_count < total {
            warn!(
                skipped = total - placed_count,
                "departments in a parent loop left out of the tree"
            );
        }
        Ok(tree)
    }
}

fn attach(
    department: Department,
    by_parent: &mut BTreeMap<DepartmentId, Vec<Department>>,
    placed: &mut HashSet<DepartmentId>,
) -> DepartmentNode {
    placed.insert(department.id);
    let mut children = Vec::new();
    for child in by_parent.remove(&department.id).unwrap_or_default() {
        if !placed.contains(&child.id) {
            children.push(attach(child, by_parent, placed));
        }
    }
    DepartmentNode {
        department,
        children,
    }
}

impl<S: PositionStore + ?Sized> HierarchyService<'_, S> {
    /// Positions above `id` in the reporting line, nearest first.
    pub async fn reporting_chain(&self, id: PositionId) -> HrResult<Vec<Position>> {
        let start = self
            .store
            .position(id)
            .await?
            .ok_or_else(|| HrError::NotFound {
                entity: "position",
                id: id.to_string(),
            })?;
        self.managers_of(&start).await
    }

    async fn managers_of(&self, start: &Position) -> HrResult<Vec<Position>> {
        let mut seen = HashSet::from([start.id]);
        let mut chain = Vec::new();
        let mut next = start.reports_to_position_id;
        while let Some(manager_id) = next {
            if !seen.insert(manager_id) {
                return Err(HrError::HierarchyCycle {
                    entity: "position",
                    id: manager_id.to_string(),
                });
            }
            let manager = self
                .store
                .position(manager_id)
                .await?
                .ok_or_else(|| HrError::InvalidReference {
                    field: "reportsToPositionId",
                    detail: manager_id.to_string(),
                })?;
            next = manager.reports_to_position_id;
            chain.push(manager);
        }
        Ok(chain)
    }

    /// Points a position at a new manager position, refusing loops.
    pub async fn set_reports_to(
        &self,
        id: PositionId,
        manager: Option<PositionId>,
        actor: UserId,
    ) -> HrResult<Position> {
        if let Some(manager_id) = manager {
            let target = self
                .store
                .position(manager_id)
                .await?
                .ok_or_else(|| HrError::InvalidReference {
                    field: "reportsToPositionId",
                    detail: manager_id.to_string(),
                })?;
            let closes_loop = target.id == id
                || self
                    .managers_of(&target)
                    .await?
                    .iter()
                    .any(|above| above.id == id);
            if closes_loop {
                return Err(HrError::HierarchyCycle {
                    entity: "position",
                    id: id.to_string(),
                });
            }
        }

        let changes = PositionChanges {
            reports_to_position_id: Some(manager),
            ..PositionChanges::default()
        };
        let updated = self.store.update_position(id, changes, actor).await?;
        info!(%id, manager = ?manager, "reporting line changed");
        Ok(updated)
    }
}

//! Persistence shapes for the HR organisation tables.
//!
//! Constraint enforcement (trimming, casing, required fields) lives in
//! `products-hr`; these models only describe columns and relations.

pub mod department;
pub mod position;

pub mod prelude {
    pub use super::department::Entity as Department;
    pub use super::position::Entity as Position;
}

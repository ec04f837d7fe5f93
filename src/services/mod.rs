//! Business rules layered over the store: validation, generated keys, the
//! ledger applier entry point and the dashboard aggregates.

pub mod accounts;
pub mod catalog;
pub mod dashboard;
pub mod ledger;
pub mod orders;
pub mod warehouses;

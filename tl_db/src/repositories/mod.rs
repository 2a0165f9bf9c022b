//! ABOUTME: Repository modules for the three service tables
//! ABOUTME: Each module owns its schema, fixtures, and queries

pub mod inventory;
pub mod orders;
pub mod users;

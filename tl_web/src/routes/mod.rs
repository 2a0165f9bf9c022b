//! ABOUTME: Route modules for the three service kinds
//! ABOUTME: Only the routes of the running kind are mounted

pub mod inventory;
pub mod orders;
pub mod users;

use actix_web::web;
use tl_core::ServiceKind;

/// Mount the domain routes of `kind`
pub fn configure(kind: ServiceKind, cfg: &mut web::ServiceConfig) {
    match kind {
        ServiceKind::Inventory => inventory::configure(cfg),
        ServiceKind::Order => orders::configure(cfg),
        ServiceKind::User => users::configure(cfg),
    }
}

//! Route handlers organized by firewall and access level.

pub mod admin;
pub mod api;
pub mod home;
pub mod public;

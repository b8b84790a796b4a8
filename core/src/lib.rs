//! Core logic for URL-parameter-driven list filtering.
//!
//! The domain layer turns recognized `Filter-<Entity>-<field>` request
//! parameters into query conditions and form view values, and drives the
//! persistence of submitted filter selections across requests. The
//! infrastructure layer maps derived conditions onto sea-orm and provides
//! store adapters for the selection port.

pub mod domain;
pub mod infrastructure;

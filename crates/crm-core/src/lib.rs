//! # crm-core
//!
//! Core types, schema, and validation for the CRM core.
//!
//! This crate provides the foundational types shared across all CRM crates:
//! - Entity structs for all domain objects (businesses, contacts, tasks, ...)
//! - Status and category enums with their stored string forms
//! - Per-entity column schema and required-field validation
//! - Virtual folder paths and the `DocumentEntry` listing union
//! - Audit field-name classification and snapshot redaction
//! - Cross-cutting error types and the user-facing `ErrorKind`

pub mod audit;
pub mod documents;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod paths;
pub mod schema;
pub mod validation;

/// A record as exchanged with the record store: column name to JSON value.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

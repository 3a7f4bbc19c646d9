//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Gate every access to an existing thing through the permission evaluator.
//! - Wrap each multi-row lifecycle operation in one transaction.
//!
//! # Invariants
//! - Authorization denial is `Ok(None)`; storage faults are `Err`.
//! - No transaction stays open across a credential hash computation.

pub mod credentials;
pub mod entity_store;
pub mod identity_service;
pub mod permission_evaluator;

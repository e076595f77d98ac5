//! Typed repositories over the local table store.
//!
//! # Responsibility
//! - Keep SQL for typed entities inside the persistence boundary.
//! - Offer transactional writes the generic bridge primitives cannot express.

pub mod grant_repo;

//! API handlers module

pub mod ask;
pub mod chat;
pub mod clauses;
pub mod form;
pub mod health;

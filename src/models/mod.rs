//! Data models for Libris

pub mod book;
pub mod enums;
pub mod fee;
pub mod transaction;
pub mod user;

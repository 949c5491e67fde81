/// Database layer: open, migrate, CRUD, order allocation, polymorphic content.
pub mod db;
/// Data types: Subject, Course, Module, Content, and the item variants.
pub mod models;
/// Axum-based JSON API and router.
pub mod web;

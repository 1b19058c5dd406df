pub mod app;
pub mod file_repository;
pub mod render;

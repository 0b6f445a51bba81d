pub mod error;
pub mod repository;
pub mod submission_service;

pub mod catalog_service;
pub mod grading_service;
pub mod quiz_service;
pub mod stats_service;
pub mod user_service;

pub mod catalog_dto;
pub mod quiz_dto;
pub mod user_dto;

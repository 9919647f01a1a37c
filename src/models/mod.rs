pub mod answer;
pub mod category;
pub mod question;
pub mod user;
pub mod user_response;

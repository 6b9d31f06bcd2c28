pub mod dashboard;
pub mod meetings;
pub mod users;

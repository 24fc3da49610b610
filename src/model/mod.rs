pub mod attendance;
pub mod credential;
pub mod employee;
pub mod shift;

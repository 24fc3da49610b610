pub mod attendance;
pub mod shift;

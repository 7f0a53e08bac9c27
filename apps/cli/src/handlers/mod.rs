pub mod autoconfig;
pub mod manifest;
pub mod testing;

pub mod event;
pub mod suggestion;

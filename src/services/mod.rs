pub mod drs_service;
pub mod events;
pub mod object_store;
pub mod populate;

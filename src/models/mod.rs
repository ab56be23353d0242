pub mod entity_state;
pub mod policy;
pub mod preset;
pub mod request;
pub mod result;
pub mod target;

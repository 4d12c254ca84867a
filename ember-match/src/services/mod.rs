pub mod conversation_service;
pub mod discovery_service;
pub mod distance;
pub mod profile_service;
pub mod quota;
pub mod swipe_service;

pub mod dispatch;
pub mod route_cache;
pub mod service;

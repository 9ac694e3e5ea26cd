pub mod adapter;
pub mod dns;
pub mod rest_backend;

pub use adapter::ProvisioningAdapter;
pub use dns::DnsTool;
pub use rest_backend::RestBackend;

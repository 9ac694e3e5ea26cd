pub mod driver;
pub mod ssh_driver;
pub mod validate;

pub use driver::{
    DiscoveredSwitch, FeatureCheck, L3InterfaceStatus, LacpBondStatus, ServicePortStatus, SwitchDriver,
    VlanStatus,
};
pub use ssh_driver::SshSwitchDriver;
pub use validate::{server_number_get, switch_discover, switch_validate_for_rack, switch_validate_for_server};

use std::net::IpAddr;

use fleet_model::FleetResult;
use fleet_model::network::{ServerInterface, Subnet};
use fleet_model::rack::Rack;
use fleet_model::server::Server;

/// Neutral provisioning back-end contract, §4.6. The default implementation
/// ([`crate::rest_backend::RestBackend`]) targets a host-management REST
/// service; other back-ends (e.g. a cloud SDK) implement the same trait.
#[async_trait::async_trait]
pub trait ProvisioningAdapter: Send + Sync {
    /// Removes any prior host record and associated DNS entries.
    async fn server_delete(&self, server: &Server) -> FleetResult<()>;

    /// S0->S1: computes mgmt-gateway config, ensures `subnets` are
    /// registered with the back-end, registers the host under a
    /// "verification" OS profile pinned to the mgmt vlan, restarts into
    /// PXE.
    async fn server_s0_s1(&self, server: &Server, rack: &Rack, subnets: &[Subnet]) -> FleetResult<()>;

    /// S1->S2: as above but with the target OS profile, production as
    /// primary gateway, and bonded/tagged `interfaces` per the rack's
    /// NetworkMap patched with actual discovered interface names; also
    /// notifies the back-end's `host_recreated` so downstream key material
    /// rotates.
    async fn server_s1_s2(
        &self,
        server: &Server,
        rack: &Rack,
        interfaces: &[ServerInterface],
    ) -> FleetResult<()>;

    /// `(done, message)`. Done iff the back-end reports build complete AND
    /// the host answers SSH on `iface_ip`.
    async fn is_provisioned(&self, server: &Server, iface_ip: IpAddr) -> FleetResult<(bool, String)>;

    /// Enumerates available OS profiles, optionally filtered by `name`.
    async fn os_list(&self, name: Option<&str>) -> FleetResult<Vec<String>>;
}

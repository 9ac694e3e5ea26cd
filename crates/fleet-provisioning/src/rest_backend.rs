use std::net::IpAddr;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use fleet_model::FleetResult;
use fleet_model::network::{ServerInterface, Subnet};
use fleet_model::rack::Rack;
use fleet_model::server::Server;
use fleet_model::{FleetError, sanitize_stdout};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::adapter::ProvisioningAdapter;
use crate::dns::DnsTool;

const REST_RETRY_ATTEMPTS: usize = 5;
const REST_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Default host-management REST back-end, §4.6: subnet create, host
/// create/delete, search by mac/name. Every call retries up to
/// [`REST_RETRY_ATTEMPTS`] times on transport failure or a non-2xx, non-404
/// response; a 404 always surfaces as [`FleetError::NotFound`] without
/// retrying.
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    verification_os: String,
    dns: DnsTool,
    dns_zone: String,
    /// §5 named mutex `foreman_request`: the default back-end is not
    /// concurrency-safe, so every write this process makes against it is
    /// serialized behind this lock rather than relying on the back-end's
    /// own locking.
    foreman_request: Mutex<()>,
    /// §5 named mutex `host_recreated`: serializes the orchestrator call
    /// that rotates a rebuilt host's key material.
    host_recreated: Mutex<()>,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        verification_os: impl Into<String>,
        dns_executable: impl Into<String>,
        dns_zone: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token: api_token.into(),
            verification_os: verification_os.into(),
            dns: DnsTool::new(dns_executable),
            dns_zone: dns_zone.into(),
            foreman_request: Mutex::new(()),
            host_recreated: Mutex::new(()),
        }
    }

    /// `worker.default_dns_zone`-qualified name when the server has no
    /// explicit `fqdn` set, §6.
    fn fqdn_for(&self, server: &Server) -> String {
        match &server.fqdn {
            Some(fqdn) => fqdn.clone(),
            None => format!("{}.{}", server.name, self.dns_zone),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Issues a call expecting a JSON response body.
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> FleetResult<T> {
        let text = self.request_text(method, path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| FleetError::InvalidData(format!("malformed response from back-end: {e}")))
    }

    /// Issues a call whose response body carries no information the caller
    /// needs (host create/delete, subnet create).
    async fn request_unit(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> FleetResult<()> {
        self.request_text(method, path, body).await.map(|_| ())
    }

    async fn request_text(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> FleetResult<String> {
        let body_bytes = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| {
                FleetError::InvalidData(format!("failed to encode request body: {e}"))
            })?),
            None => None,
        };

        // §5 `foreman_request`: only writes need serializing against the
        // back-end's own lack of concurrency safety; GETs are read-only.
        let _guard = if method != reqwest::Method::GET {
            Some(self.foreman_request.lock().await)
        } else {
            None
        };

        (|| self.try_once(method.clone(), path, body_bytes.as_deref()))
            .retry(
                ConstantBuilder::default()
                    .with_delay(REST_RETRY_BACKOFF)
                    .with_max_times(REST_RETRY_ATTEMPTS - 1),
            )
            .when(|e: &FleetError| !matches!(e, FleetError::NotFound(_) | FleetError::InvalidData(_)))
            .notify(|err, dur| {
                tracing::warn!(?dur, error = %err, "retrying provisioning back-end call");
            })
            .await
    }

    async fn try_once(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> FleetResult<String> {
        let mut req = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.api_token);
        if let Some(body) = body {
            req = req.header("Content-Type", "application/json").body(body.to_vec());
        }

        let response = req
            .send()
            .await
            .map_err(|e| FleetError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FleetError::Transport(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(FleetError::NotFound(format!("{path}: not found")));
        }
        if !status.is_success() {
            return Err(FleetError::Transport(format!(
                "{status}: {}",
                sanitize_stdout(&text)
            )));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct SubnetCreateRequest<'a> {
    network: String,
    vlan: i32,
    gateway: Option<String>,
    location: &'a str,
}

#[derive(Serialize)]
struct HostCreateRequest<'a> {
    fqdn: &'a str,
    os_profile: &'a str,
    primary_gateway: Option<String>,
    interfaces: Vec<HostInterface>,
}

#[derive(Serialize)]
struct HostInterface {
    name: String,
    mac: String,
    network_name: String,
    bond_members: Vec<String>,
    tagged: bool,
}

#[derive(Deserialize)]
struct BuildStatusResponse {
    build_complete: bool,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct OsProfileList {
    profiles: Vec<String>,
}

#[async_trait::async_trait]
impl ProvisioningAdapter for RestBackend {
    async fn server_delete(&self, server: &Server) -> FleetResult<()> {
        let outcome = self
            .request_unit(
                reqwest::Method::DELETE,
                &format!("/hosts/{}", server.name),
                None::<&()>,
            )
            .await;
        match outcome {
            Ok(()) | Err(FleetError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        if let Some(fqdn) = &server.fqdn {
            self.dns.remove(fqdn).await?;
        }
        Ok(())
    }

    async fn server_s0_s1(&self, server: &Server, rack: &Rack, subnets: &[Subnet]) -> FleetResult<()> {
        for subnet in subnets {
            let body = SubnetCreateRequest {
                network: subnet.network.to_string(),
                vlan: subnet.vlan,
                gateway: subnet.gateway.map(|g| g.to_string()),
                location: &subnet.location,
            };
            self.request_unit(reqwest::Method::PUT, "/subnets", Some(&body))
                .await?;
        }

        let fqdn = self.fqdn_for(server);
        let body = HostCreateRequest {
            fqdn: &fqdn,
            os_profile: &self.verification_os,
            primary_gateway: rack.gateway_ip.map(|g| g.to_string()),
            interfaces: Vec::new(),
        };
        self.request_unit(reqwest::Method::POST, "/hosts", Some(&body))
            .await?;

        if let Some(ip) = server.pxe_ip {
            self.dns.upsert(&fqdn, ip).await?;
        }
        Ok(())
    }

    async fn server_s1_s2(
        &self,
        server: &Server,
        rack: &Rack,
        interfaces: &[ServerInterface],
    ) -> FleetResult<()> {
        let os_profile = server
            .os_args
            .clone()
            .ok_or_else(|| FleetError::InvalidData("provisioning without os_name".to_string()))?;

        if rack.network_map_id.is_none() {
            return Err(FleetError::InvalidData(format!(
                "rack {} has no network map",
                rack.name
            )));
        }

        let host_interfaces = interfaces
            .iter()
            .map(|iface| HostInterface {
                name: iface.name.clone(),
                mac: iface.mac.to_string(),
                network_name: iface.name.clone(),
                bond_members: Vec::new(),
                tagged: false,
            })
            .collect();

        let fqdn = self.fqdn_for(server);
        let body = HostCreateRequest {
            fqdn: &fqdn,
            os_profile: &os_profile,
            primary_gateway: rack.gateway_ip.map(|g| g.to_string()),
            interfaces: host_interfaces,
        };
        self.request_unit(reqwest::Method::POST, "/hosts", Some(&body))
            .await?;

        {
            let _guard = self.host_recreated.lock().await;
            self.request_unit(
                reqwest::Method::POST,
                &format!("/hosts/{}/host_recreated", server.name),
                None::<&()>,
            )
            .await?;
        }

        if let Some(primary) = interfaces.iter().find_map(|iface| iface.ip) {
            self.dns.upsert(&fqdn, primary).await?;
        }
        Ok(())
    }

    async fn is_provisioned(&self, server: &Server, iface_ip: IpAddr) -> FleetResult<(bool, String)> {
        let status: BuildStatusResponse = self
            .request(
                reqwest::Method::GET,
                &format!("/hosts/{}/build_status", server.name),
                None::<&()>,
            )
            .await?;

        if !status.build_complete {
            return Ok((false, status.message));
        }

        match tokio::net::TcpStream::connect((iface_ip, 22)).await {
            Ok(_) => Ok((true, "build complete, ssh reachable".to_string())),
            Err(e) => Ok((false, format!("build complete, ssh not yet reachable: {e}"))),
        }
    }

    async fn os_list(&self, name: Option<&str>) -> FleetResult<Vec<String>> {
        let path = match name {
            Some(name) => format!("/os_profiles?name={name}"),
            None => "/os_profiles".to_string(),
        };
        let list: OsProfileList = self.request(reqwest::Method::GET, &path, None::<&()>).await?;
        Ok(list.profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(base_url: String) -> RestBackend {
        RestBackend::new(base_url, "token", "verification", "/bin/true", "example.com")
    }

    #[test]
    fn url_joins_base_and_path_without_double_slash() {
        let b = backend("http://127.0.0.1:0".to_string());
        assert_eq!(b.url("/hosts"), "http://127.0.0.1:0/hosts");
    }

    #[tokio::test]
    async fn os_list_parses_profile_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/os_profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "profiles": ["rhel9", "ubuntu22.04"],
            })))
            .mount(&server)
            .await;

        let b = backend(server.uri());
        let profiles = b.os_list(None).await.unwrap();
        assert_eq!(profiles, vec!["rhel9", "ubuntu22.04"]);
    }

    #[tokio::test]
    async fn not_found_surfaces_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/os_profiles"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let b = backend(server.uri());
        let err = b.os_list(None).await.unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_error_retries_then_surfaces_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/os_profiles"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(REST_RETRY_ATTEMPTS as u64)
            .mount(&server)
            .await;

        let b = backend(server.uri());
        let err = b.os_list(None).await.unwrap_err();
        assert!(matches!(err, FleetError::Transport(_)));
    }
}

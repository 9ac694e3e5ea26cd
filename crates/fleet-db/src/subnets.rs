use fleet_model::FleetResult;
use fleet_model::ids::SubnetId;
use fleet_model::network::Subnet;
use sqlx::PgPool;
use std::net::IpAddr;

pub async fn get_subnet(pool: &PgPool, id: SubnetId) -> FleetResult<Subnet> {
    sqlx::query_as::<_, Subnet>("SELECT * FROM subnets WHERE id = $1")
        .bind(id.0)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("subnet {id}")))
}

/// Resolves the subnet containing `ip`, used by C3 step 6 to classify a
/// newly discovered IPMI address.
pub async fn find_subnet_containing(
    pool: &PgPool,
    location: &str,
    ip: IpAddr,
) -> FleetResult<Option<Subnet>> {
    let candidates =
        sqlx::query_as::<_, Subnet>("SELECT * FROM subnets WHERE location = $1")
            .bind(location)
            .fetch_all(pool)
            .await?;
    Ok(candidates.into_iter().find(|s| s.contains(ip)))
}

pub async fn list_subnets_for_location(pool: &PgPool, location: &str) -> FleetResult<Vec<Subnet>> {
    sqlx::query_as::<_, Subnet>("SELECT * FROM subnets WHERE location = $1 ORDER BY vlan")
        .bind(location)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

#[derive(Debug, Clone)]
pub struct NewSubnet {
    pub location: String,
    pub network: ipnetwork::IpNetwork,
    pub vlan: i32,
    pub gateway: Option<IpAddr>,
    pub tagged: bool,
    pub first_usable_ip: Option<IpAddr>,
}

pub async fn create_subnet(pool: &PgPool, new: NewSubnet) -> FleetResult<Subnet> {
    sqlx::query_as::<_, Subnet>(
        r#"
        INSERT INTO subnets
            (id, location, network, vlan, gateway, tagged, first_usable_ip, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
        RETURNING *
        "#,
    )
    .bind(SubnetId::new().0)
    .bind(&new.location)
    .bind(new.network)
    .bind(new.vlan)
    .bind(new.gateway)
    .bind(new.tagged)
    .bind(new.first_usable_ip)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

use fleet_model::FleetResult;
use fleet_model::sku::Sku;
use sqlx::PgPool;

pub async fn get_sku(pool: &PgPool, name: &str) -> FleetResult<Sku> {
    sqlx::query_as::<_, Sku>("SELECT * FROM skus WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| fleet_model::FleetError::not_found(format!("sku {name}")))
}

pub async fn list_skus(pool: &PgPool) -> FleetResult<Vec<Sku>> {
    sqlx::query_as::<_, Sku>("SELECT * FROM skus ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use fleet_model::ids::WorkerId;
use fleet_model::status::{RackStatus, ServerStatus};
use rand::Rng;
use sqlx::PgPool;
use tokio::sync::oneshot;

use crate::dispatch::LocalDispatch;
use crate::registry::TaskRegistry;

/// §4.5 tick cadence and jitter, grounded on the teacher's
/// `state_controller::controller.rs::run`: a full jitter budget on a
/// clean pass, a narrower one after an errored pass, so a worker that just
/// failed retries sooner than one that's healthy.
pub struct WorkerLoopConfig {
    pub iteration_time: Duration,
}

impl Default for WorkerLoopConfig {
    fn default() -> Self {
        Self {
            iteration_time: Duration::from_secs(30),
        }
    }
}

/// The worker's 30s tick, §4.5: enumerates racks this worker owns, finds
/// servers in `Validating`/`Provisioning` with no in-process task, and
/// hands each to [`LocalDispatch`]. The actual stage-check work happens in
/// the tasks it spawns; this loop only schedules.
pub struct WorkerLoop {
    pool: PgPool,
    registry: std::sync::Arc<TaskRegistry>,
    dispatch: LocalDispatch,
    worker_id: WorkerId,
    config: WorkerLoopConfig,
    stop_receiver: oneshot::Receiver<()>,
}

impl WorkerLoop {
    pub fn new(
        pool: PgPool,
        registry: std::sync::Arc<TaskRegistry>,
        dispatch: LocalDispatch,
        worker_id: WorkerId,
        config: WorkerLoopConfig,
    ) -> (Self, oneshot::Sender<()>) {
        let (stop_sender, stop_receiver) = oneshot::channel();
        (
            Self {
                pool,
                registry,
                dispatch,
                worker_id,
                config,
                stop_receiver,
            },
            stop_sender,
        )
    }

    pub async fn run(mut self) {
        let max_jitter = (self.config.iteration_time.as_millis() / 3).max(1) as u64;
        let err_jitter = (self.config.iteration_time.as_millis() / 5).max(1) as u64;

        loop {
            let start = Instant::now();
            let errored = self.run_single_iteration().await;

            let jitter_budget = if errored { err_jitter } else { max_jitter };
            let jitter = rand::rng().random::<u64>() % jitter_budget;
            let sleep_time = self
                .config
                .iteration_time
                .saturating_sub(start.elapsed())
                .saturating_add(Duration::from_millis(jitter));

            tokio::select! {
                _ = tokio::time::sleep(sleep_time) => {}
                _ = &mut self.stop_receiver => {
                    tracing::info!("worker loop stop requested");
                    return;
                }
            }
        }
    }

    /// §4.7 `switch_validate_for_rack`, driven from production here rather
    /// than only from its own unit tests: a rack not yet `Validated` gets
    /// re-probed every tick (the function itself short-circuits once it
    /// is), and the outcome is persisted back to the rack row so onboarding
    /// actually completes without an operator manually flipping the status.
    async fn validate_rack(&self, rack: &fleet_model::rack::Rack) -> fleet_model::FleetResult<()> {
        let Some(network_map_id) = rack.network_map_id else {
            return Ok(());
        };
        let network_map = fleet_db::racks::get_network_map(&self.pool, network_map_id).await?;
        let switches = fleet_db::switches::list_switches_for_rack(&self.pool, rack.id).await?;
        if switches.is_empty() {
            return Ok(());
        }

        let expected_vlans: Vec<u16> = network_map
            .topology
            .interfaces
            .iter()
            .filter_map(|iface| iface.vlan)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (status, message) = fleet_switch::switch_validate_for_rack(
            self.dispatch.switch_driver().as_ref(),
            rack,
            &switches,
            &expected_vlans,
        )
        .await?;

        fleet_db::racks::update_rack_validation(&self.pool, rack.id, status, &message).await?;
        Ok(())
    }

    /// Returns `true` if the iteration hit an error enumerating work (not
    /// if an individual spawned check later fails — those are reported
    /// independently through `fleet_statemachine::error`).
    async fn run_single_iteration(&mut self) -> bool {
        let span = tracing::span!(
            tracing::Level::INFO,
            "worker_loop_iteration",
            worker_id = %self.worker_id,
            otel.status_code = tracing::field::Empty,
            num_racks = tracing::field::Empty,
            num_validating = tracing::field::Empty,
            num_provisioning = tracing::field::Empty,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let racks = match fleet_db::racks::racks_owned_by_worker(&self.pool, self.worker_id).await {
            Ok(racks) => racks,
            Err(e) => {
                tracing::error!(error = %e, "failed to enumerate owned racks");
                span.record("otel.status_code", "error");
                return true;
            }
        };
        span.record("num_racks", racks.len());

        for rack in &racks {
            if rack.status == RackStatus::Validated {
                continue;
            }
            if let Err(e) = self.validate_rack(rack).await {
                tracing::warn!(rack = %rack.name, error = %e, "rack switch validation failed");
            }
        }

        let mut num_validating = 0usize;
        let mut num_provisioning = 0usize;
        let mut errored = false;

        for status in [ServerStatus::Validating, ServerStatus::Provisioning] {
            let servers = match fleet_db::servers::list_servers_for_worker_in_status(
                &self.pool,
                self.worker_id,
                status,
            )
            .await
            {
                Ok(servers) => servers,
                Err(e) => {
                    tracing::error!(error = %e, status = %status, "failed to list servers for worker");
                    errored = true;
                    continue;
                }
            };

            for server in servers {
                if server.meta.ironicated || self.registry.is_running(server.id) {
                    continue;
                }
                match status {
                    ServerStatus::Validating => {
                        num_validating += 1;
                        self.dispatch.spawn_validate(server.id);
                    }
                    ServerStatus::Provisioning => {
                        num_provisioning += 1;
                        self.dispatch.spawn_provision(server.id);
                    }
                    _ => unreachable!(),
                }
            }
        }

        span.record("num_validating", num_validating);
        span.record("num_provisioning", num_provisioning);
        span.record("otel.status_code", if errored { "error" } else { "ok" });
        crate::metrics::record_iteration(num_validating, num_provisioning, errored, start.elapsed());
        errored
    }
}

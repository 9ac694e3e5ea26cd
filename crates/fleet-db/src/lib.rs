pub mod assets;
pub mod change_log;
pub mod filters;
pub mod migrations;
pub mod ports;
pub mod racks;
pub mod servers;
pub mod skus;
pub mod subnets;
pub mod switches;

pub use ports::{Allocator, DhcpReloadNotifier, ShellDhcpReloadNotifier};
pub use servers::{RackTriggerFilter, ServerWithContext};
pub use switches::SwitchWithContext;

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::network::Subnet;

    struct NullNotifier;

    #[async_trait::async_trait]
    impl DhcpReloadNotifier for NullNotifier {
        async fn reload(&self, _rack: &str) -> fleet_model::FleetResult<()> {
            Ok(())
        }

        async fn ensure_subnets(
            &self,
            _rack: &str,
            _subnets: &[Subnet],
        ) -> fleet_model::FleetResult<()> {
            Ok(())
        }
    }

    #[test]
    fn deleted_filter_predicate_matches_column_semantics() {
        use filters::DeletedFilter;
        assert_eq!(
            DeletedFilter::ExcludeDeleted.predicate("s"),
            Some("s.deleted = 0".to_string())
        );
        assert_eq!(DeletedFilter::IncludeDeleted.predicate("s"), None);
        assert_eq!(
            DeletedFilter::OnlyDeleted.predicate("s"),
            Some("s.deleted != 0".to_string())
        );
    }

    // Constructing an Allocator<NullNotifier> exercises that the generic
    // bound is satisfiable without a live pool; real allocation behavior is
    // covered by integration tests run against a Postgres instance.
    #[test]
    fn allocator_is_generic_over_notifier() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Allocator<NullNotifier>>();
    }
}

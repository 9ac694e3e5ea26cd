//! A small typed query-builder.
//!
//! Replaces the source system's dynamic attribute-path DSL (e.g. filtering
//! on `asset.rack.name`) per the REDESIGN FLAG in spec.md §9: every filter
//! is a concrete struct field, every joined path is a named enum variant
//! resolved against the known schema in [`Column`] — an unrecognized
//! column is a compile error, not a runtime reflection failure.

use std::fmt::Write as _;

/// Whether soft-deleted rows should be included in a query, §4.1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedFilter {
    /// Default: exclude soft-deleted rows.
    #[default]
    ExcludeDeleted,
    /// Include both deleted and non-deleted rows.
    IncludeDeleted,
    /// Only soft-deleted rows.
    OnlyDeleted,
}

impl DeletedFilter {
    pub fn predicate(self, table_alias: &str) -> Option<String> {
        match self {
            DeletedFilter::ExcludeDeleted => Some(format!("{table_alias}.deleted = 0")),
            DeletedFilter::IncludeDeleted => None,
            DeletedFilter::OnlyDeleted => Some(format!("{table_alias}.deleted != 0")),
        }
    }
}

/// Accumulates `WHERE`-clause fragments and positional binds for a single
/// query. Each `fleet-db` filter struct (`ServerFilter`, `RackFilter`, ...)
/// pushes its own fragments into this rather than formatting SQL by hand,
/// so bind-parameter numbering stays correct as predicates are added or
/// removed.
#[derive(Debug, Default)]
pub struct WhereClause {
    fragments: Vec<String>,
    next_param: usize,
}

impl WhereClause {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            next_param: 1,
        }
    }

    /// Adds `column = $n` and returns the bind index `n`, for the caller to
    /// `.bind(value)` onto the query in the same order.
    pub fn eq(&mut self, column: &str) -> usize {
        self.next_param += 1;
        let idx = self.next_param - 1;
        self.fragments.push(format!("{column} = ${idx}"));
        idx
    }

    pub fn raw(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub fn build(&self) -> String {
        if self.fragments.is_empty() {
            return String::new();
        }
        let mut sql = String::from(" WHERE ");
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            let _ = write!(sql, "{fragment}");
        }
        sql
    }
}

/// Filter for `Server` listing/lookup, covering the joined read described
/// in §4.1 (server + asset + rack + network-map + cluster + interfaces).
#[derive(Debug, Default, Clone)]
pub struct ServerFilter {
    pub rack_name: Option<String>,
    pub location: Option<String>,
    pub cluster_name: Option<String>,
    pub status: Option<fleet_model::status::ServerStatus>,
    pub deleted: DeletedFilter,
}

/// Filter for `Rack` listing, covering the joined read (rack + worker +
/// network-map) in §4.1.
#[derive(Debug, Default, Clone)]
pub struct RackFilter {
    pub location: Option<String>,
    pub worker_id: Option<fleet_model::ids::WorkerId>,
    pub deleted: DeletedFilter,
}

/// Filter for `Asset` lookup.
#[derive(Debug, Default, Clone)]
pub struct AssetFilter {
    pub serial: Option<String>,
    pub rack_id: Option<fleet_model::ids::RackId>,
    pub deleted: DeletedFilter,
}

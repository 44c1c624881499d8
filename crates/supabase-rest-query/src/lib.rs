//! PostgREST query builder for `supabase-rest`.
//!
//! ```ignore
//! use supabase_rest_query::{Filterable, Modifiable, OrderOptions, SupabaseRestQueryExt};
//!
//! let rows = client
//!     .from("exercises")
//!     .select("*")
//!     .eq("user_id", user_id)
//!     .order("date", OrderOptions::ascending(false))
//!     .limit(10)
//!     .await;
//! ```

pub mod builder;
pub mod execute;
pub mod filter;
pub mod modifier;
pub mod postgrest;
pub mod table;

pub use builder::QueryBuilder;
pub use execute::normalize_error;
pub use filter::{encode_component, FilterCondition, FilterOperator, Filterable, IntoFilterValue};
pub use modifier::{Modifiable, OrderDirection, OrderOptions};
pub use postgrest::{InsertOptions, Operation, PreparedRequest, QueryState, UpdateOptions, WriteKind};
pub use table::{CountQuery, TableQuery};

use supabase_rest_core::SupabaseRestClient;

/// Extension trait adding `from(table)` to [`SupabaseRestClient`].
pub trait SupabaseRestQueryExt {
    /// Start a query on a table.
    fn from(&self, table: &str) -> TableQuery;
}

impl SupabaseRestQueryExt for SupabaseRestClient {
    fn from(&self, table: &str) -> TableQuery {
        TableQuery::new(self.clone(), table)
    }
}

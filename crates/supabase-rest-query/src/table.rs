use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use supabase_rest_core::platform::RequestOptions;
use supabase_rest_core::{ErrorInfo, RestResponse, SupabaseRestClient};

use crate::builder::QueryBuilder;
use crate::execute::{parse_count, send_prepared};
use crate::filter::Filterable;
use crate::postgrest::{build_write, InsertOptions, Operation, QueryState, UpdateOptions, WriteKind};

/// Entry point created by `client.from("table")`.
///
/// `select`, `update`, `delete` and `count` return builders; the POST
/// writes (`insert`, `upsert`, `manual_upsert`) execute immediately.
#[derive(Debug, Clone)]
pub struct TableQuery {
    client: SupabaseRestClient,
    table: String,
    options: RequestOptions,
}

impl TableQuery {
    pub fn new(client: SupabaseRestClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Timeout for every request started from this table handle.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// Start a read. `"*"` selects every column; an empty string sends no
    /// projection at all.
    pub fn select(self, columns: &str) -> QueryBuilder {
        let mut state = QueryState::new(self.table, Operation::Select);
        if !columns.trim().is_empty() {
            state.select_columns = Some(columns.to_string());
        }
        QueryBuilder::new(self.client, state, self.options)
    }

    /// Start a PATCH of the matching rows with `data`.
    pub fn update(self, data: impl Serialize, options: UpdateOptions) -> QueryBuilder {
        let mut state = QueryState::new(self.table, Operation::Update);
        match serde_json::to_value(data) {
            Ok(value) => state.update_data = Some(value),
            Err(e) => state.reject(format!("Failed to serialize update payload: {e}")),
        }
        state.return_columns = options.select;
        QueryBuilder::new(self.client, state, self.options)
    }

    /// Start a DELETE of the matching rows.
    pub fn delete(self) -> QueryBuilder {
        let state = QueryState::new(self.table, Operation::Delete);
        QueryBuilder::new(self.client, state, self.options)
    }

    /// Count the matching rows.
    pub fn count(self) -> CountQuery {
        CountQuery {
            client: self.client,
            state: QueryState::new(self.table, Operation::Count),
            options: self.options,
        }
    }

    /// Insert one row or an array of rows.
    ///
    /// With `single` the first returned row is yielded (or `null` when
    /// the server returned none) and duplicates are merged.
    pub async fn insert(self, rows: impl Serialize, options: InsertOptions) -> RestResponse<JsonValue> {
        self.write(WriteKind::Insert, rows, options).await
    }

    /// Insert, merging on the primary key.
    pub async fn upsert(self, rows: impl Serialize, options: InsertOptions) -> RestResponse<JsonValue> {
        self.write(WriteKind::Upsert, rows, options).await
    }

    /// Insert, merging on `conflict_columns`.
    pub async fn manual_upsert(
        self,
        rows: impl Serialize,
        conflict_columns: &[&str],
        options: InsertOptions,
    ) -> RestResponse<JsonValue> {
        let columns = conflict_columns.iter().map(|c| c.to_string()).collect();
        self.write(WriteKind::ManualUpsert(columns), rows, options).await
    }

    async fn write(self, kind: WriteKind, rows: impl Serialize, options: InsertOptions) -> RestResponse<JsonValue> {
        let rows = match serde_json::to_value(rows) {
            Ok(rows) => rows,
            Err(e) => return RestResponse::error(ErrorInfo::new(format!("Failed to serialize rows: {e}"))),
        };
        let prepared = match build_write(self.client.supabase_url(), &self.table, &kind, rows, &options) {
            Ok(prepared) => prepared,
            Err(err) => return RestResponse::error(err),
        };

        let result = send_prepared(&self.client, prepared, self.options)
            .await
            .map(|raw| {
                if options.single {
                    first_row(raw.body)
                } else {
                    raw.body
                }
            });
        RestResponse::from(result)
    }
}

fn first_row(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Array(rows) => rows.into_iter().next().unwrap_or(JsonValue::Null),
        other => other,
    }
}

/// `select=count` with an exact count, yielding the total row count.
#[derive(Debug, Clone)]
#[must_use = "count queries do nothing unless executed or awaited"]
pub struct CountQuery {
    client: SupabaseRestClient,
    state: QueryState,
    options: RequestOptions,
}

impl Filterable for CountQuery {
    fn state_mut(&mut self) -> &mut QueryState {
        &mut self.state
    }
}

impl CountQuery {
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub async fn execute(self) -> RestResponse<i64> {
        let prepared = match self.state.build(self.client.supabase_url()) {
            Ok(prepared) => prepared,
            Err(err) => return RestResponse::error(err),
        };
        let result = send_prepared(&self.client, prepared, self.options)
            .await
            .map(|raw| parse_count(&raw.headers, &raw.body));
        RestResponse::from(result)
    }
}

impl IntoFuture for CountQuery {
    type Output = RestResponse<i64>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use supabase_rest_core::platform::RequestOptions;
use supabase_rest_core::{ErrorInfo, RestResponse, SupabaseRestClient, UNSCOPED_MUTATION_CODE};

use crate::execute::send_prepared;
use crate::filter::Filterable;
use crate::modifier::Modifiable;
use crate::postgrest::{PreparedRequest, QueryState};

/// A chainable read, update or delete against one table.
///
/// Nothing is sent until [`execute`](Self::execute) is called or the
/// builder is awaited. Filters and modifiers may be chained in any order;
/// the rendered query string always has the same layout.
#[derive(Debug, Clone)]
#[must_use = "query builders do nothing unless executed or awaited"]
pub struct QueryBuilder {
    client: SupabaseRestClient,
    state: QueryState,
    options: RequestOptions,
}

impl Filterable for QueryBuilder {
    fn state_mut(&mut self) -> &mut QueryState {
        &mut self.state
    }
}

impl Modifiable for QueryBuilder {
    fn parts_mut(&mut self) -> &mut QueryState {
        &mut self.state
    }
}

impl QueryBuilder {
    pub(crate) fn new(client: SupabaseRestClient, state: QueryState, options: RequestOptions) -> Self {
        Self {
            client,
            state,
            options,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Abort the request after `timeout` with a `NETWORK_ERROR` envelope.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Abort the request when `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// Allow an update or delete without any filter.
    pub fn all(mut self) -> Self {
        self.state.allow_unscoped = true;
        self
    }

    /// Render the request without sending it.
    pub fn build(&self) -> Result<PreparedRequest, ErrorInfo> {
        let prepared = self.state.build(self.client.supabase_url())?;

        if self.state.operation.is_mutation() && !self.state.is_scoped() && !self.state.allow_unscoped {
            if self.client.config().require_mutation_filters {
                return Err(ErrorInfo::new(format!(
                    "Refusing unfiltered {} on {}; add a filter or call .all()",
                    prepared.method, self.state.table
                ))
                .with_code(UNSCOPED_MUTATION_CODE));
            }
            tracing::warn!(
                table = %self.state.table,
                method = %prepared.method,
                "Mutation without filters affects every row"
            );
        }

        Ok(prepared)
    }

    /// Send the request and return the JSON payload.
    ///
    /// Reads yield an array, or an object after `.single()`. Update and
    /// delete yield the affected rows.
    pub async fn execute(self) -> RestResponse<JsonValue> {
        let prepared = match self.build() {
            Ok(prepared) => prepared,
            Err(err) => return RestResponse::error(err),
        };
        RestResponse::from(
            send_prepared(&self.client, prepared, self.options)
                .await
                .map(|raw| raw.body),
        )
    }

    /// Like [`execute`](Self::execute), deserializing the payload into `T`.
    pub async fn execute_as<T: DeserializeOwned>(self) -> RestResponse<T> {
        self.execute().await.and_then(|value| {
            RestResponse::from(
                serde_json::from_value::<T>(value)
                    .map_err(|e| ErrorInfo::new(format!("Failed to deserialize response: {e}"))),
            )
        })
    }
}

impl IntoFuture for QueryBuilder {
    type Output = RestResponse<JsonValue>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::Value as JsonValue;

use supabase_rest_core::{ErrorInfo, RestError};

use crate::filter::{encode_component, validate_column_name, FilterCondition};
use crate::modifier::OrderDirection;

/// `Accept` value asking PostgREST for a lone object instead of an array.
pub const SINGLE_OBJECT_ACCEPT: &str = "application/vnd.pgrst.object+json";

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates";

/// What a [`QueryState`] does to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Update,
    Delete,
    /// `select=count` with an exact row count.
    Count,
}

impl Operation {
    pub fn method(&self) -> Method {
        match self {
            Self::Select | Self::Count => Method::GET,
            Self::Update => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub direction: OrderDirection,
}

/// Everything a builder chain has accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub table: String,
    pub operation: Operation,
    /// Projection, only rendered for reads.
    pub select_columns: Option<String>,
    pub conditions: Vec<FilterCondition>,
    pub order: Option<OrderClause>,
    pub limit: Option<u64>,
    /// PATCH body.
    pub update_data: Option<JsonValue>,
    /// `columns=` for the update's `Prefer` header.
    pub return_columns: Option<String>,
    pub want_single: bool,
    /// Set by `.all()`: an unfiltered update/delete is intended.
    pub allow_unscoped: bool,
    invalid: Option<String>,
}

impl QueryState {
    pub fn new(table: impl Into<String>, operation: Operation) -> Self {
        Self {
            table: table.into(),
            operation,
            select_columns: None,
            conditions: Vec::new(),
            order: None,
            limit: None,
            update_data: None,
            return_columns: None,
            want_single: false,
            allow_unscoped: false,
            invalid: None,
        }
    }

    /// Mark the chain as unbuildable; the first reason wins.
    pub(crate) fn reject(&mut self, reason: String) {
        self.invalid.get_or_insert(reason);
    }

    pub fn is_scoped(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Query parameters in their fixed order: projection, filters (in call
    /// order), ordering, limit. A zero limit is not rendered.
    pub fn query_params(&self) -> Vec<String> {
        let mut params = Vec::new();

        match self.operation {
            Operation::Select => {
                if let Some(cols) = &self.select_columns {
                    params.push(format!("select={}", encode_component(cols)));
                }
            }
            Operation::Count => params.push("select=count".to_string()),
            Operation::Update | Operation::Delete => {}
        }

        params.extend(self.conditions.iter().map(FilterCondition::render));

        if let Some(order) = &self.order {
            params.push(format!("order={}.{}", order.column, order.direction.as_str()));
        }

        if let Some(limit) = self.limit.filter(|&n| n > 0) {
            params.push(format!("limit={limit}"));
        }

        params
    }

    /// Render the request without touching the network.
    pub fn build(&self, base_url: &str) -> Result<PreparedRequest, ErrorInfo> {
        if let Some(reason) = &self.invalid {
            return Err(ErrorInfo::new(reason.clone()));
        }
        validate_table_name(&self.table)?;

        let mut url = table_url(base_url, &self.table);
        let params = self.query_params();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        let mut headers = HeaderMap::new();
        let mut body = None;
        match self.operation {
            Operation::Select => {
                if self.want_single {
                    headers.insert(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT_ACCEPT));
                }
            }
            Operation::Count => {
                headers.insert("Prefer", HeaderValue::from_static("count=exact"));
            }
            Operation::Update => {
                let prefer = prefer_header(&[RETURN_REPRESENTATION], self.return_columns.as_deref());
                headers.insert("Prefer", header_value(&prefer)?);
                body = Some(self.update_data.clone().unwrap_or(JsonValue::Null));
            }
            Operation::Delete => {
                headers.insert("Prefer", HeaderValue::from_static(RETURN_REPRESENTATION));
            }
        }

        Ok(PreparedRequest {
            method: self.operation.method(),
            url,
            headers,
            body,
            expect_single: self.want_single,
        })
    }
}

/// A fully rendered request: the only thing execution needs besides the
/// auth headers resolved at send time.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<JsonValue>,
    /// A 406 means "no rows" rather than a server fault.
    pub expect_single: bool,
}

/// Flavour of a POST write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    /// Merge on the table's primary key.
    Upsert,
    /// Merge on the given columns, in order.
    ManualUpsert(Vec<String>),
}

/// Options for insert and upsert writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Columns to return (`columns=` in `Prefer`).
    pub select: Option<String>,
    /// Return only the first row. For plain inserts also merges duplicates.
    pub single: bool,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }
}

/// Options for `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub select: Option<String>,
}

impl UpdateOptions {
    pub fn select(columns: impl Into<String>) -> Self {
        Self {
            select: Some(columns.into()),
        }
    }
}

/// Render an insert/upsert POST.
pub fn build_write(
    base_url: &str,
    table: &str,
    kind: &WriteKind,
    rows: JsonValue,
    options: &InsertOptions,
) -> Result<PreparedRequest, ErrorInfo> {
    validate_table_name(table)?;
    let mut url = table_url(base_url, table);

    let mut prefer = vec![RETURN_REPRESENTATION.to_string()];
    match kind {
        WriteKind::Insert => {
            if options.single {
                prefer.push(MERGE_DUPLICATES.to_string());
            }
        }
        WriteKind::Upsert => prefer.push(MERGE_DUPLICATES.to_string()),
        WriteKind::ManualUpsert(columns) => {
            if columns.is_empty() {
                return Err(ErrorInfo::new("manual_upsert needs at least one conflict column"));
            }
            for column in columns {
                validate_column_name(column).map_err(|e| ErrorInfo::new(e))?;
            }
            let target = columns.join(",");
            prefer.push(MERGE_DUPLICATES.to_string());
            prefer.push(format!("on_conflict={target}"));
            url.push_str("?on_conflict=");
            url.push_str(&encode_component(&target));
        }
    }

    let parts: Vec<&str> = prefer.iter().map(String::as_str).collect();
    let mut headers = HeaderMap::new();
    headers.insert(
        "Prefer",
        header_value(&prefer_header(&parts, options.select.as_deref()))?,
    );

    Ok(PreparedRequest {
        method: Method::POST,
        url,
        headers,
        body: Some(rows),
        expect_single: false,
    })
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

fn prefer_header(parts: &[&str], columns: Option<&str>) -> String {
    let mut prefer = parts.join(",");
    if let Some(columns) = columns {
        prefer.push_str(",columns=");
        prefer.push_str(columns);
    }
    prefer
}

fn header_value(value: &str) -> Result<HeaderValue, ErrorInfo> {
    HeaderValue::from_str(value).map_err(|e| RestError::from(e).into())
}

fn validate_table_name(table: &str) -> Result<(), ErrorInfo> {
    if table.trim().is_empty() {
        return Err(ErrorInfo::new("Table name cannot be empty"));
    }
    if table.contains(&['/', '?', '#', '&'][..]) {
        return Err(ErrorInfo::new(format!(
            "Invalid table name: {table:?} (contains prohibited characters)"
        )));
    }
    Ok(())
}

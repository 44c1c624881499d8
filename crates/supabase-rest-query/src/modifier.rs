use crate::filter::validate_column_name;
use crate::postgrest::{OrderClause, QueryState};

/// Sort direction of an `order=` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Options for [`Modifiable::order`].
///
/// Ascending unless `ascending` is explicitly `Some(false)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderOptions {
    pub ascending: Option<bool>,
}

impl OrderOptions {
    pub fn ascending(ascending: bool) -> Self {
        Self {
            ascending: Some(ascending),
        }
    }

    pub fn direction(&self) -> OrderDirection {
        match self.ascending {
            Some(false) => OrderDirection::Descending,
            _ => OrderDirection::Ascending,
        }
    }
}

impl From<OrderDirection> for OrderOptions {
    fn from(direction: OrderDirection) -> Self {
        Self::ascending(direction == OrderDirection::Ascending)
    }
}

/// Shape modifiers: ordering, row limit and single-object reads.
pub trait Modifiable: Sized {
    /// Get a mutable reference to the accumulated query state.
    fn parts_mut(&mut self) -> &mut QueryState;

    /// Order by a column. A later call replaces an earlier one.
    fn order(mut self, column: &str, options: impl Into<OrderOptions>) -> Self {
        if let Err(e) = validate_column_name(column) {
            tracing::error!("Invalid column name in order: {e}");
            self.parts_mut().reject(e);
            return self;
        }
        self.parts_mut().order = Some(OrderClause {
            column: column.to_string(),
            direction: options.into().direction(),
        });
        self
    }

    /// Limit the number of rows returned. `0` means no limit and sends
    /// no `limit=` parameter.
    fn limit(mut self, count: u64) -> Self {
        self.parts_mut().limit = Some(count);
        self
    }

    /// Expect one object rather than an array.
    fn single(mut self) -> Self {
        self.parts_mut().want_single = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_unless_explicitly_false() {
        assert_eq!(OrderOptions::default().direction(), OrderDirection::Ascending);
        assert_eq!(OrderOptions::ascending(true).direction(), OrderDirection::Ascending);
        assert_eq!(OrderOptions::ascending(false).direction(), OrderDirection::Descending);
        assert_eq!(
            OrderOptions::from(OrderDirection::Descending).direction(),
            OrderDirection::Descending
        );
    }
}

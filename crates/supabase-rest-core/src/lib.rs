pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod response;
pub mod store;
pub mod value;

pub use client::SupabaseRestClient;
pub use config::ClientConfig;
pub use error::{
    ErrorInfo, ErrorKind, RestError, CANCELLED_CODE, NETWORK_ERROR_CODE, NO_ROWS_CODE,
    UNSCOPED_MUTATION_CODE,
};
pub use platform::RequestOptions;
pub use response::RestResponse;
pub use store::{
    FileSessionStore, MemorySessionStore, SessionStore, SharedStorage, StorageBus, StorageEvent,
    Subscription, TokenBundle,
};
pub use value::Row;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}

mod config;
mod error;
mod list;
mod object;
mod pacer;
mod scope;
mod store;
mod upload;

pub use config::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, StoreConfig, default_ignored_names};
pub use error::StoreError;
pub use list::{Entry, Folder};
pub use object::{ObjectMeta, RemoteObject};
pub use pacer::PacerConfig;
pub use scope::{PathScope, ScopeError};
pub use store::{RemoteStore, RootKind};

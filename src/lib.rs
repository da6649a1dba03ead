pub mod codec;
pub mod db;
pub mod error;
pub mod filter;
pub mod model;
pub mod output;
pub mod paths;
pub mod tags;
pub mod tasks;
pub mod tui;
pub mod validate;

pub use db::{Store, StoreOptions};
pub use error::{RecordKind, Result, StoreError};
pub use filter::StatusFilter;
pub use model::{Tag, Task};

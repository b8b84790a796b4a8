pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{PaginationCursor, PersistedSelection};
pub use ports::SelectionStore;
pub use services::{SelectionFlow, add_persistent_params, build_redirect_url};
pub use value_objects::{FlowDecision, HttpMethod, PersistConfig, PostedForm, PostedValue, RequestSnapshot, SelectionKey};

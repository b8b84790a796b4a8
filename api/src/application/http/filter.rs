pub mod cookie;
pub mod error;
pub mod extract;
pub mod flow;
pub mod form;

pub use cookie::CookieSelectionStore;
pub use error::ApiError;
pub use extract::{FilterQuery, PostedFilter};
pub use flow::{ListFilter, Outcome};
pub use form::{FilterFormBuilder, back_to_list_button};

pub mod errors;
pub mod pagination;
pub mod repository;
pub mod service;
pub mod todo;

pub use errors::*;
pub use pagination::*;
pub use repository::*;
pub use service::*;
pub use todo::*;

mod http_error;
mod query_service;

pub use http_error::QueryHttpError;
pub use query_service::QueryServiceClient;

pub mod auth;
pub mod query;

pub use auth::{Authenticator, StaticCredentials};
pub use query::{dashboard_page, DashboardPage, TimeWindow};

pub mod auth;
pub mod worker_auth;

pub use auth::AuthenticatedUser;

pub mod client;
pub mod credentials;
pub mod error;
pub mod sources;
pub mod store;
pub mod token;

pub use client::{AuthFlow, MixAuthClient};
pub use credentials::ClientCredential;
pub use error::AuthError;
pub use sources::AuthSources;
pub use store::TokenStore;
pub use token::{AuthToken, Clock, IssuedToken, SystemClock};

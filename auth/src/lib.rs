//! # Hotel Booking Identity
//!
//! The identity provider adapter. Deployed environments delegate sign-up and
//! sign-in to an external managed identity service; this crate defines the
//! [`IdentityProvider`] seam and a local development implementation with
//! bcrypt password digests and opaque bearer tokens.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hotel_booking_auth::{auth_router, LocalIdentityProvider};
//!
//! let provider = LocalIdentityProvider::new(users, sessions, clock);
//! let app = Router::new().nest("/api/auth", auth_router(Arc::new(provider)));
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod error;
pub mod handlers;
pub mod identity;
pub mod mocks;
pub mod password;
pub mod providers;
pub mod state;

pub use error::{AuthError, Result};
pub use handlers::{AuthenticatedUser, BearerToken, SharedIdentityProvider, auth_router};
pub use identity::{IdentityProvider, LocalIdentityProvider, Registration, SignedIn};
pub use providers::{SessionStore, UserStore};
pub use state::{NewUser, PublicUser, Session, User};

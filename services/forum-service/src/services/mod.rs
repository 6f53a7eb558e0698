//! Authentication primitives and data repositories.

mod auth;
mod forum;
mod password;
mod session;
mod token;
mod users;

pub use auth::{AuthenticatedUser, Authenticator, IssuedToken};
pub use forum::{ForumRepository, Page, PostFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use password::PasswordService;
pub use session::{SessionStore, DEFAULT_SESSION_TTL_SECONDS};
pub use token::{Claims, TokenService};
pub use users::UserRepository;

//! Credential store: users, password hashes, referrer links and referral codes.

mod memory;
mod pg;
mod repo_types;
mod store;

pub use memory::InMemoryUserStore;
pub use pg::PgUserStore;
pub use repo_types::{NewUser, User};
pub use store::{StoreError, UserStore};

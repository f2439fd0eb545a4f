pub mod app;
pub mod session;
pub mod token_cache;

pub use app::Repo;
pub use session::{MemorySessionStore, SessionError, SessionStore};
pub use token_cache::AccessTokenCache;

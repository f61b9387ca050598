//! Cookies: the [`Cookie`] record, the [`CookieStore`] seam and its backends.

mod cookies;
mod store;

pub use cookies::parse_cookie_header;
pub use cookies::Cookie;
pub use cookies::CookieOptions;
pub use cookies::CookieStoreHandle;
pub use cookies::SameSite;

pub use store::CookieStore;
pub use store::InMemoryCookieStore;
pub use store::JsonCookieStore;

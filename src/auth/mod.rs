pub mod password;
pub mod ratelimit;
pub mod resolver;
pub mod token;

pub use ratelimit::{RateLimiter, RouteGroup};
pub use resolver::{AuthError, Credentials, IdentityResolver, KEY_PREFIX_LEN, extract_credentials};
pub use token::{TokenCodec, TokenError};

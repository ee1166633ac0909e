pub mod prelude;

pub mod api_keys;
pub mod payments;
pub mod users;

pub mod apikey;
pub mod payment;
pub mod user;

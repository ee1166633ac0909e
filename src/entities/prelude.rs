pub use super::api_keys::Entity as ApiKeys;
pub use super::payments::Entity as Payments;
pub use super::users::Entity as Users;

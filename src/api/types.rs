use serde::Serialize;

use crate::db::Account;
use crate::entities::payments;

/// Error body shape shared by every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// The raw key is returned exactly once, here.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub username: String,
    pub email: Option<String>,
    pub disabled: bool,
    pub created_at: String,
}

impl From<Account> for UserInfoResponse {
    fn from(account: Account) -> Self {
        Self {
            username: account.username,
            email: account.email,
            disabled: account.disabled,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
    pub date: String,
    pub document: Option<String>,
    pub beneficiary: String,
    pub amount: f64,
}

impl From<payments::Model> for PaymentDto {
    fn from(model: payments::Model) -> Self {
        Self {
            date: model.date.to_rfc3339(),
            document: model.document,
            beneficiary: model.beneficiary,
            amount: model.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

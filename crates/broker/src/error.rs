use std::time::Duration;

use thiserror::Error;

use crate::remote::AccountState;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("MetaApi responded {status}: {body}")]
    Api { status: u16, body: String },
    #[error("account {account_id} is {state:?} and will not connect")]
    AccountUnavailable {
        account_id: String,
        state: AccountState,
    },
    #[error("gave up waiting for {what} after {waited:?}")]
    Timeout { what: &'static str, waited: Duration },
    #[error("trade rejected with {code} ({numeric_code}): {message}")]
    TradeRejected {
        numeric_code: i64,
        code: String,
        message: String,
    },
}

impl BrokerError {
    /// Statuses MetaApi answers with while an account is still synchronising.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Api { status: 404 | 503 | 504, .. })
    }
}

pub mod account_response;
pub mod metaapi_client;
pub mod trade_response;

pub use account_response::{AccountInformation, AccountState, ConnectionStatus, TradingAccount};
pub use metaapi_client::MetaApiClient;
pub use trade_response::{TradeRequest, TradeResult};

/// Trading API host serving accounts deployed in `region`.
pub fn get_client_base_url(region: &str) -> String {
    format!("https://mt-client-api-v1.{region}.agiliumtrade.ai")
}

pub mod error;
pub mod models;
pub mod remote;
pub mod traits;

pub use error::BrokerError;
pub use models::{MarketOrder, RpcConnection};
pub use remote::{
    AccountInformation, AccountState, ConnectionStatus, MetaApiClient, TradeResult, TradingAccount,
};
pub use traits::Brokerage;

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::models::{MarketOrder, RpcConnection};
use crate::remote::{AccountInformation, TradeResult, TradingAccount};

/// Operations the executor needs from a MetaTrader brokerage.
///
/// Every call is a fallible network step with no internal retry; the polling
/// waits give up after their configured timeout.
#[async_trait]
pub trait Brokerage: Send + Sync {
    async fn get_account(&self, account_id: &str) -> Result<TradingAccount, BrokerError>;

    async fn deploy(&self, account: &TradingAccount) -> Result<(), BrokerError>;

    async fn wait_until_connected(&self, account: &TradingAccount) -> Result<(), BrokerError>;

    async fn open_rpc_connection(
        &self,
        account: &TradingAccount,
    ) -> Result<RpcConnection, BrokerError>;

    /// Resolves once the terminal state is in sync with the broker, returning
    /// the account figures at that point.
    async fn wait_until_synchronized(
        &self,
        connection: &RpcConnection,
    ) -> Result<AccountInformation, BrokerError>;

    async fn create_market_buy_order(
        &self,
        connection: &RpcConnection,
        order: &MarketOrder,
    ) -> Result<TradeResult, BrokerError>;

    async fn create_market_sell_order(
        &self,
        connection: &RpcConnection,
        order: &MarketOrder,
    ) -> Result<TradeResult, BrokerError>;
}

use std::time::Duration;

use async_trait::async_trait;
use common::config::MetaApiConfig;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::error::BrokerError;
use crate::models::{MarketOrder, RpcConnection};
use crate::remote::{
    AccountInformation, ConnectionStatus, TradeRequest, TradeResult, TradingAccount,
    get_client_base_url,
};
use crate::traits::Brokerage;

/// MetaApi cloud REST client.
///
/// Account management goes through the provisioning API; trading goes through
/// the regional client API of the account (see [`get_client_base_url`]).
#[derive(Clone)]
pub struct MetaApiClient {
    client: Client,
    api_key: String,
    provisioning_url: String,
    client_url: Option<String>,
    poll_interval: Duration,
    connect_timeout: Duration,
    sync_timeout: Duration,
}

impl MetaApiClient {
    pub fn new(config: &MetaApiConfig) -> Result<Self, BrokerError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            provisioning_url: config.provisioning_url.trim_end_matches('/').to_string(),
            client_url: config
                .client_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            poll_interval: config.poll_interval,
            connect_timeout: config.connect_timeout,
            sync_timeout: config.sync_timeout,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("auth-token", &self.api_key)
    }

    async fn check(resp: Response) -> Result<Response, BrokerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BrokerError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BrokerError> {
        let resp = self.request(Method::GET, url).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn account_information(
        &self,
        connection: &RpcConnection,
    ) -> Result<AccountInformation, BrokerError> {
        let url = format!(
            "{}/users/current/accounts/{}/account-information",
            connection.base_url, connection.account_id
        );
        self.get_json(&url).await
    }

    async fn trade(
        &self,
        connection: &RpcConnection,
        request: TradeRequest<'_>,
    ) -> Result<TradeResult, BrokerError> {
        let url = format!(
            "{}/users/current/accounts/{}/trade",
            connection.base_url, connection.account_id
        );

        info!(
            "Placing Order: {} {} {} SL={} TP={}",
            request.action_type, request.volume, request.symbol, request.stop_loss, request.take_profit
        );

        let resp = self.request(Method::POST, &url).json(&request).send().await?;
        let resp = match Self::check(resp).await {
            Ok(resp) => resp,
            Err(e) => {
                error!("MetaApi Order Failed: {}", e);
                return Err(e);
            }
        };

        let result = resp.json::<TradeResult>().await?;
        if !result.is_success() {
            return Err(BrokerError::TradeRejected {
                numeric_code: result.numeric_code,
                code: result.string_code,
                message: result.message,
            });
        }
        Ok(result)
    }
}

#[async_trait]
impl Brokerage for MetaApiClient {
    async fn get_account(&self, account_id: &str) -> Result<TradingAccount, BrokerError> {
        let url = format!("{}/users/current/accounts/{}", self.provisioning_url, account_id);
        self.get_json(&url).await
    }

    async fn deploy(&self, account: &TradingAccount) -> Result<(), BrokerError> {
        let url = format!(
            "{}/users/current/accounts/{}/deploy",
            self.provisioning_url, account.id
        );
        info!("Deploying account {} ({:?})", account.id, account.state);
        let resp = self.request(Method::POST, &url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn wait_until_connected(&self, account: &TradingAccount) -> Result<(), BrokerError> {
        let started = Instant::now();
        loop {
            let current = self.get_account(&account.id).await?;
            if current.connection_status == ConnectionStatus::Connected {
                return Ok(());
            }
            if current.state.is_terminal() {
                return Err(BrokerError::AccountUnavailable {
                    account_id: current.id,
                    state: current.state,
                });
            }
            if started.elapsed() >= self.connect_timeout {
                return Err(BrokerError::Timeout {
                    what: "broker connection",
                    waited: self.connect_timeout,
                });
            }
            debug!(
                "Account {} is {:?}, waiting for connection",
                account.id, current.connection_status
            );
            time::sleep(self.poll_interval).await;
        }
    }

    async fn open_rpc_connection(
        &self,
        account: &TradingAccount,
    ) -> Result<RpcConnection, BrokerError> {
        let base_url = self
            .client_url
            .clone()
            .unwrap_or_else(|| get_client_base_url(&account.region));

        Ok(RpcConnection {
            account_id: account.id.clone(),
            base_url,
        })
    }

    async fn wait_until_synchronized(
        &self,
        connection: &RpcConnection,
    ) -> Result<AccountInformation, BrokerError> {
        let started = Instant::now();
        loop {
            match self.account_information(connection).await {
                Ok(info) => return Ok(info),
                Err(e) if e.is_not_ready() => {
                    if started.elapsed() >= self.sync_timeout {
                        return Err(BrokerError::Timeout {
                            what: "terminal synchronization",
                            waited: self.sync_timeout,
                        });
                    }
                    debug!("Account {} not synchronized yet: {}", connection.account_id, e);
                    time::sleep(self.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn create_market_buy_order(
        &self,
        connection: &RpcConnection,
        order: &MarketOrder,
    ) -> Result<TradeResult, BrokerError> {
        self.trade(connection, TradeRequest::market_buy(order)).await
    }

    async fn create_market_sell_order(
        &self,
        connection: &RpcConnection,
        order: &MarketOrder,
    ) -> Result<TradeResult, BrokerError> {
        self.trade(connection, TradeRequest::market_sell(order)).await
    }
}

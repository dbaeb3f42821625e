use broker::{BrokerError, Brokerage, MarketOrder, RpcConnection, TradeResult};
use common::models::{Direction, Signal};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::queue::SignalReceiver;
use crate::sizing::{FixedVolume, VolumeSizer};

#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error("could not connect to the trading account: {0}")]
    Connect(#[source] BrokerError),
    #[error("trading account did not synchronize: {0}")]
    Synchronize(#[source] BrokerError),
    #[error("volume sizing returned an unusable volume: {0}")]
    InvalidVolume(f64),
    #[error("order was not placed: {0}")]
    Order(#[source] BrokerError),
}

/// Single consumer of the signal queue.
///
/// Signals are executed one at a time in arrival order. The connection to the
/// trading account is kept between signals and rebuilt after a broker failure.
pub struct ExecutionService<B> {
    broker: B,
    account_id: String,
    sizer: Box<dyn VolumeSizer>,
    session: Option<RpcConnection>,
}

impl<B: Brokerage> ExecutionService<B> {
    pub fn new(broker: B, account_id: impl Into<String>) -> Self {
        Self {
            broker,
            account_id: account_id.into(),
            sizer: Box::new(FixedVolume::default()),
            session: None,
        }
    }

    pub fn with_sizer(mut self, sizer: impl VolumeSizer + 'static) -> Self {
        self.sizer = Box::new(sizer);
        self
    }

    pub async fn start(mut self, mut receiver: SignalReceiver) {
        info!("Starting Execution Service (account {})", self.account_id);

        while let Some(signal) = receiver.next().await {
            info!("RECEIVED SIGNAL: {} - Executing...", signal);

            match self.execute(&signal).await {
                Ok(result) => {
                    info!(
                        symbol = signal.symbol(),
                        direction = %signal.direction(),
                        code = %result.string_code,
                        order_id = ?result.order_id,
                        position_id = ?result.position_id,
                        "TRADE EXECUTED"
                    );
                }
                Err(e) => {
                    error!(
                        symbol = signal.symbol(),
                        direction = %signal.direction(),
                        entry = signal.entry(),
                        take_profit = signal.take_profit(),
                        stop_loss = signal.stop_loss(),
                        error = %e,
                        "EXECUTION FAILED, signal dropped"
                    );
                }
            }
        }

        info!("Signal queue closed. Stopping service.");
    }

    pub async fn execute(&mut self, signal: &Signal) -> Result<TradeResult, ExecutionFailure> {
        let result = self.try_execute(signal).await;
        if let Err(ExecutionFailure::Connect(_) | ExecutionFailure::Synchronize(_) | ExecutionFailure::Order(_)) =
            &result
        {
            // Next signal reconnects from scratch.
            self.session = None;
        }
        result
    }

    async fn try_execute(&mut self, signal: &Signal) -> Result<TradeResult, ExecutionFailure> {
        let connection = self.connect().await.map_err(ExecutionFailure::Connect)?;

        let account = self
            .broker
            .wait_until_synchronized(&connection)
            .await
            .map_err(ExecutionFailure::Synchronize)?;

        let volume = self.sizer.volume(signal, &account);
        if !(volume.is_finite() && volume > 0.0) {
            return Err(ExecutionFailure::InvalidVolume(volume));
        }

        let order = MarketOrder {
            symbol: signal.symbol().to_string(),
            volume,
            stop_loss: signal.stop_loss(),
            take_profit: signal.take_profit(),
        };

        let placed = match signal.direction() {
            Direction::Buy => self.broker.create_market_buy_order(&connection, &order).await,
            Direction::Sell => self.broker.create_market_sell_order(&connection, &order).await,
        };
        placed.map_err(ExecutionFailure::Order)
    }

    async fn connect(&mut self) -> Result<RpcConnection, BrokerError> {
        if let Some(connection) = &self.session {
            return Ok(connection.clone());
        }

        let account = self.broker.get_account(&self.account_id).await?;
        if !account.state.is_deployed() {
            self.broker.deploy(&account).await?;
        }
        self.broker.wait_until_connected(&account).await?;

        let connection = self.broker.open_rpc_connection(&account).await?;
        debug!("Connected to account {} via {}", connection.account_id, connection.base_url);

        self.session = Some(connection.clone());
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::SignalQueue;
    use async_trait::async_trait;
    use broker::{AccountInformation, AccountState, ConnectionStatus, TradingAccount};
    use common::parser::parse_signal;
    use mockall::mock;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    mock! {
        pub Broker {}

        #[async_trait]
        impl Brokerage for Broker {
            async fn get_account(&self, account_id: &str) -> Result<TradingAccount, BrokerError>;
            async fn deploy(&self, account: &TradingAccount) -> Result<(), BrokerError>;
            async fn wait_until_connected(&self, account: &TradingAccount) -> Result<(), BrokerError>;
            async fn open_rpc_connection(&self, account: &TradingAccount) -> Result<RpcConnection, BrokerError>;
            async fn wait_until_synchronized(&self, connection: &RpcConnection) -> Result<AccountInformation, BrokerError>;
            async fn create_market_buy_order(&self, connection: &RpcConnection, order: &MarketOrder) -> Result<TradeResult, BrokerError>;
            async fn create_market_sell_order(&self, connection: &RpcConnection, order: &MarketOrder) -> Result<TradeResult, BrokerError>;
        }
    }

    const EURUSD_SELL: &str = "📉EURUSD\n(ignored line)\nDirection: SELL\nEntry: 1.2345\nTP: 1.2300\nTP: 1.2250\n❌SL: 1.2400";

    fn trading_account(state: AccountState) -> TradingAccount {
        TradingAccount {
            id: "acc-1".to_string(),
            name: "demo".to_string(),
            state,
            connection_status: ConnectionStatus::Connected,
            region: "new-york".to_string(),
        }
    }

    fn rpc_connection() -> RpcConnection {
        RpcConnection {
            account_id: "acc-1".to_string(),
            base_url: "http://broker.test".to_string(),
        }
    }

    fn account_information() -> AccountInformation {
        AccountInformation {
            broker: "Demo".to_string(),
            currency: "USD".to_string(),
            balance: 10_000.0,
            equity: 10_000.0,
            margin: 0.0,
            free_margin: 10_000.0,
            leverage: 100.0,
        }
    }

    fn trade_done() -> TradeResult {
        TradeResult {
            numeric_code: 10009,
            string_code: "TRADE_RETCODE_DONE".to_string(),
            message: "Request completed".to_string(),
            order_id: Some("1".to_string()),
            position_id: Some("1".to_string()),
        }
    }

    fn connected_mock(state: AccountState) -> MockBroker {
        let mut broker = MockBroker::new();
        broker
            .expect_get_account()
            .times(1)
            .returning(move |_| Ok(trading_account(state)));
        broker.expect_wait_until_connected().returning(|_| Ok(()));
        broker
            .expect_open_rpc_connection()
            .returning(|_| Ok(rpc_connection()));
        broker
            .expect_wait_until_synchronized()
            .returning(|_| Ok(account_information()));
        broker
    }

    #[tokio::test]
    async fn test_sell_signal_places_sell_order_with_first_take_profit() {
        let mut broker = connected_mock(AccountState::Deployed);
        broker.expect_deploy().never();
        broker.expect_create_market_buy_order().never();
        broker
            .expect_create_market_sell_order()
            .withf(|_, order| {
                order.symbol == "EURUSD"
                    && order.volume == 0.01
                    && order.take_profit == 1.2300
                    && order.stop_loss == 1.2400
            })
            .times(1)
            .returning(|_, _| Ok(trade_done()));

        let mut service = ExecutionService::new(broker, "acc-1");
        let signal = parse_signal(EURUSD_SELL).unwrap();

        let result = service.execute(&signal).await.unwrap();
        assert_eq!(result.string_code, "TRADE_RETCODE_DONE");
    }

    #[tokio::test]
    async fn test_buy_signal_deploys_undeployed_account_first() {
        let mut broker = connected_mock(AccountState::Undeployed);
        broker.expect_deploy().times(1).returning(|_| Ok(()));
        broker.expect_create_market_sell_order().never();
        broker
            .expect_create_market_buy_order()
            .withf(|_, order| order.symbol == "GBPUSD" && order.volume == 0.05)
            .times(1)
            .returning(|_, _| Ok(trade_done()));

        let mut service = ExecutionService::new(broker, "acc-1").with_sizer(FixedVolume(0.05));
        let signal = parse_signal("📈GBPUSD\n-\nDirection: buy\nEntry: 1.27\nTP: 1.28\n❌SL: 1.26").unwrap();

        assert!(service.execute(&signal).await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported_as_connect() {
        let mut broker = MockBroker::new();
        broker.expect_get_account().times(1).returning(|_| {
            Err(BrokerError::Api {
                status: 404,
                body: "account not found".to_string(),
            })
        });
        broker.expect_create_market_sell_order().never();

        let mut service = ExecutionService::new(broker, "acc-1");
        let signal = parse_signal(EURUSD_SELL).unwrap();

        let err = service.execute(&signal).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::Connect(BrokerError::Api { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_unusable_volume_never_reaches_the_broker() {
        let mut broker = connected_mock(AccountState::Deployed);
        broker.expect_create_market_sell_order().never();

        let mut service = ExecutionService::new(broker, "acc-1").with_sizer(FixedVolume(0.0));
        let signal = parse_signal(EURUSD_SELL).unwrap();

        let err = service.execute(&signal).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::InvalidVolume(v) if v == 0.0));
    }

    /// Records placed orders; per-symbol latency and failures.
    #[derive(Default)]
    struct RecordingBroker {
        delays: HashMap<String, Duration>,
        failing: HashSet<String>,
        placed: Arc<Mutex<Vec<String>>>,
        connects: Arc<AtomicUsize>,
    }

    impl RecordingBroker {
        async fn place(&self, order: &MarketOrder) -> Result<TradeResult, BrokerError> {
            if let Some(delay) = self.delays.get(&order.symbol) {
                tokio::time::sleep(*delay).await;
            }
            self.placed.lock().unwrap().push(order.symbol.clone());
            if self.failing.contains(&order.symbol) {
                return Err(BrokerError::TradeRejected {
                    numeric_code: 10019,
                    code: "TRADE_RETCODE_NO_MONEY".to_string(),
                    message: "Not enough money".to_string(),
                });
            }
            Ok(trade_done())
        }
    }

    #[async_trait]
    impl Brokerage for RecordingBroker {
        async fn get_account(&self, _account_id: &str) -> Result<TradingAccount, BrokerError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(trading_account(AccountState::Deployed))
        }

        async fn deploy(&self, _account: &TradingAccount) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn wait_until_connected(&self, _account: &TradingAccount) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn open_rpc_connection(
            &self,
            _account: &TradingAccount,
        ) -> Result<RpcConnection, BrokerError> {
            Ok(rpc_connection())
        }

        async fn wait_until_synchronized(
            &self,
            _connection: &RpcConnection,
        ) -> Result<AccountInformation, BrokerError> {
            Ok(account_information())
        }

        async fn create_market_buy_order(
            &self,
            _connection: &RpcConnection,
            order: &MarketOrder,
        ) -> Result<TradeResult, BrokerError> {
            self.place(order).await
        }

        async fn create_market_sell_order(
            &self,
            _connection: &RpcConnection,
            order: &MarketOrder,
        ) -> Result<TradeResult, BrokerError> {
            self.place(order).await
        }
    }

    fn signal(symbol: &str, direction: &str) -> Signal {
        parse_signal(&format!(
            "📉{symbol}\n-\nDirection: {direction}\nEntry: 1.1\nTP: 1.2\nTP: 1.3\n❌SL: 1.0"
        ))
        .unwrap()
    }

    async fn run_to_completion(broker: RecordingBroker, signals: Vec<Signal>) {
        let (queue, receiver) = SignalQueue::unbounded();
        for signal in signals {
            queue.enqueue(signal).unwrap();
        }
        drop(queue);

        ExecutionService::new(broker, "acc-1").start(receiver).await;
    }

    #[tokio::test]
    async fn test_signals_execute_in_arrival_order_despite_latency() {
        let broker = RecordingBroker {
            delays: HashMap::from([
                ("EURUSD".to_string(), Duration::from_millis(40)),
                ("USDJPY".to_string(), Duration::from_millis(15)),
            ]),
            ..Default::default()
        };
        let placed = broker.placed.clone();

        run_to_completion(
            broker,
            vec![
                signal("EURUSD", "SELL"),
                signal("GBPUSD", "BUY"),
                signal("USDJPY", "SELL"),
                signal("AUDUSD", "BUY"),
            ],
        )
        .await;

        assert_eq!(
            *placed.lock().unwrap(),
            ["EURUSD", "GBPUSD", "USDJPY", "AUDUSD"]
        );
    }

    #[tokio::test]
    async fn test_failed_execution_does_not_stop_the_consumer() {
        let broker = RecordingBroker {
            failing: HashSet::from(["GBPUSD".to_string()]),
            ..Default::default()
        };
        let placed = broker.placed.clone();
        let connects = broker.connects.clone();

        run_to_completion(
            broker,
            vec![
                signal("EURUSD", "SELL"),
                signal("GBPUSD", "BUY"),
                signal("USDJPY", "SELL"),
            ],
        )
        .await;

        assert_eq!(*placed.lock().unwrap(), ["EURUSD", "GBPUSD", "USDJPY"]);
        // One connect up front, one more after the failed order dropped the session.
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_session_is_reused_between_successful_signals() {
        let broker = RecordingBroker::default();
        let connects = broker.connects.clone();

        run_to_completion(
            broker,
            vec![signal("EURUSD", "SELL"), signal("GBPUSD", "BUY")],
        )
        .await;

        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }
}

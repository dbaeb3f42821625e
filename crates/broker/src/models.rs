/// Market order parameters. The side is chosen by which `Brokerage` method is called.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketOrder {
    pub symbol: String,
    pub volume: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Handle to the regional trading endpoint of a deployed account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConnection {
    pub account_id: String,
    pub base_url: String,
}

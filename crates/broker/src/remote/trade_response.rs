use serde::{Deserialize, Serialize};

use crate::models::MarketOrder;

/// MetaTrader return codes that mean the order went through.
const SUCCESS_CODES: &[i64] = &[
    0,     // ERR_NO_ERROR
    10008, // TRADE_RETCODE_PLACED
    10009, // TRADE_RETCODE_DONE
    10010, // TRADE_RETCODE_DONE_PARTIAL
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest<'a> {
    pub action_type: &'static str, // ORDER_TYPE_BUY or ORDER_TYPE_SELL
    pub symbol: &'a str,
    pub volume: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl<'a> TradeRequest<'a> {
    pub fn market_buy(order: &'a MarketOrder) -> Self {
        Self::market("ORDER_TYPE_BUY", order)
    }

    pub fn market_sell(order: &'a MarketOrder) -> Self {
        Self::market("ORDER_TYPE_SELL", order)
    }

    fn market(action_type: &'static str, order: &'a MarketOrder) -> Self {
        Self {
            action_type,
            symbol: &order.symbol,
            volume: order.volume,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    pub numeric_code: i64,
    pub string_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub position_id: Option<String>,
}

impl TradeResult {
    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.numeric_code)
    }
}

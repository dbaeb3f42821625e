use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Case-insensitive match against `BUY` / `SELL`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trading instruction extracted from a chat message.
///
/// Only built by [`crate::parser::parse_signal`], which guarantees at least one
/// take-profit and exactly one stop-loss. Fields are read-only so the
/// guarantee cannot be broken after parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    symbol: String,
    direction: Direction,
    entry: f64,
    take_profits: Vec<f64>,
    stop_loss: f64,
}

impl Signal {
    pub(crate) fn new(
        symbol: String,
        direction: Direction,
        entry: f64,
        first_take_profit: f64,
        more_take_profits: impl IntoIterator<Item = f64>,
        stop_loss: f64,
    ) -> Self {
        let mut take_profits = vec![first_take_profit];
        take_profits.extend(more_take_profits);
        Self {
            symbol,
            direction,
            entry,
            take_profits,
            stop_loss,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Informational only, never sent to the broker.
    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn take_profits(&self) -> &[f64] {
        &self.take_profits
    }

    /// The take-profit the order is placed with (the first one listed).
    pub fn take_profit(&self) -> f64 {
        self.take_profits[0]
    }

    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} TP={:?} SL={}",
            self.direction, self.symbol, self.entry, self.take_profits, self.stop_loss
        )
    }
}

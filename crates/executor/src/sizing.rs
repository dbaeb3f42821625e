use broker::AccountInformation;
use common::config::DEFAULT_TRADE_VOLUME;
use common::models::Signal;

/// Decides the lot size of the order placed for a signal.
pub trait VolumeSizer: Send + Sync {
    fn volume(&self, signal: &Signal, account: &AccountInformation) -> f64;
}

/// Same volume for every signal, whatever the account looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVolume(pub f64);

impl Default for FixedVolume {
    fn default() -> Self {
        Self(DEFAULT_TRADE_VOLUME)
    }
}

impl VolumeSizer for FixedVolume {
    fn volume(&self, _signal: &Signal, _account: &AccountInformation) -> f64 {
        self.0
    }
}

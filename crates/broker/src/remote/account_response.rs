use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountState {
    Created,
    Drafted,
    Deploying,
    Deployed,
    DeployFailed,
    Undeploying,
    Undeployed,
    UndeployFailed,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl AccountState {
    /// Deployed, or on its way there. Deploying again would be a no-op.
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed | Self::Deploying)
    }

    /// States an account never leaves on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DeployFailed
                | Self::Undeploying
                | Self::Undeployed
                | Self::UndeployFailed
                | Self::Deleting
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    DisconnectedFromBroker,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingAccount {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub state: AccountState,
    pub connection_status: ConnectionStatus,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "new-york".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformation {
    #[serde(default)]
    pub broker: String,
    #[serde(default)]
    pub currency: String,
    pub balance: f64,
    pub equity: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub free_margin: f64,
    #[serde(default)]
    pub leverage: f64,
}

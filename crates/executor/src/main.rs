use dotenvy::dotenv;
use tracing::{debug, info};

use broker::MetaApiClient;
use common::config::Config;
use common::logger;

use crate::queue::SignalQueue;
use crate::services::execution_service::ExecutionService;
use crate::services::telegram_service::TelegramService;
use crate::sizing::FixedVolume;

mod queue;
mod services;
mod sizing;

// Telegram updates and the execution consumer share one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    // Missing credentials abort here, before anything connects.
    let config = Config::from_env()?;
    logger::setup_logger(config.log_format);
    debug!("System starting up...");

    let broker = MetaApiClient::new(&config.metaapi)?;
    let (queue, receiver) = SignalQueue::unbounded();

    let execution_svc = ExecutionService::new(broker, config.metaapi.account_id.clone())
        .with_sizer(FixedVolume(config.trade_volume));
    let consumer = tokio::spawn(execution_svc.start(receiver));

    let telegram_svc = TelegramService::new(&config.telegram_token, queue);
    telegram_svc.start().await;

    // Listener is gone; let the consumer finish what was already queued.
    info!("Draining queued signals before exit");
    consumer.await?;
    Ok(())
}

use common::parser::{MalformedSignal, parse_signal};
use teloxide::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::queue::{QueueClosed, SignalQueue};

#[derive(Error, Debug)]
pub enum Rejection {
    #[error("malformed signal: {0}")]
    Malformed(#[from] MalformedSignal),
    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

/// Listens to the bot's chats and channels and feeds parsed signals into the queue.
pub struct TelegramService {
    bot: Bot,
    queue: SignalQueue,
}

impl TelegramService {
    pub fn new(token: &str, queue: SignalQueue) -> Self {
        Self {
            bot: Bot::new(token),
            queue,
        }
    }

    /// Long-polls until Ctrl-C. The queue handle is dropped on return.
    pub async fn start(self) {
        info!("Starting Telegram Signal Listener");

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter(is_signal_candidate)
                    .endpoint(handle_message),
            )
            .branch(
                Update::filter_channel_post()
                    .filter(is_signal_candidate)
                    .endpoint(handle_message),
            );

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.queue])
            .default_handler(|update| async move {
                debug!("Ignoring update {:?}", update.id);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram listener stopped.");
    }
}

fn is_signal_candidate(msg: Message) -> bool {
    msg.text().is_some_and(|text| !is_command(text))
}

fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

async fn handle_message(msg: Message, queue: SignalQueue) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Nothing is ever sent back to the chat; rejections only show up in the logs.
    match route_text(text, &queue) {
        Ok(()) => {}
        Err(Rejection::Malformed(e)) => {
            warn!(chat_id = %msg.chat.id, message_id = msg.id.0, error = %e, "Signal rejected");
        }
        Err(Rejection::QueueClosed(QueueClosed(signal))) => {
            error!(chat_id = %msg.chat.id, %signal, "Signal dropped, execution service has stopped");
        }
    }
    Ok(())
}

/// Parses `text` and queues the signal for execution.
pub fn route_text(text: &str, queue: &SignalQueue) -> Result<(), Rejection> {
    let signal = parse_signal(text)?;
    info!(
        symbol = signal.symbol(),
        direction = %signal.direction(),
        entry = signal.entry(),
        take_profits = ?signal.take_profits(),
        stop_loss = signal.stop_loss(),
        "Received signal"
    );
    queue.enqueue(signal)?;
    Ok(())
}

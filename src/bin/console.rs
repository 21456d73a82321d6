//! Terminal chat against a loopback peer
//!
//! Every line typed on stdin is sent as a message; the peer acknowledges it
//! and answers with an echo. Lines starting with `/lang ` change language,
//! `/menu ` sends a menu entry and `/quit` exits.
//!
//! `WEBCHAT_USER_ID` names the local user; `WEBCHAT_WAITING_MESSAGE` enables a
//! text waiting placeholder.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webchat_core::error::TransportError;
use webchat_core::runtime::Transport;
use webchat_core::state_machine::settings::WaitingMessage;
use webchat_core::state_machine::{Activity, ChannelAccount};
use webchat_core::{Action, ChatRuntime, Collaborators, EngineConfig};

/// Acknowledges every post and queues an echo reply from the bot
struct LoopbackTransport {
    bot: ChannelAccount,
    replies: mpsc::UnboundedSender<Activity>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn post(&self, activity: &Activity) -> Result<String, TransportError> {
        let Some(text) = activity.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(uuid::Uuid::new_v4().to_string());
        };
        let locale = activity.locale.clone().unwrap_or_default();
        let reply = Activity::message(self.bot.clone(), format!("echo: {text}"), locale)
            .with_id(uuid::Uuid::new_v4().to_string());
        self.replies
            .send(reply)
            .map_err(|_| TransportError::unavailable("console closed"))?;
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webchat_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = EngineConfig::from_env();
    tracing::info!(?config, "Loaded engine configuration");

    let user_id = std::env::var("WEBCHAT_USER_ID").unwrap_or_else(|_| "console-user".to_string());
    let user = ChannelAccount::new(user_id, "You");
    let bot = ChannelAccount::new("loopback-bot", "Bot");
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let transport: Arc<dyn Transport> = Arc::new(LoopbackTransport {
        bot: bot.clone(),
        replies: reply_tx,
    });

    let (dispatcher, runtime) = ChatRuntime::new(config, Collaborators::default()).spawn();
    dispatcher.start_connection(&transport, user, bot)?;
    if let Ok(text) = std::env::var("WEBCHAT_WAITING_MESSAGE") {
        dispatcher.dispatch(Action::SetCustomSettings {
            waiting_message: Some(WaitingMessage::message(text)),
        })?;
    }

    let printer = {
        let mut states = dispatcher.subscribe_state();
        tokio::spawn(async move {
            let mut shown = HashSet::new();
            while let Some(state) = states.next().await {
                for activity in &state.history.activities {
                    let (Some(id), Some(text)) = (activity.server_id(), activity.text.as_deref())
                    else {
                        continue;
                    };
                    if activity.is_message() && shown.insert(id.to_string()) {
                        let name = activity.from.name.as_deref().unwrap_or("?");
                        println!("[{name}] {text}");
                    }
                }
            }
        })
    };

    let replies = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                if dispatcher.receive(reply).is_err() {
                    break;
                }
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let sent = if line == "/quit" {
            break;
        } else if let Some(language) = line.strip_prefix("/lang ") {
            dispatcher.change_language(language.trim())
        } else if let Some(entry) = line.strip_prefix("/menu ") {
            dispatcher.send_menu_message(entry.trim())
        } else if line.is_empty() {
            continue;
        } else {
            dispatcher.send_message(line)
        };
        sent?;
    }

    dispatcher.shutdown();
    runtime.await?;
    replies.abort();
    printer.abort();
    Ok(())
}

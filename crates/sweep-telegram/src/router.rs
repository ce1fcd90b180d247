use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tracing::info;

use sweep_core::{
    config::Config,
    engine::ModerationEngine,
    ports::{AdminPort, Clock, MessagingPort, SystemClock},
    scheduler::AutoDeleteScheduler,
    store::{ChatDefaults, ConfigRegistry},
    workflow::SettingsFlow,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Shared per-process state handed to every update handler.
pub struct AppState {
    pub registry: Arc<ConfigRegistry>,
    pub flow: Arc<SettingsFlow>,
    pub engine: Arc<ModerationEngine>,
    pub scheduler: Arc<AutoDeleteScheduler>,
    pub messenger: Arc<dyn MessagingPort>,
    pub admin: Arc<dyn AdminPort>,
    pub clock: Arc<dyn Clock>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("sweep started: @{}", me.username());
    }

    let telegram = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = telegram.clone();
    let admin: Arc<dyn AdminPort> = telegram;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let registry = Arc::new(ConfigRegistry::new(ChatDefaults::from_config(&cfg)));
    let engine = Arc::new(ModerationEngine::new(
        registry.clone(),
        admin.clone(),
        messenger.clone(),
        clock.clone(),
    ));
    let scheduler = Arc::new(AutoDeleteScheduler::new(messenger.clone()));

    let state = Arc::new(AppState {
        registry,
        flow: Arc::new(SettingsFlow::default()),
        engine,
        scheduler,
        messenger,
        admin,
        clock,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}

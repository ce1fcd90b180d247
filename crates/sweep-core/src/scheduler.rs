use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use tracing::{debug, error};

use crate::domain::{ChatId, MessageRef};
use crate::ports::{delete_silently, InlineKeyboard, MessagingPort};
use crate::store::{AutoDeletePolicy, ChatConfig, TimerEntry};

/// Schedules delayed self-deletion of the bot's own messages.
///
/// At most one live timer exists per (chat, message): scheduling the same
/// message id again replaces and cancels the previous timer, and a fired
/// timer only acts if its entry is still the current one. Timers are never
/// cancelled from outside; they run to completion or are superseded.
pub struct AutoDeleteScheduler {
    messenger: Arc<dyn MessagingPort>,
    generations: AtomicU64,
}

impl AutoDeleteScheduler {
    pub fn new(messenger: Arc<dyn MessagingPort>) -> Self {
        Self {
            messenger,
            generations: AtomicU64::new(0),
        }
    }

    /// Register a delayed self-delete for a just-sent message.
    ///
    /// No-op when auto-deletion is disabled or the delay is zero.
    pub async fn schedule_self_delete(
        &self,
        config: Arc<Mutex<ChatConfig>>,
        msg: MessageRef,
        policy: AutoDeletePolicy,
    ) {
        if !policy.enabled || policy.delete_after_secs == 0 {
            return;
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();

        {
            let mut cfg = config.lock().await;
            let entry = TimerEntry {
                generation,
                cancel: cancel.clone(),
            };
            if let Some(prev) = cfg.live_timers.insert(msg.message_id, entry) {
                prev.cancel.cancel();
                debug!(
                    "replaced self-delete timer for message {} in chat {}",
                    msg.message_id.0, msg.chat_id.0
                );
            }
        }

        let messenger = self.messenger.clone();
        let delay = Duration::from_secs(u64::from(policy.delete_after_secs));
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(delay) => {}
            }

            // Act only if our entry is still the live one; a replacement or
            // cleanup that raced with the sleep wins.
            {
                let mut cfg = config.lock().await;
                match cfg.live_timers.get(&msg.message_id) {
                    Some(entry) if entry.generation == generation => {
                        cfg.live_timers.remove(&msg.message_id);
                    }
                    _ => return,
                }
            }

            delete_silently(messenger.as_ref(), msg).await;
        });
    }

    /// Send a message and register its self-delete per the chat's policy.
    ///
    /// A failed send yields no message and therefore no timer.
    pub async fn send_with_auto_delete(
        &self,
        config: Arc<Mutex<ChatConfig>>,
        chat_id: ChatId,
        html: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Option<MessageRef> {
        let sent = match keyboard {
            Some(kb) => self.messenger.send_inline_keyboard(chat_id, html, kb).await,
            None => self.messenger.send_html(chat_id, html).await,
        };

        let msg = match sent {
            Ok(m) => m,
            Err(e) => {
                error!("failed to send message to chat {}: {e}", chat_id.0);
                return None;
            }
        };

        let policy = { config.lock().await.auto_delete };
        self.schedule_self_delete(config, msg, policy).await;
        Some(msg)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::MessageId;
    use crate::ports::DeleteFailure;
    use crate::Result;

    #[derive(Default)]
    struct FakeMessenger {
        next_id: AtomicU64,
        deleted: StdMutex<Vec<MessageRef>>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_html(&self, chat_id: ChatId, _html: &str) -> Result<MessageRef> {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(id as i32),
            })
        }

        async fn send_inline_keyboard(
            &self,
            chat_id: ChatId,
            html: &str,
            _keyboard: InlineKeyboard,
        ) -> Result<MessageRef> {
            self.send_html(chat_id, html).await
        }

        async fn delete_message(&self, msg: MessageRef) -> std::result::Result<(), DeleteFailure> {
            self.deleted.lock().unwrap().push(msg);
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            _text: Option<&str>,
            _show_alert: bool,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn chat_config() -> Arc<Mutex<ChatConfig>> {
        Arc::new(Mutex::new(ChatConfig {
            whitelist: Vec::new(),
            time_range: crate::policy::TimeRange::default(),
            auto_delete: AutoDeletePolicy::default(),
            live_timers: Default::default(),
        }))
    }

    fn policy(secs: u32) -> AutoDeletePolicy {
        AutoDeletePolicy {
            enabled: true,
            delete_after_secs: secs,
        }
    }

    const MSG: MessageRef = MessageRef {
        chat_id: ChatId(1),
        message_id: MessageId(77),
    };

    #[tokio::test]
    async fn timer_fires_once_and_cleans_up_its_entry() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = AutoDeleteScheduler::new(messenger.clone());
        let config = chat_config();

        scheduler
            .schedule_self_delete(config.clone(), MSG, policy(1))
            .await;
        assert!(config.lock().await.live_timers.contains_key(&MSG.message_id));

        sleep(Duration::from_millis(1500)).await;

        assert_eq!(*messenger.deleted.lock().unwrap(), vec![MSG]);
        assert!(config.lock().await.live_timers.is_empty());
    }

    #[tokio::test]
    async fn rescheduling_replaces_the_timer_and_deletes_once() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = AutoDeleteScheduler::new(messenger.clone());
        let config = chat_config();

        scheduler
            .schedule_self_delete(config.clone(), MSG, policy(1))
            .await;
        scheduler
            .schedule_self_delete(config.clone(), MSG, policy(1))
            .await;
        assert_eq!(config.lock().await.live_timers.len(), 1);

        sleep(Duration::from_millis(1500)).await;

        assert_eq!(messenger.deleted.lock().unwrap().len(), 1);
        assert!(config.lock().await.live_timers.is_empty());
    }

    #[tokio::test]
    async fn disabled_policy_schedules_nothing() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = AutoDeleteScheduler::new(messenger.clone());
        let config = chat_config();

        let off = AutoDeletePolicy {
            enabled: false,
            delete_after_secs: 30,
        };
        scheduler.schedule_self_delete(config.clone(), MSG, off).await;
        scheduler
            .schedule_self_delete(config.clone(), MSG, policy(0))
            .await;

        assert!(config.lock().await.live_timers.is_empty());
        sleep(Duration::from_millis(100)).await;
        assert!(messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_with_auto_delete_registers_a_timer() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = AutoDeleteScheduler::new(messenger.clone());
        let config = chat_config();
        {
            let mut cfg = config.lock().await;
            cfg.auto_delete.delete_after_secs = 1;
        }

        let sent = scheduler
            .send_with_auto_delete(config.clone(), ChatId(1), "hello", None)
            .await
            .unwrap();
        assert!(config.lock().await.live_timers.contains_key(&sent.message_id));

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(*messenger.deleted.lock().unwrap(), vec![sent]);
    }
}

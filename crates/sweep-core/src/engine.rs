use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::domain::InboundMessage;
use crate::ports::{delete_silently, AdminPort, Clock, MessagingPort};
use crate::store::{contains_handle, ConfigRegistry};

/// Outcome of one moderation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Delete,
}

/// Decides whether an inbound group message came from an inline bot query
/// and removes it when the chat's policy says so.
pub struct ModerationEngine {
    registry: Arc<ConfigRegistry>,
    admin: Arc<dyn AdminPort>,
    messenger: Arc<dyn MessagingPort>,
    clock: Arc<dyn Clock>,
}

impl ModerationEngine {
    pub fn new(
        registry: Arc<ConfigRegistry>,
        admin: Arc<dyn AdminPort>,
        messenger: Arc<dyn MessagingPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            admin,
            messenger,
            clock,
        }
    }

    /// Run the moderation sequence for one message.
    ///
    /// Checks run cheapest-first and short-circuit; the admin lookup is the
    /// only external call on the skip paths, and the delete itself is
    /// best-effort (a failed delete still counts as a Delete decision).
    pub async fn evaluate(&self, msg: &InboundMessage) -> Decision {
        if !msg.chat_kind.is_group() {
            return Decision::Skip;
        }

        let config = self.registry.get_or_create(msg.chat_id).await;
        // Snapshot so no lock is held across the platform calls below.
        let (time_range, whitelist) = {
            let cfg = config.lock().await;
            (cfg.time_range, cfg.whitelist.clone())
        };

        if let Some(sender) = msg.sender {
            match self.admin.is_admin(msg.chat_id, sender).await {
                Ok(true) => {
                    debug!(
                        "admin {} is exempt from moderation in chat {}",
                        sender.0, msg.chat_id.0
                    );
                    return Decision::Skip;
                }
                Ok(false) => {}
                // Lookup failure counts as "not admin": the message stays
                // eligible for the remaining checks.
                Err(e) => warn!("admin lookup failed in chat {}: {e}", msg.chat_id.0),
            }
        }

        if !time_range.should_delete_at(self.clock.now_time()) {
            return Decision::Skip;
        }

        let classification = classify(msg);
        if !classification.is_inline_origin {
            return Decision::Skip;
        }

        if let Some(handle) = &classification.origin_handle {
            if contains_handle(&whitelist, handle) {
                debug!("{handle} is whitelisted in chat {}", msg.chat_id.0);
                return Decision::Skip;
            }
        }

        if delete_silently(self.messenger.as_ref(), msg.msg_ref()).await {
            info!(
                "removed inline-bot message {} from chat {} (origin: {})",
                msg.message_id.0,
                msg.chat_id.0,
                classification.origin_handle.as_deref().unwrap_or("unknown")
            );
        }
        Decision::Delete
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::NaiveTime;

    use super::*;
    use crate::domain::{ChatId, ChatKind, MessageId, MessageRef, UserId, ViaBot};
    use crate::policy::DeleteMode;
    use crate::ports::{DeleteFailure, InlineKeyboard};
    use crate::store::ChatDefaults;
    use crate::Result;

    #[derive(Default)]
    struct FakeMessenger {
        deleted: StdMutex<Vec<MessageRef>>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_html(&self, chat_id: ChatId, _html: &str) -> Result<MessageRef> {
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn send_inline_keyboard(
            &self,
            chat_id: ChatId,
            _html: &str,
            _keyboard: InlineKeyboard,
        ) -> Result<MessageRef> {
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
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

    struct FakeAdmin {
        admins: HashSet<(i64, i64)>,
    }

    impl FakeAdmin {
        fn none() -> Self {
            Self {
                admins: HashSet::new(),
            }
        }

        fn with(chat: i64, user: i64) -> Self {
            let mut admins = HashSet::new();
            admins.insert((chat, user));
            Self { admins }
        }
    }

    #[async_trait]
    impl AdminPort for FakeAdmin {
        async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
            Ok(self.admins.contains(&(chat_id.0, user_id.0)))
        }

        async fn bot_is_admin(&self, _chat_id: ChatId) -> Result<bool> {
            Ok(true)
        }
    }

    struct FixedClock(NaiveTime);

    impl Clock for FixedClock {
        fn now_time(&self) -> NaiveTime {
            self.0
        }
    }

    fn harness(admin: FakeAdmin, now: NaiveTime) -> (ModerationEngine, Arc<FakeMessenger>, Arc<ConfigRegistry>) {
        let registry = Arc::new(ConfigRegistry::new(ChatDefaults {
            whitelist: Vec::new(),
            ..ChatDefaults::default()
        }));
        let messenger = Arc::new(FakeMessenger::default());
        let engine = ModerationEngine::new(
            registry.clone(),
            Arc::new(admin),
            messenger.clone(),
            Arc::new(FixedClock(now)),
        );
        (engine, messenger, registry)
    }

    fn inline_message(chat: i64, sender: i64, bot: &str) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(chat),
            chat_kind: ChatKind::Supergroup,
            message_id: MessageId(42),
            sender: Some(UserId(sender)),
            via_bot: Some(ViaBot {
                username: Some(bot.to_string()),
            }),
            has_inline_keyboard: false,
            text: None,
            caption: None,
        }
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn inline_message_from_regular_user_is_deleted() {
        let (engine, messenger, _) = harness(FakeAdmin::none(), noon());
        let msg = inline_message(10, 500, "FooBot");

        assert_eq!(engine.evaluate(&msg).await, Decision::Delete);
        let deleted = messenger.deleted.lock().unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0], msg.msg_ref());
    }

    #[tokio::test]
    async fn admin_sender_is_always_exempt() {
        let (engine, messenger, _) = harness(FakeAdmin::with(10, 500), noon());
        let msg = inline_message(10, 500, "FooBot");

        assert_eq!(engine.evaluate(&msg).await, Decision::Skip);
        assert!(messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn private_chats_are_ignored() {
        let (engine, messenger, _) = harness(FakeAdmin::none(), noon());
        let mut msg = inline_message(10, 500, "FooBot");
        msg.chat_kind = ChatKind::Private;

        assert_eq!(engine.evaluate(&msg).await, Decision::Skip);
        assert!(messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitelisted_origin_is_skipped_case_insensitively() {
        let (engine, messenger, registry) = harness(FakeAdmin::none(), noon());
        let config = registry.get_or_create(ChatId(10)).await;
        config.lock().await.whitelist.push("@foobot".to_string());

        let msg = inline_message(10, 500, "FooBot");
        assert_eq!(engine.evaluate(&msg).await, Decision::Skip);
        assert!(messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn outside_the_time_window_nothing_is_deleted() {
        let (engine, messenger, registry) = harness(FakeAdmin::none(), noon());
        let config = registry.get_or_create(ChatId(10)).await;
        {
            let mut cfg = config.lock().await;
            cfg.time_range.mode = DeleteMode::TimeRange;
            cfg.time_range.start_hour = 22;
            cfg.time_range.end_hour = 8;
        }

        let msg = inline_message(10, 500, "FooBot");
        assert_eq!(engine.evaluate(&msg).await, Decision::Skip);
        assert!(messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_inline_messages_are_skipped() {
        let (engine, messenger, _) = harness(FakeAdmin::none(), noon());
        let mut msg = inline_message(10, 500, "FooBot");
        msg.via_bot = None;
        msg.text = Some("ordinary chatter".to_string());

        assert_eq!(engine.evaluate(&msg).await, Decision::Skip);
        assert!(messenger.deleted.lock().unwrap().is_empty());
    }
}

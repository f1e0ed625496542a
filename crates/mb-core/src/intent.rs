//! Entry point for NLU results: route the action, then send the outcome

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action::{ActionContext, ActionRouter, RouterOutcome, SpecializedReply};
use crate::nlu::{IntentResult, OutputContext, Parameters};
use crate::recipient::RecipientId;
use crate::reply::{MessageTransport, ReplyFragment, ReplyScheduler, SenderAction};

/// Sent when the NLU produced neither fragments nor fulfillment text
pub const FALLBACK_REPLY: &str = "I'm not sure what you want. Can you be more specific?";

/// Timer tasks started for one intent result.
///
/// Sends happen whether or not this is awaited.
#[derive(Debug, Default)]
pub struct ReplyBurst {
    handles: Vec<JoinHandle<()>>,
}

impl ReplyBurst {
    fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every scheduled send has run
    pub async fn finished(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Reply task failed: {}", e);
            }
        }
    }
}

/// Ties the action router to the reply scheduler
#[derive(Clone)]
pub struct IntentResultHandler {
    router: Arc<ActionRouter>,
    scheduler: ReplyScheduler,
}

impl IntentResultHandler {
    pub fn new(router: ActionRouter, scheduler: ReplyScheduler) -> Self {
        Self {
            router: Arc::new(router),
            scheduler,
        }
    }

    pub fn router(&self) -> &ActionRouter {
        &self.router
    }

    pub fn scheduler(&self) -> &ReplyScheduler {
        &self.scheduler
    }

    fn transport(&self) -> &Arc<dyn MessageTransport> {
        self.scheduler.transport()
    }

    /// Route `action` (if any) and send the result.
    ///
    /// Without an action the fragments go straight to the scheduler.
    pub async fn handle_intent_result(
        &self,
        recipient: &RecipientId,
        action: Option<&str>,
        fragments: &[ReplyFragment],
        contexts: &[OutputContext],
        parameters: &Parameters,
    ) -> ReplyBurst {
        let outcome = match action.filter(|a| !a.is_empty()) {
            Some(action) => {
                let ctx = ActionContext {
                    recipient,
                    action,
                    fragments,
                    contexts,
                    parameters,
                };
                self.router.route(&ctx).await
            }
            None => RouterOutcome::Delegate(fragments.to_vec()),
        };

        self.execute(recipient, outcome).await
    }

    /// Full handling of a detect-intent response
    pub async fn handle_detect_result(&self, recipient: &RecipientId, result: &IntentResult) -> ReplyBurst {
        if let Some(action) = result.action() {
            return self
                .handle_intent_result(
                    recipient,
                    Some(action),
                    &result.fragments,
                    &result.contexts,
                    &result.parameters,
                )
                .await;
        }

        if !result.fragments.is_empty() {
            return ReplyBurst::new(self.scheduler.schedule(recipient, &result.fragments));
        }

        let text = if result.fulfillment_text.is_empty() {
            FALLBACK_REPLY
        } else {
            result.fulfillment_text.as_str()
        };
        self.transport().send_text(recipient, text).await;
        ReplyBurst::default()
    }

    async fn execute(&self, recipient: &RecipientId, outcome: RouterOutcome) -> ReplyBurst {
        match outcome {
            RouterOutcome::Delegate(fragments) => {
                ReplyBurst::new(self.scheduler.schedule(recipient, &fragments))
            }
            RouterOutcome::Reply(SpecializedReply::Text(text)) => {
                self.transport().send_text(recipient, &text).await;
                ReplyBurst::default()
            }
            RouterOutcome::Reply(SpecializedReply::QuickReplies { title, options }) => {
                self.transport().send_quick_replies(recipient, &title, &options).await;
                ReplyBurst::default()
            }
            RouterOutcome::Reply(SpecializedReply::FollowUp {
                fragments,
                delay,
                text,
                buttons,
            }) => {
                let mut handles = self.scheduler.schedule(recipient, &fragments);
                self.transport()
                    .send_sender_action(recipient, SenderAction::TypingOn)
                    .await;

                debug!(recipient = %recipient, ?delay, "Follow-up buttons scheduled");
                let transport = Arc::clone(self.transport());
                let recipient = recipient.clone();
                handles.push(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    transport.send_buttons(&recipient, &text, &buttons).await;
                }));

                ReplyBurst::new(handles)
            }
        }
    }
}

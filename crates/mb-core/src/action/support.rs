//! Customer-support actions: delivery FAQ and job applications

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{ActionContext, ActionHandler, RouterOutcome, SpecializedReply};
use crate::reply::{QuickReply, TemplateButton};

/// Sends the FAQ answer, then offers next steps as buttons
pub struct FaqDeliveryHandler {
    pub delay: Duration,
    pub tracking_url: String,
    pub phone_number: String,
}

impl Default for FaqDeliveryHandler {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            tracking_url: "https://www.myapple.com/track_order".to_string(),
            phone_number: "+918988989898".to_string(),
        }
    }
}

#[async_trait]
impl ActionHandler for FaqDeliveryHandler {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        let buttons = vec![
            TemplateButton::Link {
                title: "Track my order".to_string(),
                url: self.tracking_url.clone(),
            },
            TemplateButton::PhoneNumber {
                title: "Call us".to_string(),
                payload: self.phone_number.clone(),
            },
            TemplateButton::Postback {
                title: "Keep Chatting".to_string(),
                payload: "CHAT".to_string(),
            },
        ];

        RouterOutcome::Reply(SpecializedReply::FollowUp {
            fragments: ctx.fragments.to_vec(),
            delay: self.delay,
            text: "What would you like to do next ?".to_string(),
            buttons,
        })
    }
}

const JOB_CONTEXTS: &[&str] = &["job_application", "job-application-details_dialog"];

/// Asks for years of experience once contact details and previous job are
/// known. Everything else goes through the NLU fragments.
pub struct JobApplicationHandler;

#[async_trait]
impl ActionHandler for JobApplicationHandler {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        let Some(context) = ctx
            .contexts
            .first()
            .filter(|c| JOB_CONTEXTS.iter().any(|name| c.name.contains(name)))
        else {
            return ctx.delegate();
        };

        let params = &context.parameters;
        let phone = params.get_str("phone-number");
        let user_name = params.get_str("user-name");
        let previous_job = params.get_str("previous-job");
        let years = params.get_str("years-of-experience");
        let vacancy = params.get_str("job-vacancy");

        match (phone, user_name, previous_job, years) {
            (Some(_), Some(_), Some(_), None) => match ctx.first_text() {
                Some(title) => RouterOutcome::Reply(SpecializedReply::QuickReplies {
                    title: title.to_string(),
                    options: vec![
                        QuickReply::new("Less than a year", "Less than a year."),
                        QuickReply::new("Less than 10 years", "Less than 10 years."),
                        QuickReply::new("More than 10 years", "More than 10 years."),
                    ],
                }),
                None => ctx.delegate(),
            },
            (Some(phone), Some(user_name), Some(previous_job), Some(years)) => {
                if let Some(vacancy) = vacancy {
                    info!(
                        recipient = %ctx.recipient,
                        user_name,
                        vacancy,
                        previous_job,
                        years,
                        phone,
                        "New job enquiry"
                    );
                }
                ctx.delegate()
            }
            _ => ctx.delegate(),
        }
    }
}

//! Test doubles shared by the handler and webhook tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mb_core::{
    ActionRouter, Error as CoreError, InMemoryPreferenceStore, IntentResult, IntentResultHandler, NluClient,
    ReplyScheduler,
};

pub use mb_core::reply::transport::testing::{RecordingTransport, Sent};

use crate::api::ProfileLookup;
use crate::error::Result;
use crate::handler::FacebookHandler;
use crate::session::SessionRegistry;
use crate::types::UserProfile;

/// Answers every query with `echo: {text}` as fulfillment text
#[derive(Default)]
pub struct EchoNlu {
    failing: AtomicBool,
    queries: Mutex<Vec<(String, String)>>,
}

impl EchoNlu {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// `(session_id, text)` pairs in call order
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NluClient for EchoNlu {
    async fn detect_intent(&self, session_id: &str, text: &str) -> mb_core::Result<IntentResult> {
        self.queries
            .lock()
            .unwrap()
            .push((session_id.to_string(), text.to_string()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Dialogflow("unavailable".into()));
        }
        Ok(IntentResult {
            query_text: text.to_string(),
            fulfillment_text: format!("echo: {}", text),
            ..Default::default()
        })
    }
}

/// Known profiles by PSID; unknown users get an empty profile
#[derive(Default)]
pub struct FakeProfiles {
    profiles: Mutex<HashMap<String, UserProfile>>,
    lookups: AtomicUsize,
}

impl FakeProfiles {
    pub fn set(&self, psid: &str, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(psid.to_string(), profile);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileLookup for FakeProfiles {
    async fn user_profile(&self, psid: &str) -> Result<UserProfile> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().unwrap().get(psid).cloned().unwrap_or_default())
    }
}

pub struct Fixture {
    pub handler: Arc<FacebookHandler>,
    pub transport: Arc<RecordingTransport>,
    pub nlu: Arc<EchoNlu>,
    pub profiles: Arc<FakeProfiles>,
}

pub fn fixture() -> Fixture {
    let transport = Arc::new(RecordingTransport::new());
    let nlu = Arc::new(EchoNlu::default());
    let profiles = Arc::new(FakeProfiles::default());

    let store = Arc::new(InMemoryPreferenceStore::new());
    let router = ActionRouter::with_default_actions(store.clone(), store, None);
    let intents = IntentResultHandler::new(router, ReplyScheduler::new(transport.clone()));

    let handler = Arc::new(FacebookHandler::new(
        intents,
        nlu.clone(),
        profiles.clone(),
        Arc::new(SessionRegistry::default()),
    ));

    Fixture {
        handler,
        transport,
        nlu,
        profiles,
    }
}

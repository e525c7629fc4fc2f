//! Scripted event sources

#![allow(dead_code)]

use async_trait::async_trait;
use evmap_common::events::SourceKind;
use evmap_discovery::models::{EventQuery, RawPayload};
use evmap_discovery::services::SourceError;
use evmap_discovery::sources::EventSource;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Records(Vec<Value>),
    Fail(SourceError),
    /// Never completes; the caller has to give up on it
    Hang,
}

impl Reply {
    pub fn empty() -> Self {
        Reply::Records(Vec::new())
    }

    pub fn status(status: u16) -> Self {
        Reply::Fail(SourceError::Http {
            status,
            body: format!("scripted {}", status),
        })
    }
}

/// Source replaying a script; the last reply repeats once the script runs out
pub struct ScriptedSource {
    kind: SourceKind,
    script: Vec<Reply>,
    calls: AtomicUsize,
    queries: Mutex<Vec<EventQuery>>,
    has_credentials: bool,
}

impl ScriptedSource {
    pub fn new(kind: SourceKind, script: Vec<Reply>) -> Self {
        assert!(!script.is_empty(), "script needs at least one reply");
        Self {
            kind,
            script,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            has_credentials: true,
        }
    }

    /// Source that always answers with `records`
    pub fn always(kind: SourceKind, records: Vec<Value>) -> Self {
        Self::new(kind, vec![Reply::Records(records)])
    }

    pub fn without_credentials(mut self) -> Self {
        self.has_credentials = false;
        self
    }

    /// Network calls made so far (retries included)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<EventQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, query: &EventQuery) -> Result<RawPayload, SourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        match &self.script[n.min(self.script.len() - 1)] {
            Reply::Records(records) => Ok(RawPayload::new(self.kind, records.clone())),
            Reply::Fail(err) => Err(err.clone()),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn has_credentials(&self) -> bool {
        self.has_credentials
    }
}

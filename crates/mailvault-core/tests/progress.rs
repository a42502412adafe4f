//! Progress logging of the pipeline, observed through a capturing layer.

#![allow(clippy::unwrap_used)]

use std::fmt;
use std::sync::{Arc, Mutex};

use mailvault_core::{
    IngestionPipeline, MailStore, MessageBatch, MessageSource, RawMessage, SequenceRange,
    SourceError,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Serves `count` well-formed messages.
struct Mailbox {
    count: u32,
}

impl MessageSource for Mailbox {
    async fn folders(&mut self) -> Result<Vec<String>, SourceError> {
        Ok(vec!["INBOX".into()])
    }

    async fn select(&mut self, _folder: &str) -> Result<u32, SourceError> {
        Ok(self.count)
    }

    async fn fetch(&mut self, range: SequenceRange) -> Result<MessageBatch, SourceError> {
        let messages = (range.start()..=range.end())
            .map(|seq| RawMessage {
                seq,
                uid: Some(seq),
                body: format!("From: a{seq}@example.com\r\nTo: b@example.com\r\n\r\nbody\r\n")
                    .into_bytes(),
            })
            .collect();
        Ok(MessageBatch::ready(messages, Ok(())))
    }

    async fn logout(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Records the `handled` field of every "progress" event.
#[derive(Clone, Default)]
struct ProgressLog(Arc<Mutex<Vec<u64>>>);

#[derive(Default)]
struct ProgressFields {
    message: Option<String>,
    handled: Option<u64>,
}

impl Visit for ProgressFields {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "handled" {
            self.handled = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for ProgressLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = ProgressFields::default();
        event.record(&mut fields);
        if let (Some("progress"), Some(handled)) = (fields.message.as_deref(), fields.handled) {
            self.0.lock().unwrap().push(handled);
        }
    }
}

#[tokio::test]
async fn progress_is_logged_every_interval() {
    let log = ProgressLog::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

    let mut source = Mailbox { count: 5 };
    let store = MailStore::in_memory().await.unwrap();
    let report = IngestionPipeline::new(&mut source, &store, 2)
        .run("INBOX", 10)
        .await
        .unwrap();

    assert_eq!(report.processed, 5);
    assert_eq!(*log.0.lock().unwrap(), vec![2, 4]);
}

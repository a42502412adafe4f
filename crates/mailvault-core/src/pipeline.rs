//! Ingestion pipeline.
//!
//! Drives one batch through source, decomposer, validator and sink. Messages
//! are handled one at a time in retrieval order, and the parts of a message
//! in document order.
//!
//! # Failure policy
//!
//! | Condition | Effect |
//! |---|---|
//! | source failure | run aborted |
//! | unknown transfer encoding or charset on open | message skipped |
//! | any other decomposition failure on open | run aborted |
//! | missing or unparsable From | run aborted |
//! | unreadable part | part skipped |
//! | empty or invalid text | part skipped |
//! | store write failure | run aborted |
//! | fetch stream error after the batch drained | run aborted |

use mailvault_imap::SequenceRange;
use mailvault_mime::{MessageReader, Part};

use crate::error::{Aborted, IngestError};
use crate::model::Message;
use crate::source::{MessageSource, RawMessage};
use crate::store::PersistenceSink;
use crate::validator::{Validation, validate};

/// Separator between the accepted text parts of one message.
const PART_SEPARATOR: &str = "\n\n";

/// Counters of a completed (or aborted) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Range that was fetched; `None` for an empty folder.
    pub range: Option<SequenceRange>,
    /// Messages stored.
    pub processed: usize,
    /// Messages skipped for an unknown encoding.
    pub skipped_messages: usize,
    /// Parts that could not be decoded.
    pub skipped_parts: usize,
    /// Text parts rejected by validation.
    pub rejected_texts: usize,
    /// Attachments stored.
    pub attachments: usize,
    /// Messages stored without a recipient.
    pub missing_recipients: usize,
}

impl BatchReport {
    /// Messages taken from the batch so far, stored or skipped.
    #[must_use]
    pub const fn handled(&self) -> usize {
        self.processed + self.skipped_messages
    }
}

/// Runs ingestion batches from `Src` into `Sink`.
#[derive(Debug)]
pub struct IngestionPipeline<'a, Src, Sink> {
    source: &'a mut Src,
    sink: &'a Sink,
    progress_interval: usize,
}

impl<'a, Src, Sink> IngestionPipeline<'a, Src, Sink>
where
    Src: MessageSource,
    Sink: PersistenceSink,
{
    /// Creates a pipeline logging progress every `progress_interval`
    /// messages (at least 1).
    #[must_use]
    pub fn new(source: &'a mut Src, sink: &'a Sink, progress_interval: usize) -> Self {
        Self {
            source,
            sink,
            progress_interval: progress_interval.max(1),
        }
    }

    /// Ingests the newest `batch_size` messages of `folder`.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`] when an unrecoverable condition stops the run.
    /// Rows written before that point stay in the store.
    pub async fn run(&mut self, folder: &str, batch_size: u32) -> Result<BatchReport, Aborted> {
        let mut report = BatchReport::default();

        match self.ingest(folder, batch_size, &mut report).await {
            Ok(()) => {
                tracing::info!(
                    folder,
                    processed = report.processed,
                    skipped_messages = report.skipped_messages,
                    skipped_parts = report.skipped_parts,
                    rejected_texts = report.rejected_texts,
                    attachments = report.attachments,
                    "batch complete"
                );
                Ok(report)
            }
            Err(cause) => {
                tracing::error!(folder, processed = report.processed, error = %cause, "batch aborted");
                Err(Aborted {
                    cause,
                    processed: report.processed,
                })
            }
        }
    }

    async fn ingest(
        &mut self,
        folder: &str,
        batch_size: u32,
        report: &mut BatchReport,
    ) -> Result<(), IngestError> {
        let folders = self
            .source
            .folders()
            .await
            .map_err(IngestError::Connection)?;
        tracing::info!(count = folders.len(), ?folders, "mailbox folders");

        let total = self
            .source
            .select(folder)
            .await
            .map_err(IngestError::Connection)?;

        let Some(range) = SequenceRange::newest(total, batch_size) else {
            tracing::info!(folder, "folder is empty, nothing to fetch");
            return Ok(());
        };
        report.range = Some(range);
        tracing::info!(folder, %range, total, "fetching messages");

        let mut batch = self
            .source
            .fetch(range)
            .await
            .map_err(IngestError::Connection)?;

        while let Some(raw) = batch.next().await {
            self.ingest_message(raw, report).await?;

            let handled = report.handled();
            if handled % self.progress_interval == 0 {
                tracing::info!(handled, of = range.len(), "progress");
            }
        }

        batch.finish().await.map_err(IngestError::FetchStream)
    }

    async fn ingest_message(
        &self,
        raw: RawMessage,
        report: &mut BatchReport,
    ) -> Result<(), IngestError> {
        let RawMessage { seq, uid, body } = raw;

        let mut reader = match MessageReader::from_bytes(body) {
            Ok(reader) => reader,
            Err(e) if e.is_unknown_encoding() => {
                tracing::warn!(seq, ?uid, error = %e, "skipping message with unknown encoding");
                report.skipped_messages += 1;
                return Ok(());
            }
            Err(source) => return Err(IngestError::Malformed { uid, source }),
        };

        let message = Message::from_header(reader.header(), uid)?;
        let message_id = reader.header().message_id().unwrap_or_default().to_owned();
        if message.to.is_empty() {
            tracing::warn!(
                ?uid,
                %message_id,
                from = %message.from,
                subject = %message.subject,
                "message has no recipient"
            );
            report.missing_recipients += 1;
        }

        let id = self.sink.insert_header(&message).await?;

        let mut texts = Vec::new();
        while let Some(part) = reader.next_part() {
            match part {
                Ok(Part::Text(text)) => match validate(text.body) {
                    Validation::Clean(clean) => texts.push(clean),
                    Validation::Rejected(reason) => {
                        tracing::warn!(
                            ?uid,
                            %message_id,
                            from = %message.from,
                            subject = %message.subject,
                            %reason,
                            "text part rejected"
                        );
                        report.rejected_texts += 1;
                    }
                },
                Ok(Part::Attachment(attachment)) => {
                    self.sink
                        .insert_attachment(&attachment.filename, &attachment.body, id)
                        .await?;
                    report.attachments += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        ?uid,
                        %message_id,
                        from = %message.from,
                        subject = %message.subject,
                        error = %e,
                        "skipping unreadable part"
                    );
                    report.skipped_parts += 1;
                }
            }
        }

        if !texts.is_empty() {
            self.sink
                .update_body_text(id, &texts.join(PART_SEPARATOR))
                .await?;
        }

        report.processed += 1;
        Ok(())
    }
}

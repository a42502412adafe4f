//! End-to-end pipeline tests against an in-memory store.
//!
//! `FakeSource` serves canned messages for whatever range the pipeline
//! asks for. A few tests drive a real `ImapSource` over a scripted server.

#![allow(clippy::unwrap_used)]

use mailvault_core::{
    Aborted, ImapSource, IngestError, IngestionPipeline, MailStore, Message, MessageBatch,
    MessageSource, PersistenceSink, RawMessage, SequenceRange, SourceError,
};
use mailvault_imap::Client;
use proptest::prelude::*;
use tokio_test::io::Builder;

#[derive(Default)]
struct FakeSource {
    mailbox: Vec<Vec<u8>>,
    terminal: Option<SourceError>,
    refuse_select: bool,
    requested: Option<SequenceRange>,
    logged_out: bool,
}

impl FakeSource {
    fn with_messages(mailbox: Vec<String>) -> Self {
        Self {
            mailbox: mailbox.into_iter().map(String::into_bytes).collect(),
            ..Self::default()
        }
    }
}

impl MessageSource for FakeSource {
    async fn folders(&mut self) -> Result<Vec<String>, SourceError> {
        Ok(vec!["INBOX".into(), "Archive".into()])
    }

    async fn select(&mut self, _folder: &str) -> Result<u32, SourceError> {
        if self.refuse_select {
            return Err(SourceError::SessionUnavailable("connection lost"));
        }
        Ok(u32::try_from(self.mailbox.len()).unwrap())
    }

    async fn fetch(&mut self, range: SequenceRange) -> Result<MessageBatch, SourceError> {
        self.requested = Some(range);
        let messages = (range.start()..=range.end())
            .map(|seq| RawMessage {
                seq,
                uid: Some(1000 + seq),
                body: self.mailbox[seq as usize - 1].clone(),
            })
            .collect();
        let outcome = self.terminal.take().map_or(Ok(()), Err);
        Ok(MessageBatch::ready(messages, outcome))
    }

    async fn logout(&mut self) -> Result<(), SourceError> {
        self.logged_out = true;
        Ok(())
    }
}

/// Sink whose writes always fail.
struct BrokenSink;

impl PersistenceSink for BrokenSink {
    async fn insert_header(&self, _message: &Message) -> Result<i64, sqlx::Error> {
        Err(sqlx::Error::PoolClosed)
    }

    async fn update_body_text(&self, _id: i64, _text: &str) -> Result<(), sqlx::Error> {
        Err(sqlx::Error::PoolClosed)
    }

    async fn insert_attachment(
        &self,
        _filename: &str,
        _data: &[u8],
        _id: i64,
    ) -> Result<(), sqlx::Error> {
        Err(sqlx::Error::PoolClosed)
    }
}

fn plain(n: usize) -> String {
    format!(
        "From: sender{n}@example.com\r\n\
         To: archive@example.com\r\n\
         Subject: message {n}\r\n\
         Date: Mon, 6 May 2024 08:00:00 +0000\r\n\
         \r\n\
         Body of message {n}\r\n"
    )
}

fn koi8(n: usize) -> String {
    format!(
        "From: odd{n}@example.com\r\n\
         To: archive@example.com\r\n\
         Subject: koi8 {n}\r\n\
         Content-Type: text/plain; charset=koi8-r\r\n\
         \r\n\
         privet\r\n"
    )
}

async fn run(
    source: &mut FakeSource,
    store: &MailStore,
    batch_size: u32,
) -> Result<mailvault_core::BatchReport, Aborted> {
    IngestionPipeline::new(source, store, 100)
        .run("INBOX", batch_size)
        .await
}

#[tokio::test]
async fn small_mailbox_is_fetched_completely() {
    let mut source = FakeSource::with_messages((1..=5).map(plain).collect());
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(source.requested, SequenceRange::new(1, 5));
    assert_eq!(report.processed, 5);
    assert_eq!(store.message_count().await.unwrap(), 5);

    let stored = store.messages().await.unwrap();
    let subjects: Vec<_> = stored.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(
        subjects,
        vec!["message 1", "message 2", "message 3", "message 4", "message 5"]
    );
    assert_eq!(stored[0].from, "<sender1@example.com>");
    assert_eq!(stored[0].to, "<archive@example.com>");
    assert_eq!(
        stored[0].received.as_deref(),
        Some("2024-05-06T08:00:00+00:00")
    );
    assert_eq!(stored[0].content.as_deref(), Some("Body of message 1"));
}

#[tokio::test]
async fn batch_takes_newest_messages() {
    let mut source = FakeSource::with_messages((1..=20).map(plain).collect());
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 5).await.unwrap();

    assert_eq!(source.requested, SequenceRange::new(15, 20));
    assert_eq!(report.range, SequenceRange::new(15, 20));
    assert_eq!(report.processed, 6);
    let first = store.messages().await.unwrap().remove(0);
    assert_eq!(first.subject, "message 15");
}

#[tokio::test]
async fn unknown_encoding_skips_only_that_message() {
    let mut mailbox: Vec<String> = (1..=5).map(plain).collect();
    mailbox[2] = "From: odd@example.com\r\n\
                  To: archive@example.com\r\n\
                  Subject: koi8\r\n\
                  Content-Type: text/plain; charset=koi8-r\r\n\
                  \r\n\
                  privet\r\n"
        .to_string();
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.skipped_messages, 1);
    assert_eq!(store.message_count().await.unwrap(), 4);
    let stored = store.messages().await.unwrap();
    assert!(stored.iter().all(|m| m.subject != "koi8"));
}

#[tokio::test]
async fn unknown_transfer_encoding_skips_message() {
    let mut mailbox: Vec<String> = (1..=2).map(plain).collect();
    mailbox.push(
        "From: odd@example.com\r\n\
         Content-Transfer-Encoding: x-uuencode\r\n\
         \r\n\
         begin 644 file\r\n"
            .to_string(),
    );
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();
    assert_eq!(report.skipped_messages, 1);
    assert_eq!(store.message_count().await.unwrap(), 2);
}

#[tokio::test]
async fn missing_sender_halts_before_insert() {
    let mailbox = vec![
        plain(1),
        "To: archive@example.com\r\nSubject: anonymous\r\n\r\nwho sent this?\r\n".to_string(),
        plain(3),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let aborted = run(&mut source, &store, 10).await.unwrap_err();

    assert!(matches!(
        aborted.cause,
        IngestError::MissingSender { uid: Some(1002) }
    ));
    assert_eq!(aborted.processed, 1);
    assert_eq!(store.message_count().await.unwrap(), 1);
}

#[tokio::test]
async fn malformed_message_halts_run() {
    let mailbox = vec![
        "this is not a header\r\nnor is this\r\n\r\nbody\r\n".to_string(),
        plain(2),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let aborted = run(&mut source, &store, 10).await.unwrap_err();

    assert!(matches!(aborted.cause, IngestError::Malformed { .. }));
    assert_eq!(aborted.processed, 0);
    assert_eq!(store.message_count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_recipient_warns_once() {
    let mailbox = vec![
        "From: sender@example.com\r\nSubject: no to\r\n\r\nhello\r\n".to_string(),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.missing_recipients, 1);
    let stored = store.messages().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].to, "");
    assert!(stored[0].received.is_none());
}

#[tokio::test]
async fn text_is_null_stripped_and_trimmed() {
    let mailbox = vec![
        "From: sender@example.com\r\n\
         To: archive@example.com\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         \r\n   He\0llo,\0 world.  \r\n\r\n"
            .to_string(),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    run(&mut source, &store, 10).await.unwrap();

    let stored = store.messages().await.unwrap();
    assert_eq!(stored[0].content.as_deref(), Some("Hello, world."));
}

#[tokio::test]
async fn empty_text_leaves_body_unset() {
    let mailbox = vec![
        "From: sender@example.com\r\nTo: archive@example.com\r\n\r\n \0 \r\n\r\n".to_string(),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.rejected_texts, 1);
    let stored = store.messages().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].content.is_none());
}

#[tokio::test]
async fn invalid_text_keeps_header_row() {
    let mut raw = b"From: sender@example.com\r\n\
                    To: archive@example.com\r\n\
                    Subject: broken text\r\n\
                    Content-Type: text/plain; charset=utf-8\r\n\
                    Content-Transfer-Encoding: 8bit\r\n\
                    \r\n"
        .to_vec();
    raw.extend_from_slice(b"caf\xe9 \xff\xfe\r\n");

    let mut source = FakeSource {
        mailbox: vec![raw],
        ..FakeSource::default()
    };
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.rejected_texts, 1);
    assert_eq!(report.processed, 1);
    let stored = store.messages().await.unwrap();
    assert_eq!(stored[0].subject, "broken text");
    assert!(stored[0].content.is_none());
}

#[tokio::test]
async fn multipart_text_and_attachments() {
    let mailbox = vec![
        "From: \"Sender Name\" <sender@example.com>\r\n\
         To: archive@example.com\r\n\
         Subject: report\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
         \r\n\
         preamble\r\n\
         --outer\r\n\
         Content-Type: multipart/alternative; boundary=inner\r\n\
         \r\n\
         --inner\r\n\
         Content-Type: text/plain; charset=iso-8859-1\r\n\
         Content-Transfer-Encoding: quoted-printable\r\n\
         \r\n\
         Caf=E9 report\r\n\
         --inner\r\n\
         Content-Type: text/html\r\n\
         \r\n\
         <p>report</p>\r\n\
         --inner--\r\n\
         --outer\r\n\
         Content-Type: application/octet-stream\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         AAECAwQ=\r\n\
         --outer\r\n\
         Content-Type: text/csv; name=\"data.csv\"\r\n\
         Content-Disposition: attachment; filename=\"data.csv\"\r\n\
         \r\n\
         a,b\r\n\
         --outer--\r\n"
            .to_string(),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.attachments, 2);
    let stored = store.messages().await.unwrap();
    assert_eq!(stored[0].from, "\"Sender Name\" <sender@example.com>");
    assert_eq!(
        stored[0].content.as_deref(),
        Some("Café report\n\n<p>report</p>")
    );

    let attachments = store.attachments(stored[0].id).await.unwrap();
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].filename, "");
    assert_eq!(attachments[0].data, vec![0, 1, 2, 3, 4]);
    assert_eq!(attachments[0].email_id, stored[0].id);
    assert_eq!(attachments[1].filename, "data.csv");
    assert_eq!(attachments[1].data, b"a,b".to_vec());
}

#[tokio::test]
async fn unreadable_part_is_skipped() {
    let mailbox = vec![
        "From: sender@example.com\r\n\
         To: archive@example.com\r\n\
         Content-Type: multipart/mixed; boundary=b\r\n\
         \r\n\
         --b\r\n\
         Content-Type: text/plain; charset=x-unknown\r\n\
         \r\n\
         ???\r\n\
         --b\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         readable\r\n\
         --b--\r\n"
            .to_string(),
    ];
    let mut source = FakeSource::with_messages(mailbox);
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.skipped_parts, 1);
    let stored = store.messages().await.unwrap();
    assert_eq!(stored[0].content.as_deref(), Some("readable"));
}

#[tokio::test]
async fn terminal_fetch_error_reported_after_batch() {
    let mut source = FakeSource::with_messages((1..=3).map(plain).collect());
    source.terminal = Some(SourceError::MissingBody {
        seq: 4,
        uid: Some(1004),
    });
    let store = MailStore::in_memory().await.unwrap();

    let aborted = run(&mut source, &store, 10).await.unwrap_err();

    assert!(matches!(
        aborted.cause,
        IngestError::FetchStream(SourceError::MissingBody { seq: 4, .. })
    ));
    assert_eq!(aborted.processed, 3);
    assert_eq!(store.message_count().await.unwrap(), 3);
}

#[tokio::test]
async fn connection_failure_is_fatal() {
    let mut source = FakeSource {
        refuse_select: true,
        ..FakeSource::default()
    };
    let store = MailStore::in_memory().await.unwrap();

    let aborted = run(&mut source, &store, 10).await.unwrap_err();
    assert!(matches!(aborted.cause, IngestError::Connection(_)));
    assert_eq!(source.requested, None);
}

#[tokio::test]
async fn empty_folder_fetches_nothing() {
    let mut source = FakeSource::default();
    let store = MailStore::in_memory().await.unwrap();

    let report = run(&mut source, &store, 10).await.unwrap();

    assert_eq!(report.range, None);
    assert_eq!(source.requested, None);
    assert_eq!(store.message_count().await.unwrap(), 0);
}

#[tokio::test]
async fn store_failure_is_fatal() {
    let mut source = FakeSource::with_messages(vec![plain(1)]);

    let aborted = IngestionPipeline::new(&mut source, &BrokenSink, 100)
        .run("INBOX", 10)
        .await
        .unwrap_err();

    assert!(matches!(aborted.cause, IngestError::Persistence(_)));
    assert_eq!(aborted.processed, 0);
}

#[tokio::test]
async fn source_can_log_out_after_run() {
    let mut source = FakeSource::with_messages(vec![plain(1)]);
    let store = MailStore::in_memory().await.unwrap();

    run(&mut source, &store, 10).await.unwrap();
    source.logout().await.unwrap();
    assert!(source.logged_out);
}

#[tokio::test]
async fn garbled_fetch_response_aborts_run() {
    let first = plain(1);
    let mock = Builder::new()
        .read(b"* OK IMAP4rev1 ready\r\n")
        .write(b"A0000 LOGIN archiver secret\r\n")
        .read(b"A0000 OK Logged in\r\n")
        .write(b"A0001 LIST \"\" *\r\n")
        .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
        .read(b"A0001 OK LIST completed\r\n")
        .write(b"A0002 EXAMINE INBOX\r\n")
        .read(b"* 2 EXISTS\r\n")
        .read(b"A0002 OK [READ-ONLY] done\r\n")
        .write(b"A0003 FETCH 1:2 (UID BODY.PEEK[])\r\n")
        .read(format!("* 1 FETCH (UID 1 BODY[] {{{}}}\r\n{first})\r\n", first.len()).as_bytes())
        .read(b"* 2 FETCH (UID x2 BODY[] {5}\r\nhello)\r\n")
        .build();
    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("archiver", "secret")
        .await
        .unwrap();
    let mut source = ImapSource::new(client, 4);
    let store = MailStore::in_memory().await.unwrap();

    let aborted = IngestionPipeline::new(&mut source, &store, 100)
        .run("INBOX", 10)
        .await
        .unwrap_err();

    assert!(matches!(
        aborted.cause,
        IngestError::FetchStream(SourceError::Imap(mailvault_imap::Error::Parse { .. }))
    ));
    assert_eq!(aborted.processed, 1);
    assert_eq!(store.message_count().await.unwrap(), 1);

    // Nothing left to say on a connection stuck mid-FETCH.
    source.logout().await.unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_fetched_message_is_counted(
        readable in proptest::collection::vec(any::<bool>(), 1..16),
        batch_size in 1u32..20,
    ) {
        let mailbox: Vec<String> = readable
            .iter()
            .enumerate()
            .map(|(i, &ok)| if ok { plain(i + 1) } else { koi8(i + 1) })
            .collect();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (report, stored) = runtime.block_on(async {
            let mut source = FakeSource::with_messages(mailbox);
            let store = MailStore::in_memory().await.unwrap();
            let report = run(&mut source, &store, batch_size).await.unwrap();
            (report, store.message_count().await.unwrap())
        });

        let range = report.range.unwrap();
        let in_range = &readable[range.start() as usize - 1..range.end() as usize];
        let expected = in_range.iter().filter(|&&ok| ok).count();

        prop_assert_eq!(report.handled(), range.len() as usize);
        prop_assert_eq!(report.processed, expected);
        prop_assert_eq!(report.skipped_messages, in_range.len() - expected);
        prop_assert_eq!(usize::try_from(stored).unwrap(), expected);
    }
}

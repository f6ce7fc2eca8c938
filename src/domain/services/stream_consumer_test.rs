use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::consume;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendRef;
use crate::domain::models::ChatError;
use crate::domain::models::Event;
use crate::domain::models::ExchangeId;
use crate::domain::models::ResponseStatus;
use crate::domain::services::ScriptedBackend;

fn prompt() -> BackendPrompt {
    return BackendPrompt::new(ExchangeId::from("abc-123"), "HELLO", vec![]);
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<ResponseStatus> {
    let mut statuses = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::BackendPromptResponse(res) = event {
            assert_eq!(res.exchange_id, ExchangeId::from("abc-123"));
            statuses.push(res.status);
        }
    }

    return statuses;
}

#[tokio::test]
async fn it_forwards_fragments_in_order_then_done() -> Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend::replying(&[
        "Hi",
        "! How",
        "",
        " can I help?",
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    consume(backend, prompt(), CancellationToken::new(), tx).await?;

    assert_eq!(
        drain(&mut rx),
        vec![
            ResponseStatus::Fragment("Hi".to_string()),
            ResponseStatus::Fragment("! How".to_string()),
            ResponseStatus::Fragment(" can I help?".to_string()),
            ResponseStatus::Done,
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_reports_a_request_failure() -> Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend {
        open_error: Some(ChatError::RequestFailed("status 500".to_string())),
        fragments: vec![],
        hang: false,
        ..ScriptedBackend::default()
    });
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    consume(backend, prompt(), CancellationToken::new(), tx).await?;

    assert_eq!(
        drain(&mut rx),
        vec![ResponseStatus::Failed(ChatError::RequestFailed(
            "status 500".to_string()
        ))]
    );

    return Ok(());
}

#[tokio::test]
async fn it_stops_at_the_first_stream_error() -> Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend {
        open_error: None,
        fragments: vec![
            Ok("Hi".to_string()),
            Err(ChatError::StreamInterrupted("bad chunk".to_string())),
            Ok("never".to_string()),
        ],
        hang: false,
        ..ScriptedBackend::default()
    });
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    consume(backend, prompt(), CancellationToken::new(), tx).await?;

    assert_eq!(
        drain(&mut rx),
        vec![
            ResponseStatus::Fragment("Hi".to_string()),
            ResponseStatus::Failed(ChatError::StreamInterrupted("bad chunk".to_string())),
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_cancels_before_the_request_opens() -> Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend::replying(&["Hi"]));
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let cancel = CancellationToken::new();
    cancel.cancel();

    consume(backend, prompt(), cancel, tx).await?;

    assert_eq!(drain(&mut rx), vec![ResponseStatus::Cancelled]);

    return Ok(());
}

#[tokio::test]
async fn it_cancels_mid_stream() -> Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend {
        open_error: None,
        fragments: vec![Ok("Hi".to_string())],
        hang: true,
        ..ScriptedBackend::default()
    });
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(consume(backend, prompt(), cancel.clone(), tx));
    let first = rx.recv().await;
    assert!(matches!(
        first,
        Some(Event::BackendPromptResponse(res)) if res.status == ResponseStatus::Fragment("Hi".to_string())
    ));

    cancel.cancel();
    handle.await??;

    assert_eq!(drain(&mut rx), vec![ResponseStatus::Cancelled]);

    return Ok(());
}

#[tokio::test]
async fn it_always_settles_when_the_worker_is_dropped() -> Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend {
        open_error: None,
        fragments: vec![Ok("Hi".to_string())],
        hang: true,
        ..ScriptedBackend::default()
    });
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let handle = tokio::spawn(consume(backend, prompt(), CancellationToken::new(), tx));
    rx.recv().await;
    handle.abort();
    assert!(handle.await.is_err());

    let statuses = drain(&mut rx);
    assert_eq!(statuses.len(), 1);
    assert!(matches!(
        statuses[0],
        ResponseStatus::Failed(ChatError::StreamInterrupted(_))
    ));

    return Ok(());
}

use anyhow::Result;
use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;
use test_utils::sse_body;
use test_utils::sse_chunk;

use super::model_name;
use super::parse_stream_line;
use super::Gemini;
use super::Model;
use super::ModelListResponse;
use crate::configuration::Config;
use crate::domain::models::Backend;
use crate::domain::models::BackendPrompt;
use crate::domain::models::ChatError;
use crate::domain::models::Exchange;
use crate::domain::models::ExchangeId;
use crate::domain::models::GenerationConfig;
use crate::domain::models::SafetySetting;

impl Gemini {
    fn with_url(url: String) -> Gemini {
        return Gemini {
            url,
            token: "abc".to_string(),
            timeout: "200".to_string(),
            generation: GenerationConfig::default(),
            safety: SafetySetting::parse(Config::default).unwrap(),
            system_prompt: "".to_string(),
        };
    }
}

fn health_check_path() -> Matcher {
    return Matcher::Regex(r"^/v1beta/models/[\w.-]+\?key=abc$".to_string());
}

fn stream_path() -> Matcher {
    return Matcher::Regex(
        r"^/v1beta/models/[\w.-]+:streamGenerateContent\?alt=sse&key=abc$".to_string(),
    );
}

fn settled_exchange(user_text: &str, assistant_text: &str) -> Exchange {
    let mut exchange = Exchange::new(ExchangeId::generate(), user_text);
    exchange.fold(assistant_text);
    exchange.complete();
    return exchange;
}

async fn collect(backend: &Gemini, prompt: &BackendPrompt) -> Vec<Result<String, ChatError>> {
    return match backend.stream_completion(prompt).await {
        Ok(stream) => stream.collect::<Vec<Result<String, ChatError>>>().await,
        Err(err) => vec![Err(err)],
    };
}

#[tokio::test]
async fn it_successfully_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", health_check_path())
        .with_status(200)
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn it_fails_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", health_check_path())
        .with_status(500)
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn it_fails_health_checks_without_a_token() {
    let mut backend = Gemini::with_url("http://localhost".to_string());
    backend.token = "".to_string();

    let res = backend.health_check().await;
    assert_eq!(res.unwrap_err().to_string(), "Gemini token is not defined");
}

#[tokio::test]
async fn it_lists_models() -> Result<()> {
    let body = serde_json::to_string(&ModelListResponse {
        models: vec![
            Model {
                name: "models/second".to_string(),
                supported_generation_methods: vec!["generateContent".to_string()],
            },
            Model {
                name: "models/embedding".to_string(),
                supported_generation_methods: vec!["embedContent".to_string()],
            },
            Model {
                name: "models/first".to_string(),
                supported_generation_methods: vec![
                    "generateContent".to_string(),
                    "countTokens".to_string(),
                ],
            },
        ],
    })?;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1beta/models?key=abc")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let res = backend.list_models().await?;
    mock.assert_async().await;

    assert_eq!(res, vec!["first".to_string(), "second".to_string()]);

    return Ok(());
}

#[tokio::test]
async fn it_fails_to_list_models_with_a_bad_key() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1beta/models?key=abc")
        .with_status(400)
        .with_body(r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#)
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let res = backend.list_models().await;

    assert_eq!(
        res.unwrap_err().to_string(),
        "Failed to list Gemini models, 400: API key not valid."
    );

    return Ok(());
}

#[tokio::test]
async fn it_streams_completions() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", stream_path())
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&["Hello ", "World", "!\nBye"]))
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let prompt = BackendPrompt::new(ExchangeId::from("abc-123"), "Say hi to the world", vec![]);
    let fragments = collect(&backend, &prompt).await;
    mock.assert_async().await;

    assert_eq!(
        fragments,
        vec![
            Ok("Hello ".to_string()),
            Ok("World".to_string()),
            Ok("!\nBye".to_string()),
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_sends_history_and_config() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", stream_path())
        .match_body(Matcher::PartialJson(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "A"}]},
                {"role": "model", "parts": [{"text": "Reply A"}]},
                {"role": "user", "parts": [{"text": "B"}]},
            ],
            "systemInstruction": {"parts": [{"text": "Be brief."}]},
            "generationConfig": {"topK": 64, "maxOutputTokens": 8192},
        })))
        .with_status(200)
        .with_body(sse_body(&["Reply B"]))
        .create_async()
        .await;

    let mut backend = Gemini::with_url(server.url());
    backend.system_prompt = "Be brief.".to_string();
    let prompt = BackendPrompt::new(
        ExchangeId::from("abc-123"),
        "B",
        vec![settled_exchange("A", "Reply A")],
    );
    let fragments = collect(&backend, &prompt).await;
    mock.assert_async().await;

    assert_eq!(fragments, vec![Ok("Reply B".to_string())]);

    return Ok(());
}

#[tokio::test]
async fn it_maps_error_statuses_to_request_failures() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", stream_path())
        .with_status(429)
        .with_body(r#"{"error": {"code": 429, "message": "Resource has been exhausted.", "status": "RESOURCE_EXHAUSTED"}}"#)
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let prompt = BackendPrompt::new(ExchangeId::from("abc-123"), "HELLO", vec![]);

    assert_eq!(
        collect(&backend, &prompt).await,
        vec![Err(ChatError::RequestFailed(
            "Gemini returned 429: Resource has been exhausted.".to_string()
        ))]
    );

    return Ok(());
}

#[tokio::test]
async fn it_ends_the_stream_on_an_undecodable_chunk() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", stream_path())
        .with_status(200)
        .with_body(format!("{}\r\n\r\ndata: {{not json\r\n\r\n", sse_chunk("Hi")))
        .create_async()
        .await;

    let backend = Gemini::with_url(server.url());
    let prompt = BackendPrompt::new(ExchangeId::from("abc-123"), "HELLO", vec![]);
    let fragments = collect(&backend, &prompt).await;

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0], Ok("Hi".to_string()));
    assert!(matches!(
        fragments[1],
        Err(ChatError::StreamInterrupted(_))
    ));

    return Ok(());
}

#[test]
fn it_serializes_the_request_body() {
    let backend = Gemini::with_url("http://localhost".to_string());
    let prompt = BackendPrompt::new(ExchangeId::from("abc-123"), "HELLO", vec![]);
    let body = serde_json::to_value(backend.completion_request(&prompt)).unwrap();

    assert_eq!(
        body,
        json!({
            "contents": [{"role": "user", "parts": [{"text": "HELLO"}]}],
            "generationConfig": {
                "temperature": 1.0,
                "topP": 0.95_f32,
                "topK": 64,
                "maxOutputTokens": 8192,
                "responseMimeType": "text/plain",
            },
            "safetySettings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
                {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
                {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
                {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE"},
            ],
        })
    );
}

#[test]
fn it_strips_the_models_prefix_from_model_names() {
    assert_eq!(model_name("models/gemini-1.5-flash"), "gemini-1.5-flash");
    assert_eq!(model_name("gemini-1.5-flash"), "gemini-1.5-flash");
    assert_eq!(model_name(" gemini-1.5-pro\n"), "gemini-1.5-pro");
}

mod parse_stream_line {
    use super::*;

    #[test]
    fn it_reads_a_text_chunk() {
        assert_eq!(
            parse_stream_line(&sse_chunk("Hi! How")),
            Ok(Some("Hi! How".to_string()))
        );
    }

    #[test]
    fn it_joins_multiple_parts() {
        let line = r#"data: {"candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}], "role": "model"}}]}"#;
        assert_eq!(parse_stream_line(line), Ok(Some("Hello".to_string())));
    }

    #[test]
    fn it_skips_blank_and_keep_alive_lines() {
        assert_eq!(parse_stream_line(""), Ok(None));
        assert_eq!(parse_stream_line("\r"), Ok(None));
        assert_eq!(parse_stream_line(": keep-alive"), Ok(None));
        assert_eq!(parse_stream_line("event: message"), Ok(None));
    }

    #[test]
    fn it_skips_a_final_chunk_without_text() {
        let line = r#"data: {"candidates": [{"finishReason": "STOP", "index": 0}], "usageMetadata": {"totalTokenCount": 12}}"#;
        assert_eq!(parse_stream_line(line), Ok(None));
    }

    #[test]
    fn it_fails_on_a_blocked_prompt() {
        let line = r#"data: {"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert_eq!(
            parse_stream_line(line),
            Err(ChatError::RequestFailed(
                "prompt was blocked by Gemini (SAFETY)".to_string()
            ))
        );
    }

    #[test]
    fn it_fails_on_a_reply_stopped_for_safety() {
        let line = r#"data: {"candidates": [{"finishReason": "SAFETY", "index": 0}]}"#;
        assert!(matches!(
            parse_stream_line(line),
            Err(ChatError::StreamInterrupted(_))
        ));
    }

    #[test]
    fn it_fails_on_an_error_payload() {
        let line = r#"data: {"error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}}"#;
        assert_eq!(
            parse_stream_line(line),
            Err(ChatError::StreamInterrupted(
                "Gemini returned 500: Internal error".to_string()
            ))
        );
    }

    #[test]
    fn it_fails_on_undecodable_json() {
        assert!(matches!(
            parse_stream_line("data: {oops"),
            Err(ChatError::StreamInterrupted(_))
        ));
    }
}

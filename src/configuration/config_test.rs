use anyhow::Result;

use super::Config;
use super::ConfigKey;
use crate::application::cli;

#[test]
fn it_serializes_to_valid_toml() {
    let res = Config::serialize_default(cli::build());
    let toml_res = res.parse::<toml_edit::Document>();
    assert!(toml_res.is_ok());

    let doc = toml_res.unwrap();
    let get = |key: &str| return doc.get(key).cloned();
    assert_eq!(
        get("model").and_then(|e| return e.as_str().map(String::from)),
        Some("gemini-1.5-flash-latest".to_string())
    );
    assert_eq!(get("top-k").and_then(|e| return e.as_integer()), Some(64));
    assert_eq!(get("top-p").and_then(|e| return e.as_float()), Some(0.95));
    assert_eq!(
        get("safety-harassment").and_then(|e| return e.as_str().map(String::from)),
        Some("BLOCK_MEDIUM_AND_ABOVE".to_string())
    );
    assert!(doc.get("config-file").is_none());
    assert!(doc.get("gemini-token").is_none());
}

#[test]
fn it_documents_possible_values() {
    let res = Config::serialize_default(cli::build());
    assert!(res.contains(
        "[possible values: BLOCK_NONE, BLOCK_ONLY_HIGH, BLOCK_MEDIUM_AND_ABOVE, BLOCK_LOW_AND_ABOVE]"
    ));
}

#[test]
fn it_has_a_default_for_every_generation_key() {
    for key in [
        ConfigKey::Temperature,
        ConfigKey::TopP,
        ConfigKey::TopK,
        ConfigKey::MaxOutputTokens,
        ConfigKey::ResponseMimeType,
    ] {
        assert!(!Config::default(key).is_empty(), "{key} has no default");
    }
}

#[test]
fn it_rejects_invalid_enum_values_from_toml() {
    let res = Config::apply_toml(&cli::build(), "safety-hate-speech = \"BLOCK_ALL\"");
    assert!(res.is_err());
}

#[test]
fn it_rejects_unsupported_value_types_from_toml() {
    let res = Config::apply_toml(&cli::build(), "model = [\"a\", \"b\"]");
    assert!(res.is_err());
}

#[tokio::test]
async fn it_loads_config_from_file() -> Result<()> {
    let matches = cli::build().try_get_matches_from(vec![
        "gemchat",
        "chat",
        "-c",
        "./config.example.toml",
    ])?;
    Config::load(cli::build(), vec![&matches]).await?;
    return Ok(());
}

#[tokio::test]
async fn it_fails_to_loads_config_from_file() -> Result<()> {
    let matches = cli::build().try_get_matches_from(vec![
        "gemchat",
        "chat",
        "-c",
        "./test/bad-config.toml",
    ])?;
    let res = Config::load(cli::build(), vec![&matches]).await;
    assert!(res.is_err());
    return Ok(());
}

use anyhow::Result;
use strum::IntoEnumIterator;

use super::build;
use crate::configuration::ConfigKey;

#[test]
fn it_builds_a_valid_command() {
    build().debug_assert();
}

#[test]
fn it_has_a_flag_for_every_config_key() {
    let cmd = build();
    for key in ConfigKey::iter() {
        if key == ConfigKey::Username {
            continue;
        }

        assert!(
            cmd.get_arguments()
                .any(|arg| return arg.get_long() == Some(key.to_string().as_str())),
            "{key} has no flag"
        );
    }
}

#[test]
fn it_accepts_global_flags_after_chat() -> Result<()> {
    let matches = build().try_get_matches_from(vec![
        "gemchat",
        "chat",
        "--model",
        "gemini-1.0-pro",
        "--safety-harassment",
        "BLOCK_NONE",
    ])?;
    let (name, chat_matches) = matches.subcommand().unwrap();

    assert_eq!(name, "chat");
    assert_eq!(
        chat_matches.get_one::<String>("model"),
        Some(&"gemini-1.0-pro".to_string())
    );
    assert_eq!(
        chat_matches.get_one::<String>("safety-harassment"),
        Some(&"BLOCK_NONE".to_string())
    );

    return Ok(());
}

#[test]
fn it_rejects_an_unknown_safety_threshold() {
    let res = build().try_get_matches_from(vec![
        "gemchat",
        "--safety-hate-speech",
        "BLOCK_EVERYTHING",
    ]);

    assert!(res.is_err());
}

#[test]
fn it_requires_a_file_to_validate() {
    let res = build().try_get_matches_from(vec!["gemchat", "debug", "validate-messages"]);
    assert!(res.is_err());
}

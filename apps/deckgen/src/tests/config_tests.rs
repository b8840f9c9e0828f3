use super::*;
use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_point_at_local_service() {
    let settings = Settings::default();
    assert_eq!(settings.server_url, "http://localhost:8000");
    assert_eq!(settings.provider, Provider::Auto);
    assert_eq!(settings.output_dir, PathBuf::from("./output"));
    assert_eq!(settings.export_mode, ExportMode::Client);
    assert!(settings.chrome_path.is_none());
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
server_url = "https://decks.example.com"
provider = "gemini"
output_dir = "/tmp/decks"
export_mode = "server"
chrome_path = ""
unrelated = "ignored"
"#,
    )
    .expect("valid file");

    assert_eq!(settings.server_url, "https://decks.example.com");
    assert_eq!(settings.provider, Provider::Gemini);
    assert_eq!(settings.output_dir, PathBuf::from("/tmp/decks"));
    assert_eq!(settings.export_mode, ExportMode::Server);
    assert!(settings.chrome_path.is_none());
}

#[test]
fn bad_file_values_are_reported() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, r#"provider = "claude""#).is_err());
    assert!(apply_file(&mut settings, r#"export_mode = "cloud""#).is_err());
    assert!(apply_file(&mut settings, "not toml at all =").is_err());
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("DECKGEN_SERVER_URL", "http://a:1"),
            ("APP__SERVER_URL", "http://b:2"),
            ("DECKGEN_PROVIDER", "Qwen"),
            ("DECKGEN_API_KEY", "sk-test"),
            ("DECKGEN_CHROME_PATH", "/usr/bin/chromium"),
            ("DECKGEN_EXPORT_MODE", "remote"),
        ]),
    )
    .expect("env");

    assert_eq!(settings.server_url, "http://b:2");
    assert_eq!(settings.provider, Provider::Qwen);
    assert_eq!(settings.api_key, "sk-test");
    assert_eq!(
        settings.chrome_path,
        Some(PathBuf::from("/usr/bin/chromium"))
    );
    assert_eq!(settings.export_mode, ExportMode::Server);
}

#[test]
fn load_settings_reads_named_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("custom.toml");
    fs::write(&path, "output_dir = \"decks\"\n").expect("write config");

    let settings = load_settings(path.to_str()).expect("load");
    if std::env::var("DECKGEN_OUTPUT_DIR").is_err() {
        assert_eq!(settings.output_dir, PathBuf::from("decks"));
    }
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    let settings = load_settings(path.to_str()).expect("load");
    if std::env::var("DECKGEN_SERVER_URL").is_err() && std::env::var("APP__SERVER_URL").is_err() {
        assert_eq!(settings.server_url, Settings::default().server_url);
    }
}

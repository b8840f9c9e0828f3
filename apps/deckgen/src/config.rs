use std::{collections::HashMap, fmt, fs, path::PathBuf, str::FromStr};

use anyhow::{bail, Context};
use shared::domain::Provider;

pub const DEFAULT_CONFIG_FILE: &str = "deckgen.toml";

/// Where PDF rendering happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Rasterize locally with headless Chrome.
    #[default]
    Client,
    /// Ask the generation service to render the PDF.
    Server,
}

impl ExportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportMode::Client => "client",
            ExportMode::Server => "server",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" | "local" => Ok(ExportMode::Client),
            "server" | "remote" => Ok(ExportMode::Server),
            other => bail!("unknown export mode '{other}', expected client or server"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub provider: Provider,
    pub api_key: String,
    pub output_dir: PathBuf,
    pub export_mode: ExportMode,
    pub chrome_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            provider: Provider::Auto,
            api_key: String::new(),
            output_dir: PathBuf::from("./output"),
            export_mode: ExportMode::Client,
            chrome_path: None,
        }
    }
}

/// Reads `path` (if present) and then the process environment.
pub fn load_settings(path: Option<&str>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw).with_context(|| format!("invalid config file {path}"))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

/// Flat `key = "value"` pairs; unknown keys are ignored.
pub fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: HashMap<String, String> = toml::from_str(raw)?;

    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("provider") {
        settings.provider = parse_provider(v)?;
    }
    if let Some(v) = file_cfg.get("api_key") {
        settings.api_key = v.clone();
    }
    if let Some(v) = file_cfg.get("output_dir") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("export_mode") {
        settings.export_mode = v.parse()?;
    }
    if let Some(v) = file_cfg.get("chrome_path") {
        settings.chrome_path = non_empty_path(v);
    }
    Ok(())
}

pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DECKGEN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("DECKGEN_PROVIDER") {
        settings.provider = parse_provider(&v)?;
    }
    if let Some(v) = lookup("DECKGEN_API_KEY") {
        settings.api_key = v;
    }
    if let Some(v) = lookup("DECKGEN_OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("DECKGEN_EXPORT_MODE") {
        settings.export_mode = v.parse()?;
    }
    if let Some(v) = lookup("DECKGEN_CHROME_PATH") {
        settings.chrome_path = non_empty_path(&v);
    }
    Ok(())
}

pub fn parse_provider(value: &str) -> anyhow::Result<Provider> {
    value
        .parse::<Provider>()
        .map_err(|_| anyhow::anyhow!("unknown provider '{value}', expected auto, qwen or gemini"))
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

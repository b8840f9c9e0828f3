use std::path::{Path, PathBuf};

use anyhow::Context;
use client_core::SessionState;
use serde::{Deserialize, Serialize};
use shared::domain::{FinalSlide, Outline};
use slide_export::sanitize_filename;

/// A finished (or partial) run as written to disk, enough to export it again
/// later without the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDeck {
    pub title: String,
    #[serde(default)]
    pub outline: Option<Outline>,
    #[serde(default)]
    pub slides: Vec<FinalSlide>,
}

impl SavedDeck {
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            title: state.title().unwrap_or_default().to_string(),
            outline: state.outline.clone(),
            slides: state.slides.clone(),
        }
    }
}

pub async fn save_deck(dir: &Path, deck: &SavedDeck) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join(format!("{}.json", sanitize_filename(&deck.title)));
    let raw = serde_json::to_vec_pretty(deck)?;
    tokio::fs::write(&path, raw)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub async fn load_deck(path: &Path) -> anyhow::Result<SavedDeck> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("{} is not a saved deck", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saved_deck_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let deck = SavedDeck {
            title: "Q3: Plan?".to_string(),
            outline: None,
            slides: Vec::new(),
        };

        let path = save_deck(&dir.path().join("nested"), &deck)
            .await
            .expect("save");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("Q3_ Plan_.json"));
        assert_eq!(load_deck(&path).await.expect("load"), deck);
    }

    #[tokio::test]
    async fn rejects_unrelated_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("other.json");
        std::fs::write(&path, br#"{"hello": 1}"#).expect("write");
        assert!(load_deck(&path).await.is_err());
    }
}

use crate::blob::LocalFile;
use crate::config::{load_config, Config};
use crate::identity::Actor;
use crate::riddle::{ContentDraft, HintDraft, MediaKind, MediaRef, RiddleDraft};
use tempfile::TempDir;

/// Check if a test is enabled via environment variable
fn is_test_enabled(env_var: &str) -> bool {
    std::env::var(env_var)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Check if S3 tests are enabled via environment variable
pub fn is_s3_enabled() -> bool {
    is_test_enabled("ENABLE_S3_TESTS")
}

/// Load test configuration from config.toml
pub fn load_test_config() -> Result<Config, anyhow::Error> {
    let config_path = "config.toml";
    load_config(config_path).map_err(|e| anyhow::anyhow!("Failed to load config.toml: {}", e))
}

/// Write a file of `size` bytes into `dir` and return it as a media file
pub fn media_file(dir: &TempDir, name: &str, size: usize) -> LocalFile {
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).expect("Failed to write test media file");
    LocalFile::new(path)
}

pub fn test_actor() -> Actor {
    Actor::new("editor-1").with_display_name("Test Editor")
}

pub fn text_hint(local_id: &str, text: &str) -> HintDraft {
    HintDraft::new(local_id, ContentDraft::text(text))
}

pub fn media_hint(local_id: &str, kind: MediaKind, file: &LocalFile) -> HintDraft {
    HintDraft::new(
        local_id,
        ContentDraft::media(kind, MediaRef::Pending(file.clone())),
    )
}

/// A riddle draft with a text success message
pub fn riddle_draft(riddle_image: Option<LocalFile>, hints: Vec<HintDraft>) -> RiddleDraft {
    RiddleDraft {
        name: "The Sphinx".to_string(),
        answer: "man".to_string(),
        riddle_image: riddle_image.map(MediaRef::Pending),
        success_message: ContentDraft::text("Well done!"),
        hints,
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/rag.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_store_batch_size")]
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            batch_size: default_store_batch_size(),
        }
    }
}

fn default_store_path() -> PathBuf {
    home_path(".openclaw/data/rag/knowledge.sqlite")
}
fn default_collection() -> String {
    "openclaw_knowledge".to_string()
}
fn default_store_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_workspace_max_chars")]
    pub workspace_max_chars: usize,
    #[serde(default = "default_skill_max_chars")]
    pub skill_max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            workspace_max_chars: default_workspace_max_chars(),
            skill_max_chars: default_skill_max_chars(),
        }
    }
}

fn default_workspace_max_chars() -> usize {
    4000
}
fn default_skill_max_chars() -> usize {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            max_file_bytes: default_max_file_bytes(),
            follow_symlinks: false,
        }
    }
}

fn default_workspace_root() -> PathBuf {
    home_path(".openclaw/workspace")
}

fn default_include_globs() -> Vec<String> {
    ["md", "py", "js", "ts", "json", "yaml", "yml", "txt", "sh", "html", "css"]
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect()
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct SkillsConfig {
    #[serde(default = "default_skill_dirs")]
    pub dirs: Vec<PathBuf>,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dirs: default_skill_dirs(),
        }
    }
}

fn default_skill_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/lib/node_modules/openclaw/skills"),
        home_path(".openclaw/workspace/skills"),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    #[serde(default = "default_sessions_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_session_batch_size")]
    pub batch_size: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: default_sessions_dir(),
            window: default_window(),
            overlap: default_overlap(),
            batch_size: default_session_batch_size(),
        }
    }
}

fn default_sessions_dir() -> PathBuf {
    home_path(".openclaw/agents/main/sessions")
}
fn default_window() -> usize {
    20
}
fn default_overlap() -> usize {
    5
}
fn default_session_batch_size() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    #[serde(default = "default_context_results")]
    pub context_results: usize,
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
            context_results: default_context_results(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

fn default_n_results() -> usize {
    10
}
fn default_context_results() -> usize {
    5
}
fn default_min_query_chars() -> usize {
    3
}

/// Resolve a path relative to the user's home directory.
fn home_path(rel: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(rel)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

impl Config {
    fn expand_paths(&mut self) {
        self.store.path = expand_tilde(&self.store.path);
        self.workspace.root = expand_tilde(&self.workspace.root);
        self.sessions.dir = expand_tilde(&self.sessions.dir);
        for dir in &mut self.skills.dirs {
            *dir = expand_tilde(dir);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.store.collection.trim().is_empty() {
            anyhow::bail!("store.collection must not be empty");
        }
        if self.chunking.workspace_max_chars == 0 || self.chunking.skill_max_chars == 0 {
            anyhow::bail!("chunking limits must be > 0");
        }
        if self.sessions.window <= self.sessions.overlap {
            anyhow::bail!(
                "sessions.window ({}) must be greater than sessions.overlap ({})",
                self.sessions.window,
                self.sessions.overlap
            );
        }
        if self.retrieval.n_results == 0 || self.retrieval.context_results == 0 {
            anyhow::bail!("retrieval result counts must be >= 1");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config.expand_paths();
    config.validate()?;
    Ok(config)
}

/// Load the given config file, or fall back to [`DEFAULT_CONFIG_PATH`] and
/// then to built-in defaults when no path was given.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("rag.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write_config(&tmp, "")).unwrap();
        assert_eq!(cfg.store.collection, "openclaw_knowledge");
        assert_eq!(cfg.chunking.workspace_max_chars, 4000);
        assert_eq!(cfg.chunking.skill_max_chars, 3000);
        assert_eq!(cfg.sessions.window, 20);
        assert_eq!(cfg.sessions.overlap, 5);
        assert_eq!(cfg.workspace.max_file_bytes, 1024 * 1024);
        assert!(cfg.workspace.include_globs.contains(&"**/*.md".to_string()));
    }

    #[test]
    fn test_partial_sections() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&write_config(
            &tmp,
            "[store]\ncollection = \"notes\"\n\n[sessions]\nwindow = 10\noverlap = 2\n",
        ))
        .unwrap();
        assert_eq!(cfg.store.collection, "notes");
        assert_eq!(cfg.store.batch_size, 100);
        assert_eq!(cfg.sessions.window, 10);
        assert_eq!(cfg.sessions.batch_size, 50);
    }

    #[test]
    fn test_window_must_exceed_overlap() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(&write_config(&tmp, "[sessions]\nwindow = 5\noverlap = 5\n"))
            .unwrap_err();
        assert!(err.to_string().contains("sessions.window"));
    }

    #[test]
    fn test_zero_chunk_limit_rejected() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&write_config(&tmp, "[chunking]\nskill_max_chars = 0\n")).is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/a/b")), home.join("a/b"));
        }
        assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/rag.example.toml");
        let cfg = load_config(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(cfg.store.collection, defaults.store.collection);
        assert_eq!(cfg.workspace.include_globs, defaults.workspace.include_globs);
        if dirs::home_dir().is_some() {
            assert_eq!(cfg.store.path, defaults.store.path);
            assert_eq!(cfg.skills.dirs, defaults.skills.dirs);
            assert_eq!(cfg.sessions.dir, defaults.sessions.dir);
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

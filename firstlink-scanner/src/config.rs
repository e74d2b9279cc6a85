// Site configuration: where pages come from and which links count.
//
// Everything that is specific to one wiki (base URL, the random-article
// path, the article link prefix and the namespaces that never count as
// articles) lives here so another language edition or another MediaWiki
// install only needs a JSON file.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/firstlink/site.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub random_path: String,
    pub timeout_secs: u64,
    /// CSS selectors tried in order to find the article body.
    pub content_selectors: Vec<String>,
    pub title_selector: String,
    pub links: LinkRules,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://de.wikipedia.org".to_string(),
            random_path: "/wiki/Spezial:Zufällige_Seite".to_string(),
            timeout_secs: 10,
            content_selectors: vec![
                "#mw-content-text .mw-parser-output".to_string(),
                "#mw-content-text".to_string(),
            ],
            title_selector: "h1".to_string(),
            links: LinkRules::default(),
        }
    }
}

/// Which hrefs are article links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkRules {
    pub article_prefix: String,
    /// Namespace prefix -> excluded. A `false` entry re-enables a namespace
    /// without having to delete it from the file.
    pub namespaces: BTreeMap<String, bool>,
}

impl Default for LinkRules {
    fn default() -> Self {
        let namespaces = [
            "Spezial:",
            "Special:",
            "Benutzer:",
            "User:",
            "Wikipedia:",
            "File:",
            "Datei:",
            "Hilfe:",
            "Help:",
            "Kategorie:",
            "Category:",
            "Portal:",
            "Vorlage:",
            "Template:",
        ]
        .into_iter()
        .map(|prefix| (prefix.to_string(), true))
        .collect();

        Self {
            article_prefix: "/wiki/".to_string(),
            namespaces,
        }
    }
}

impl LinkRules {
    pub fn is_excluded_namespace(&self, article: &str) -> bool {
        self.namespaces
            .iter()
            .any(|(prefix, excluded)| *excluded && article.starts_with(prefix.as_str()))
    }

    /// True when `href` points at an ordinary article under the article prefix.
    pub fn is_article_link(&self, href: &str) -> bool {
        match href.strip_prefix(self.article_prefix.as_str()) {
            Some(article) => {
                !article.is_empty()
                    && !article.starts_with('#')
                    && !self.is_excluded_namespace(article)
            }
            None => false,
        }
    }
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: SiteConfig = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded site config from {}", path.display());
        Ok(config)
    }

    /// Load an explicitly given config, or the default location if a file
    /// exists there, or fall back to the built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(&expand_path(path)),
            None => {
                let default_path = expand_path(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No site config at {}, using defaults", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| ScanError::Config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;
        if self.content_selectors.is_empty() {
            return Err(ScanError::Config(
                "content_selectors must name at least one selector".to_string(),
            ));
        }
        if self.links.article_prefix.is_empty() {
            return Err(ScanError::Config("article_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_article_links() {
        let rules = LinkRules::default();
        assert!(rules.is_article_link("/wiki/Philosophie"));
        assert!(rules.is_article_link("/wiki/Foo_(Band)"));
        assert!(!rules.is_article_link("/wiki/"));
        assert!(!rules.is_article_link("/wiki/Spezial:X"));
        assert!(!rules.is_article_link("/wiki/Datei:Bild.png"));
        assert!(!rules.is_article_link("/w/index.php?title=Foo"));
        assert!(!rules.is_article_link("https://example.com/wiki/Foo"));
        assert!(!rules.is_article_link("#cite_note-1"));
    }

    #[test]
    fn test_namespace_can_be_reenabled() {
        let mut rules = LinkRules::default();
        rules.namespaces.insert("Portal:".to_string(), false);
        assert!(rules.is_article_link("/wiki/Portal:Physik"));
        assert!(!rules.is_article_link("/wiki/Vorlage:Infobox"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, r#"{{ "base_url": "https://en.wikipedia.org", "random_path": "/wiki/Special:Random" }}"#)?;

        let config = SiteConfig::load(file.path())?;
        assert_eq!(config.base_url, "https://en.wikipedia.org");
        assert_eq!(config.random_path, "/wiki/Special:Random");
        assert_eq!(config.links, LinkRules::default());
        assert_eq!(config.timeout_secs, 10);
        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_base_url() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "base_url": "not a url" }}"#).unwrap();

        let err = SiteConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SiteConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("site.json");
        let config = SiteConfig::default();

        config.write(&path).unwrap();
        assert_eq!(SiteConfig::load(&path).unwrap(), config);
    }
}

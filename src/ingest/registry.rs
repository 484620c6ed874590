// src/ingest/registry.rs
//! The ordered list of feeds to poll and where it was read from.
//!
//! Resolution order, first match wins: the file named by `$NEWS_SOURCES_PATH`
//! (missing file is an error), `config/sources.toml`, `config/sources.json`,
//! then the built-in crypto/market list. Order inside a file is kept because
//! it is the flatten order of the aggregated output.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSource;

pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";

/// Checked in order when `$NEWS_SOURCES_PATH` is unset.
const CONFIG_CANDIDATES: [&str; 2] = ["config/sources.toml", "config/sources.json"];

const BUILT_IN: &[(&str, &str)] = &[
    ("https://www.coindesk.com/arc/outboundfeeds/rss/", "CoinDesk"),
    ("https://cointelegraph.com/rss", "Cointelegraph"),
    ("https://decrypt.co/feed", "Decrypt"),
    ("https://www.theblock.co/rss.xml", "The Block"),
    ("https://bitcoinmagazine.com/.rss/full/", "Bitcoin Magazine"),
    ("https://cryptoslate.com/feed/", "CryptoSlate"),
    ("https://cryptopotato.com/feed/", "CryptoPotato"),
    ("https://www.newsbtc.com/feed/", "NewsBTC"),
    ("https://bitcoinist.com/feed/", "Bitcoinist"),
    ("https://u.today/rss", "U.Today"),
    ("https://beincrypto.com/feed/", "BeInCrypto"),
    ("https://dailyhodl.com/feed/", "The Daily Hodl"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOrigin {
    EnvPath(PathBuf),
    ConfigFile(PathBuf),
    BuiltIn,
}

impl fmt::Display for RegistryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryOrigin::EnvPath(p) => write!(f, "${ENV_SOURCES_PATH} ({})", p.display()),
            RegistryOrigin::ConfigFile(p) => write!(f, "{}", p.display()),
            RegistryOrigin::BuiltIn => f.write_str("built-in list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    origin: RegistryOrigin,
    sources: Vec<FeedSource>,
}

impl SourceRegistry {
    /// Walk the resolution order described in the module docs.
    pub fn resolve() -> Result<Self> {
        let registry = match std::env::var_os(ENV_SOURCES_PATH) {
            Some(p) => {
                let path = PathBuf::from(p);
                if !path.is_file() {
                    bail!(
                        "{ENV_SOURCES_PATH} points to {}, which is not a file",
                        path.display()
                    );
                }
                let sources = read_file(&path)?;
                Self {
                    origin: RegistryOrigin::EnvPath(path),
                    sources,
                }
            }
            None => match CONFIG_CANDIDATES.iter().map(Path::new).find(|p| p.is_file()) {
                Some(path) => Self {
                    sources: read_file(path)?,
                    origin: RegistryOrigin::ConfigFile(path.to_path_buf()),
                },
                None => Self::built_in(),
            },
        };

        if registry.sources.is_empty() {
            bail!("source registry from {} lists no usable feeds", registry.origin);
        }
        tracing::info!(
            origin = %registry.origin,
            sources = registry.sources.len(),
            "source registry loaded"
        );
        Ok(registry)
    }

    /// Read one registry file; TOML or JSON by extension, sniffed otherwise.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            sources: read_file(path)?,
            origin: RegistryOrigin::ConfigFile(path.to_path_buf()),
        })
    }

    pub fn built_in() -> Self {
        Self {
            origin: RegistryOrigin::BuiltIn,
            sources: BUILT_IN
                .iter()
                .map(|&(url, name)| FeedSource::named(url, name))
                .collect(),
        }
    }

    pub fn origin(&self) -> &RegistryOrigin {
        &self.origin
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn into_sources(self) -> Vec<FeedSource> {
        self.sources
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn detect(path: &Path, text: &str) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Format::Toml,
            Some("json") => Format::Json,
            _ => {
                let t = text.trim_start();
                if t.starts_with('{') || (t.starts_with('[') && !t.starts_with("[[")) {
                    Format::Json
                } else {
                    Format::Toml
                }
            }
        }
    }
}

/// Accepted file shapes: `{ sources = [...] }` (TOML tables or JSON object)
/// or a bare JSON array. Each entry is a url string or `{ url, name }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SourcesFile {
    Table { sources: Vec<SourceEntry> },
    List(Vec<SourceEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Url(String),
    Full { url: String, name: Option<String> },
}

fn read_file(path: &Path) -> Result<Vec<FeedSource>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading source registry {}", path.display()))?;
    decode(&text, Format::detect(path, &text))
        .with_context(|| format!("decoding source registry {}", path.display()))
}

fn decode(text: &str, format: Format) -> Result<Vec<FeedSource>> {
    let file: SourcesFile = match format {
        Format::Toml => toml::from_str(text)?,
        Format::Json => serde_json::from_str(text)?,
    };
    let entries = match file {
        SourcesFile::Table { sources } | SourcesFile::List(sources) => sources,
    };
    Ok(admit(entries))
}

/// Trim, keep http(s) urls only, first occurrence of a url wins.
fn admit(entries: Vec<SourceEntry>) -> Vec<FeedSource> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter_map(|entry| {
            let (url, name) = match entry {
                SourceEntry::Url(url) => (url, None),
                SourceEntry::Full { url, name } => (url, name),
            };
            let url = url.trim();
            if url.is_empty() {
                return None;
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                tracing::warn!(url, "skipping non-http feed source");
                return None;
            }
            if !seen.insert(url.to_string()) {
                tracing::debug!(url, "skipping repeated feed source");
                return None;
            }
            let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
            Some(FeedSource {
                url: url.to_string(),
                name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn toml_tables_keep_order_and_drop_repeats() {
        let toml = r#"
[[sources]]
url = " https://b.example/rss "
name = "B"

[[sources]]
url = "https://a.example/rss"

[[sources]]
url = "https://b.example/rss"
name = "dup"
"#;
        assert_eq!(
            decode(toml, Format::Toml).unwrap(),
            vec![
                FeedSource::named("https://b.example/rss", "B"),
                FeedSource::new("https://a.example/rss"),
            ]
        );
    }

    #[test]
    fn json_array_and_object_forms_decode() {
        let list = r#"["https://z.example/feed", {"url": "", "name": "x"}, {"url": "https://y.example/feed", "name": " Y "}]"#;
        assert_eq!(
            decode(list, Format::Json).unwrap(),
            vec![
                FeedSource::new("https://z.example/feed"),
                FeedSource::named("https://y.example/feed", "Y"),
            ]
        );

        let object = r#"{"sources": ["https://z.example/feed", "ftp://files.example/feed"]}"#;
        assert_eq!(
            decode(object, Format::Json).unwrap(),
            vec![FeedSource::new("https://z.example/feed")]
        );
    }

    #[test]
    fn format_follows_extension_then_content() {
        assert_eq!(Format::detect(Path::new("s.TOML"), "[\"x\"]"), Format::Toml);
        assert_eq!(Format::detect(Path::new("s.json"), "[[sources]]"), Format::Json);
        assert_eq!(Format::detect(Path::new("sources"), " [\"x\"]"), Format::Json);
        assert_eq!(Format::detect(Path::new("sources"), "[[sources]]"), Format::Toml);
    }

    #[test]
    fn from_file_sniffs_extensionless_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("feeds");
        fs::write(&p, "[[sources]]\nurl = \"https://sniffed.example/rss\"\nname = \"Sniffed\"\n")
            .unwrap();
        let r = SourceRegistry::from_file(&p).unwrap();
        assert_eq!(r.origin(), &RegistryOrigin::ConfigFile(p.clone()));
        assert_eq!(
            r.sources(),
            &[FeedSource::named("https://sniffed.example/rss", "Sniffed")]
        );
        assert!(SourceRegistry::from_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode("not a list", Format::Toml).is_err());
        assert!(decode("not a list", Format::Json).is_err());
    }

    #[test]
    fn built_in_list_is_nonempty_and_unique() {
        let r = SourceRegistry::built_in();
        assert_eq!(r.origin(), &RegistryOrigin::BuiltIn);
        assert!(r.sources().len() >= 10);
        let urls: HashSet<_> = r.sources().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls.len(), r.sources().len());
    }

    #[serial_test::serial]
    #[test]
    fn resolve_walks_env_then_config_then_built_in() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_SOURCES_PATH);

        // Nothing on disk
        assert_eq!(SourceRegistry::resolve().unwrap(), SourceRegistry::built_in());

        // config/sources.json is found
        fs::create_dir("config").unwrap();
        fs::write("config/sources.json", r#"["https://cfg.example/rss"]"#).unwrap();
        let r = SourceRegistry::resolve().unwrap();
        assert_eq!(
            r.origin(),
            &RegistryOrigin::ConfigFile(PathBuf::from("config/sources.json"))
        );
        assert_eq!(r.sources(), &[FeedSource::new("https://cfg.example/rss")]);

        // toml outranks json
        fs::write(
            "config/sources.toml",
            "[[sources]]\nurl = \"https://toml.example/rss\"\n",
        )
        .unwrap();
        assert_eq!(
            SourceRegistry::resolve().unwrap().into_sources(),
            vec![FeedSource::new("https://toml.example/rss")]
        );

        // Env wins over both
        let p = tmp.path().join("only.json");
        fs::write(&p, r#"{"sources": [{"url": "https://only.example/rss", "name": "Only"}]}"#)
            .unwrap();
        env::set_var(ENV_SOURCES_PATH, &p);
        let r = SourceRegistry::resolve().unwrap();
        assert_eq!(r.origin(), &RegistryOrigin::EnvPath(p.clone()));
        assert_eq!(
            r.into_sources(),
            vec![FeedSource::named("https://only.example/rss", "Only")]
        );

        // Env pointing nowhere is an error, not a silent fallback
        env::set_var(ENV_SOURCES_PATH, tmp.path().join("missing.toml"));
        assert!(SourceRegistry::resolve().is_err());

        // A file that admits nothing is an error too
        fs::write(&p, r#"["", "mailto:desk@example.com"]"#).unwrap();
        env::set_var(ENV_SOURCES_PATH, &p);
        assert!(SourceRegistry::resolve().is_err());

        env::remove_var(ENV_SOURCES_PATH);
        env::set_current_dir(&old).unwrap();
    }
}

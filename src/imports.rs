use ethers_solc::artifacts::{Source, Sources};
use futures::future::BoxFuture;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use thiserror::Error;
use url::Url;

lazy_static! {
    // Matches `import "X";`, `import "X" as N;`, `import * as N from "X";`
    // and `import {A, B as C} from "X";`. The path is the quoted string.
    static ref IMPORT_RE: Regex = Regex::new(
        r#"import\s+(?:(?:\{[^}]*\}|\*\s*as\s+\w+)\s+from\s+)?["']([^"']+)["'](?:\s+as\s+\w+)?\s*;"#
    )
    .unwrap();
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to fetch import {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("import {url} returned status {status}")]
    Http { url: String, status: StatusCode },
    #[error("cannot resolve import path {0:?}")]
    BadPath(String),
}

/// Where the currently-processed file came from. Relative imports resolve
/// against the fetch URL for remote files and against the local override map
/// for caller-provided ones.
#[derive(Debug, Clone)]
enum Origin {
    Virtual(String),
    Remote(Url),
}

struct Resolution<'a> {
    local_sources: Option<&'a Sources>,
    // resolved location -> flattened file name; doubles as the visited set
    // that guarantees termination on cyclic import graphs
    assigned: HashMap<String, String>,
    out: Sources,
}

/// Recursively fetches external Solidity imports and flattens the whole
/// graph into a single source map whose every import statement resolves to
/// a key of the same map.
pub struct ImportResolver {
    client: reqwest::Client,
    npm_cdn_url: Url,
}

impl ImportResolver {
    pub fn new(client: reqwest::Client, npm_cdn_url: Url) -> Self {
        Self {
            client,
            npm_cdn_url,
        }
    }

    /// Resolves all imports of `source_code` and returns the flattened map,
    /// including the (rewritten) root source under `file_name`. Entries of
    /// `local_sources` are used instead of fetching, which makes
    /// re-compilation of an already-resolved map fetch-free.
    pub async fn resolve(
        &self,
        file_name: &str,
        source_code: &str,
        local_sources: Option<&Sources>,
    ) -> Result<Sources, ImportError> {
        let mut resolution = Resolution {
            local_sources,
            assigned: HashMap::new(),
            out: Sources::new(),
        };
        let rewritten = self
            .resolve_imports(
                Origin::Virtual(file_name.to_string()),
                source_code.to_string(),
                &mut resolution,
            )
            .await?;
        resolution
            .out
            .insert(PathBuf::from(file_name), Source::new(rewritten));
        Ok(resolution.out)
    }

    fn resolve_imports<'a, 'b: 'a>(
        &'a self,
        origin: Origin,
        source: String,
        resolution: &'a mut Resolution<'b>,
    ) -> BoxFuture<'a, Result<String, ImportError>> {
        Box::pin(async move {
            let imports: Vec<(String, String)> = IMPORT_RE
                .captures_iter(&source)
                .map(|captures| (captures[0].to_string(), captures[1].to_string()))
                .collect();

            let mut rewritten = source;
            for (statement, path) in imports {
                if let Some(key) = local_key(&origin, &path, resolution.local_sources) {
                    self.resolve_local(&key, &mut *resolution).await?;
                    continue;
                }

                let url = self.import_url(&origin, &path)?;
                let location = url.to_string();
                let flat = match resolution.assigned.get(&location) {
                    Some(flat) => flat.clone(),
                    None => {
                        let flat =
                            flattened_name(&path, &resolution.out, &resolution.assigned);
                        resolution.assigned.insert(location, flat.clone());
                        let content = self.fetch(&url).await?;
                        let content = self
                            .resolve_imports(Origin::Remote(url), content, &mut *resolution)
                            .await?;
                        resolution
                            .out
                            .insert(PathBuf::from(&flat), Source::new(content));
                        flat
                    }
                };

                let replacement = statement
                    .replace(&format!("\"{path}\""), &format!("\"./{flat}\""))
                    .replace(&format!("'{path}'"), &format!("'./{flat}'"));
                rewritten = rewritten.replace(&statement, &replacement);
            }
            Ok(rewritten)
        })
    }

    /// Copies a local override entry (and, transitively, the local entries
    /// it imports) into the output map without touching the network.
    fn resolve_local<'a, 'b: 'a>(
        &'a self,
        key: &'a str,
        resolution: &'a mut Resolution<'b>,
    ) -> BoxFuture<'a, Result<(), ImportError>> {
        Box::pin(async move {
            let marker = format!("local:{key}");
            if resolution.assigned.contains_key(&marker) {
                return Ok(());
            }
            resolution.assigned.insert(marker, key.to_string());
            let content = match resolution
                .local_sources
                .and_then(|local| local.get(Path::new(key)))
            {
                Some(entry) => entry.content.as_str().to_owned(),
                None => return Ok(()),
            };
            let content = self
                .resolve_imports(Origin::Virtual(key.to_string()), content, &mut *resolution)
                .await?;
            resolution
                .out
                .insert(PathBuf::from(key), Source::new(content));
            Ok(())
        })
    }

    fn import_url(&self, origin: &Origin, path: &str) -> Result<Url, ImportError> {
        if path.starts_with("./") || path.starts_with("../") {
            return match origin {
                Origin::Remote(base) => base
                    .join(path)
                    .map_err(|_| ImportError::BadPath(path.to_string())),
                Origin::Virtual(_) => Err(ImportError::BadPath(path.to_string())),
            };
        }
        if path.starts_with('@') {
            return self
                .npm_cdn_url
                .join(path)
                .map_err(|_| ImportError::BadPath(path.to_string()));
        }
        match Url::parse(path) {
            Ok(url) => Ok(rewrite_github_url(url)),
            Err(_) => Err(ImportError::BadPath(path.to_string())),
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String, ImportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ImportError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Http {
                url: url.to_string(),
                status,
            });
        }
        response.text().await.map_err(|source| ImportError::Fetch {
            url: url.to_string(),
            source,
        })
    }
}

/// Key under which a local override serves this import, if any.
fn local_key(origin: &Origin, path: &str, local_sources: Option<&Sources>) -> Option<String> {
    let local = local_sources?;
    let trimmed = path.trim_start_matches("./");
    if local.contains_key(Path::new(trimmed)) {
        return Some(trimmed.to_string());
    }
    if let Origin::Virtual(base) = origin {
        if path.starts_with("./") || path.starts_with("../") {
            let resolved = resolve_relative(base, path);
            if local.contains_key(Path::new(&resolved)) {
                return Some(resolved);
            }
        }
    }
    None
}

/// Resolves a `./`/`../` import against the importing file's virtual path,
/// walking up one directory per `..` segment.
fn resolve_relative(base: &str, import: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').collect();
    segments.pop();
    for part in import.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Flattened key for an imported file: its final path segment, or the last
/// two segments when the short name is already taken by a different import.
fn flattened_name(path: &str, out: &Sources, assigned: &HashMap<String, String>) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect();
    let last = segments.last().copied().unwrap_or("import.sol").to_string();
    let taken = |name: &str| {
        out.contains_key(Path::new(name)) || assigned.values().any(|taken| taken == name)
    };
    if !taken(&last) || segments.len() < 2 {
        return last;
    }
    format!("{}/{}", segments[segments.len() - 2], last)
}

fn rewrite_github_url(url: Url) -> Url {
    if url.host_str() == Some("github.com") {
        if let Some((repo, file)) = url.path().split_once("/blob/") {
            let raw = format!("https://raw.githubusercontent.com{repo}/{file}");
            if let Ok(rewritten) = Url::parse(&raw) {
                return rewritten;
            }
        }
    }
    url
}

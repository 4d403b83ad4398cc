use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Parser)]
#[command(name = "docs", about = "CLI for browsing documents and managing bookmarks")]
struct Cli {
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every document (requires a token).
    List,
    Categories,
    /// Fetch a document by path, e.g. `guides/intro`.
    Get {
        path: String,
    },
    GetId {
        id: String,
    },
    /// Create a document from a JSON file.
    Create {
        file: PathBuf,
    },
    Update {
        path: String,
        file: PathBuf,
    },
    UpdateId {
        id: String,
        file: PathBuf,
    },
    Bookmarks,
    Bookmark {
        document_id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Unbookmark {
        document_id: String,
    },
    /// Replace the bookmark order with the given bookmark ids.
    Reorder {
        bookmark_ids: Vec<String>,
    },
}

#[derive(Deserialize)]
struct Config {
    base_url: String,
    token: Option<String>,
}

struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl Client {
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let mut builder = self
            .http
            .request(method, endpoint(&self.base_url, segments)?);
        if let Some(token) = self.token.as_deref() {
            builder = builder.header(AUTHORIZATION, auth_header(token)?);
        }
        Ok(builder)
    }

    fn require_token(&self) -> Result<()> {
        if self.token.is_none() {
            anyhow::bail!("this command needs `token` in the config file");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let client = Client {
        http: reqwest::Client::new(),
        base_url: Url::parse(&config.base_url)
            .with_context(|| format!("invalid base_url {}", config.base_url))?,
        token: config.token.filter(|t| !t.trim().is_empty()),
    };

    let request = match cli.command {
        Commands::List => {
            client.require_token()?;
            client.request(Method::GET, &[])?
        }
        Commands::Categories => client.request(Method::GET, &["categories"])?,
        Commands::Get { path } => client.request(Method::GET, &path_segments(&path))?,
        Commands::GetId { id } => client.request(Method::GET, &["by-id", id.as_str()])?,
        Commands::Create { file } => {
            client.require_token()?;
            client.request(Method::POST, &[])?.json(&load_body(&file)?)
        }
        Commands::Update { path, file } => {
            client.require_token()?;
            client
                .request(Method::PUT, &path_segments(&path))?
                .json(&load_body(&file)?)
        }
        Commands::UpdateId { id, file } => {
            client.require_token()?;
            client
                .request(Method::PUT, &["by-id", id.as_str()])?
                .json(&load_body(&file)?)
        }
        Commands::Bookmarks => {
            client.require_token()?;
            client.request(Method::GET, &["bookmarks"])?
        }
        Commands::Bookmark { document_id, notes } => {
            client.require_token()?;
            client
                .request(Method::POST, &["bookmarks", document_id.as_str()])?
                .json(&json!({ "notes": notes }))
        }
        Commands::Unbookmark { document_id } => {
            client.require_token()?;
            client.request(Method::DELETE, &["bookmarks", document_id.as_str()])?
        }
        Commands::Reorder { bookmark_ids } => {
            client.require_token()?;
            client
                .request(Method::PUT, &["bookmarks", "order"])?
                .json(&json!({ "bookmarkIds": bookmark_ids }))
        }
    };

    let response = request.send().await.context("failed to send request")?;
    handle_response(response).await
}

/// `/api/docs/<segments...>` under `base`; each segment is percent-encoded on
/// its own, so ids and path parts cannot inject `/`, `?` or `#`.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("base_url cannot carry a path: {}", base))?
        .pop_if_empty()
        .extend(["api", "docs"])
        .extend(segments);
    Ok(url)
}

/// A document path names nested segments; empty ones are dropped.
fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn load_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

fn load_body(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read document file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse document file {}", path.display()))
}

fn auth_header(token: &str) -> Result<HeaderValue> {
    let value = if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    };
    HeaderValue::from_str(&value).context("invalid token")
}

async fn handle_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body = response.text().await.context("failed to read response")?;
    if !status.is_success() {
        anyhow::bail!("request failed with status {}: {}", status, body);
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", body),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_drop_empty_parts() {
        assert_eq!(path_segments("guides/intro"), vec!["guides", "intro"]);
        assert_eq!(path_segments("/guides/intro/"), vec!["guides", "intro"]);
        assert_eq!(path_segments("//guides"), vec!["guides"]);
    }

    #[test]
    fn endpoint_encodes_each_segment() {
        let base = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(
            endpoint(&base, &["by-id", "a/b?c#d"]).unwrap().as_str(),
            "http://localhost:3000/api/docs/by-id/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            endpoint(&base, &path_segments("guides/intro")).unwrap().as_str(),
            "http://localhost:3000/api/docs/guides/intro"
        );
        assert_eq!(
            endpoint(&base, &[]).unwrap().as_str(),
            "http://localhost:3000/api/docs"
        );
    }

    #[test]
    fn endpoint_keeps_a_base_path_prefix() {
        let base = Url::parse("https://example.com/store/").unwrap();
        assert_eq!(
            endpoint(&base, &["bookmarks", "order"]).unwrap().as_str(),
            "https://example.com/store/api/docs/bookmarks/order"
        );
    }

    #[test]
    fn endpoint_rejects_non_hierarchical_base() {
        let base = Url::parse("mailto:docs@example.com").unwrap();
        assert!(endpoint(&base, &["categories"]).is_err());
    }

    #[test]
    fn bearer_prefix_is_added_once() {
        assert_eq!(auth_header("abc").unwrap(), "Bearer abc");
        assert_eq!(auth_header("Bearer abc").unwrap(), "Bearer abc");
    }

    #[test]
    fn cli_parses_bookmark_with_notes() {
        let cli = Cli::try_parse_from(["docs", "bookmark", "doc-1", "--notes", "later"]).unwrap();
        match cli.command {
            Commands::Bookmark { document_id, notes } => {
                assert_eq!(document_id, "doc-1");
                assert_eq!(notes.as_deref(), Some("later"));
            }
            _ => panic!("expected bookmark command"),
        }
    }
}

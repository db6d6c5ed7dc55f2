//! Source selection and the `sources` listing.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::{Config, DocsSourceConfig, WebSourceConfig};
use crate::connector_fs::DocsTreeConnector;
use crate::connector_web::WebConnector;
use crate::traits::Connector;

/// A configured source, ready to turn into a [`Connector`].
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    Docs(DocsSourceConfig),
    Web(WebSourceConfig),
}

impl SourceDescriptor {
    /// Resolve a CLI source name: `docs`, `web` or `all`.
    pub fn from_name(config: &Config, name: &str) -> Result<Vec<SourceDescriptor>> {
        let docs = config.sources.docs.clone().map(SourceDescriptor::Docs);
        let web = config.sources.web.clone().map(SourceDescriptor::Web);
        match name {
            "docs" => match docs {
                Some(d) => Ok(vec![d]),
                None => bail!("No [sources.docs] section in config"),
            },
            "web" => match web {
                Some(w) => Ok(vec![w]),
                None => bail!("No [sources.web] section in config"),
            },
            "all" => {
                let all: Vec<_> = docs.into_iter().chain(web).collect();
                if all.is_empty() {
                    bail!("No sources configured");
                }
                Ok(all)
            }
            other => bail!("Unknown source: '{}'. Must be docs, web, or all.", other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceDescriptor::Docs(_) => "docs",
            SourceDescriptor::Web(_) => "web",
        }
    }

    pub fn connector(&self) -> Result<Box<dyn Connector>> {
        match self {
            SourceDescriptor::Docs(c) => Ok(Box::new(DocsTreeConnector::new(c.clone()))),
            SourceDescriptor::Web(c) => Ok(Box::new(WebConnector::new(c.clone())?)),
        }
    }
}

/// Health of one configured source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub configured: bool,
    pub healthy: bool,
    pub detail: String,
}

pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    let docs = match &config.sources.docs {
        Some(d) if d.root.exists() => SourceStatus {
            name: "docs".to_string(),
            configured: true,
            healthy: true,
            detail: d.root.display().to_string(),
        },
        Some(d) => SourceStatus {
            name: "docs".to_string(),
            configured: true,
            healthy: false,
            detail: format!("root does not exist: {}", d.root.display()),
        },
        None => SourceStatus {
            name: "docs".to_string(),
            configured: false,
            healthy: false,
            detail: String::new(),
        },
    };
    let web = match &config.sources.web {
        Some(w) => SourceStatus {
            name: "web".to_string(),
            configured: true,
            healthy: true,
            detail: format!("{} start URL(s)", w.urls.len()),
        },
        None => SourceStatus {
            name: "web".to_string(),
            configured: false,
            healthy: false,
            detail: String::new(),
        },
    };
    vec![docs, web]
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<8} {:<16} {:<8} DETAIL", "SOURCE", "STATUS", "HEALTHY");
    for s in get_sources(config) {
        let status = if s.configured { "OK" } else { "NOT CONFIGURED" };
        println!("{:<8} {:<16} {:<8} {}", s.name, status, s.healthy, s.detail);
    }
    if let Some(rw) = &config.rewrite {
        println!();
        println!("rewrite: '{}' -> '{}'", rw.from, rw.to);
    }
    Ok(())
}

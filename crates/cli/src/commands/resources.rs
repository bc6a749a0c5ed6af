//! Resources Command

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use flowspec_runner::{DirectoryResourceResolver, ResourceResolver, RunnerConfig};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ResourcesArgs {
    /// Resource directory (defaults to `resource_dir` from the config)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// A deployable resource
#[derive(Serialize)]
pub struct ResourceInfo {
    pub name: String,
    pub size: u64,
}

impl TableDisplay for ResourceInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Size"]
    }

    fn row(&self) -> Vec<String> {
        let size = if self.size > 1024 * 1024 {
            format!("{:.1}MB", self.size as f64 / 1024.0 / 1024.0)
        } else if self.size > 1024 {
            format!("{:.1}KB", self.size as f64 / 1024.0)
        } else {
            format!("{}B", self.size)
        };
        vec![self.name.clone(), size]
    }
}

pub fn execute(args: ResourcesArgs, config: &RunnerConfig, format: OutputFormat) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| config.resource_dir.clone());
    let resolver = DirectoryResourceResolver::new(&dir);

    let names = resolver
        .list_resources()
        .with_context(|| format!("Failed to list resources in {}", dir.display()))?;

    let resources: Vec<ResourceInfo> = names
        .into_iter()
        .map(|name| {
            let size = std::fs::metadata(dir.join(&name))
                .map(|m| m.len())
                .unwrap_or(0);
            ResourceInfo { name, size }
        })
        .collect();

    print_list(&resources, format);
    Ok(())
}

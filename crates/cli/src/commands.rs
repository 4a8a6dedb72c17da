//! Subcommands.

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use corelib::params::ParameterDecl;
use corelib::{plan_cluster, ParameterContext};
use rspec::DocumentSummary;
use tracing::info;

use crate::config::FileConfig;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate parameters and print the request document.
    Generate {
        /// Parameter value as NAME=VALUE. Repeatable.
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Write the document here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the parameters this profile accepts.
    Params {
        /// Include advanced parameters.
        #[arg(long)]
        advanced: bool,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// What a command produced, before it is written out.
#[derive(Debug)]
pub enum CommandResult {
    Generated {
        document: String,
        summary: DocumentSummary,
        output: Option<PathBuf>,
    },
    Parameters(String),
}

impl Command {
    pub fn execute(&self, file: &FileConfig) -> anyhow::Result<CommandResult> {
        match self {
            Command::Generate { params, output } => {
                let mut supplied = file.param_strings()?;
                supplied.extend(params.iter().cloned());

                let params = ParameterContext::profile().bind(&supplied)?;
                let graph = plan_cluster(&params, &file.profile, &file.bootstrap)?;
                let (document, summary) =
                    rspec::render(&graph).context("failed to render request document")?;

                info!(
                    nodes = summary.nodes,
                    cluster_size = graph.cluster_size(),
                    "generated request"
                );
                Ok(CommandResult::Generated {
                    document,
                    summary,
                    output: output.clone(),
                })
            }
            Command::Params { advanced, json } => {
                let ctx = ParameterContext::profile();
                let decls: Vec<&ParameterDecl> = ctx
                    .declarations()
                    .iter()
                    .filter(|d| *advanced || !d.advanced)
                    .collect();

                let listing = if *json {
                    let mut text = serde_json::to_string_pretty(&decls)?;
                    text.push('\n');
                    text
                } else {
                    format_table(&decls)
                };
                Ok(CommandResult::Parameters(listing))
            }
        }
    }
}

fn format_table(decls: &[&ParameterDecl]) -> String {
    decls
        .iter()
        .map(|decl| {
            let marker = if decl.advanced { " (advanced)" } else { "" };
            format!(
                "{:<20} {:<10} {:<8} {}{}\n",
                decl.name,
                decl.kind.to_string(),
                decl.default.to_string(),
                decl.description,
                marker
            )
        })
        .collect()
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {:?}", s))?;
    if key.trim().is_empty() {
        return Err(format!("missing parameter name in {:?}", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

//! Command line and TOML configuration.
//!
//! Values are layered: built-in defaults, then the optional `--config` file,
//! then `--param name=value` flags on the command line.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use corelib::{BootstrapSettings, ProfileSettings};
use serde::Deserialize;

use crate::commands::{Command, CommandResult};
use crate::telemetry;

/// Generate testbed request documents for a Kubernetes cluster profile.
#[derive(Debug, Parser)]
#[command(name = "profile-gen", version, about)]
pub struct CliConfig {
    /// TOML file with [profile], [bootstrap], [params] and [log] sections.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (e.g. "info", "debug").
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load configuration, initialize logging, and run the selected command.
    pub fn run(self) -> anyhow::Result<()> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let level = self.log_level.as_deref().unwrap_or(&file.log.level);
        telemetry::init(level);

        match self.command.execute(&file)? {
            CommandResult::Generated {
                document, output, ..
            } => emit(&document, output.as_deref()),
            CommandResult::Parameters(listing) => emit(&listing, None),
        }
    }
}

/// Write to `path`, or stdout when no path is given.
fn emit(text: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub profile: ProfileSettings,
    pub bootstrap: BootstrapSettings,
    /// Parameter values by name, overridden by `--param`.
    pub params: BTreeMap<String, toml::Value>,
    pub log: LogSection,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.profile.validate()?;
        Ok(config)
    }

    /// `[params]` as the string values parameter binding expects.
    pub fn param_strings(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for (name, value) in &self.params {
            let text = match value {
                toml::Value::Integer(v) => v.to_string(),
                toml::Value::Boolean(v) => v.to_string(),
                toml::Value::String(v) => v.clone(),
                other => bail!(
                    "parameter {} must be an integer, boolean or string, got {}",
                    name,
                    other.type_str()
                ),
            };
            out.insert(name.clone(), text);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config.profile, ProfileSettings::default());
        assert_eq!(config.bootstrap, BootstrapSettings::default());
        assert_eq!(config.log.level, "info");
        assert!(config.params.is_empty());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = FileConfig::parse(
            r#"
            [profile]
            base_ip = "192.168.7"
            lan_bandwidth_kbps = 1000000

            [bootstrap]
            log_path = "/tmp/start.log"

            [params]
            nodeCount = 5
            startKubernetes = false
            nodeType = "xl170"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.profile.base_ip, "192.168.7");
        assert_eq!(config.profile.lan_bandwidth_kbps, Some(1_000_000));
        assert_eq!(config.profile.netmask, "255.255.255.0");
        assert_eq!(config.bootstrap.log_path, "/tmp/start.log");
        assert_eq!(config.bootstrap.script, "/local/repository/start.sh");
        assert_eq!(config.log.level, "debug");

        let params = config.param_strings().unwrap();
        assert_eq!(params["nodeCount"], "5");
        assert_eq!(params["startKubernetes"], "false");
        assert_eq!(params["nodeType"], "xl170");
    }

    #[test]
    fn test_rejects_bad_profile_section() {
        assert!(FileConfig::parse("[profile]\nbase_ip = \"10.10\"\n").is_err());
    }

    #[test]
    fn test_rejects_non_scalar_param() {
        let config = FileConfig::parse("[params]\nnodeCount = [1, 2]\n").unwrap();
        assert!(config.param_strings().is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = CliConfig::try_parse_from([
            "profile-gen",
            "--log-level",
            "debug",
            "generate",
            "-p",
            "nodeCount=4",
            "--param",
            "startKubernetes=false",
            "-o",
            "request.xml",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Generate { params, output } => {
                assert_eq!(
                    params,
                    vec![
                        ("nodeCount".to_string(), "4".to_string()),
                        ("startKubernetes".to_string(), "false".to_string()),
                    ]
                );
                assert_eq!(output, Some(PathBuf::from("request.xml")));
            }
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_emit_writes_output_file() {
        let path =
            std::env::temp_dir().join(format!("profile-gen-emit-{}.xml", std::process::id()));
        let text = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rspec/>\n";

        emit(text, Some(&path)).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(written, text);
    }

    #[test]
    fn test_emit_reports_unwritable_path() {
        let path = std::env::temp_dir()
            .join(format!("profile-gen-missing-{}", std::process::id()))
            .join("request.xml");

        let err = emit("<rspec/>", Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to write"), "{}", err);
    }

    #[test]
    fn test_cli_rejects_param_without_value() {
        assert!(CliConfig::try_parse_from(["profile-gen", "generate", "-p", "nodeCount"]).is_err());
    }
}

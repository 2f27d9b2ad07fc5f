mod config;
mod telemetry;

use clap::{Parser, Subcommand};
use config::Config;
use http::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use vhosting::path_key::{FormatError, parse_path, relative_url};
use vhosting::resolver::VHM_URL_HEADER;
use vhosting::{
    HostRegistry, RequestContext, Routing, StaticResourceTree, StaticSkinRegistry, VirtualHosting,
};

#[derive(Parser)]
#[command(name = "forest", about = "Advanced virtual hosting")]
struct Cli {
    /// Path to the YAML configuration
    #[arg(long, short, default_value = "forest.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Build the virtual hosts and report configuration errors
    Check,
    /// Resolve a request URL to an internal path
    Resolve {
        url: String,
        /// Origin declared by the X-VHM-Url header
        #[arg(long)]
        vhm_url: Option<String>,
    },
    /// Compute a URL as seen under another origin
    RewriteUrl {
        /// URL of the request the computation happens in
        #[arg(long)]
        request: String,
        #[arg(long)]
        vhm_url: Option<String>,
        /// Target origin; the URL is made relative without one
        #[arg(long)]
        target: Option<String>,
        url: String,
    },
    /// External URL of an internal path
    Url {
        #[arg(long)]
        request: String,
        #[arg(long)]
        vhm_url: Option<String>,
        #[arg(long)]
        preview: bool,
        #[arg(long)]
        relative: bool,
        path: String,
    },
    /// Root and top level URLs of the virtual site
    Site {
        #[arg(long)]
        vhm_url: Option<String>,
        request: String,
    },
    /// Write the rewrite rules to stdout as CSV
    Export,
    /// Read rewrite rules from a CSV file and print the resulting configuration
    Import { file: PathBuf },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Hosting(#[from] vhosting::ConfigError),
    #[error(transparent)]
    Request(#[from] vhosting::RequestError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid X-VHM-Url header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
    #[error("could not write output: {0}")]
    Output(#[from] io::Error),
    #[error("could not serialize output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not serialize configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Hosting behaviour of a resolved request, with the request and its routing.
type Resolved<'a> = (
    Box<dyn VirtualHosting<Vec<String>> + 'a>,
    RequestContext,
    Routing<Vec<String>>,
);

/// Everything a command needs, built from the configuration.
struct Forest {
    tree: StaticResourceTree,
    skins: StaticSkinRegistry,
    registry: HostRegistry,
    active: bool,
}

impl Forest {
    fn new(config: &Config) -> Result<Self, CliError> {
        let tree = config.site.resource_tree()?;
        let registry = HostRegistry::from_config(&config.vhosting, &tree)?;
        Ok(Forest {
            tree,
            skins: StaticSkinRegistry::new(config.skins.iter().cloned()),
            registry,
            active: config.vhosting.active,
        })
    }

    /// Resolves `url` as a request carrying `vhm_url` in its headers.
    fn resolve(&self, url: &str, vhm_url: Option<&str>) -> Result<Resolved<'_>, CliError> {
        let mut headers = HeaderMap::new();
        if let Some(vhm_url) = vhm_url {
            headers.insert(VHM_URL_HEADER, HeaderValue::from_str(vhm_url)?);
        }

        let mut hosting = vhosting::select(&self.registry, &self.tree, &self.skins);
        let mut request = RequestContext::new(url);
        let routing = hosting.resolve_headers(&mut request, &headers)?;
        Ok((hosting, request, routing))
    }

    fn check(&self) -> Value {
        let snapshot = self.registry.snapshot();
        json!({
            "active": self.active,
            "hosts": snapshot.hosts().len(),
            "origins": snapshot.origins().map(|origin| origin.url()).collect::<Vec<_>>(),
        })
    }

    fn resolve_command(&self, url: &str, vhm_url: Option<&str>) -> Result<Value, CliError> {
        let (_, request, routing) = self.resolve(url, vhm_url)?;
        Ok(json!({
            "resource": format!("/{}", routing.traversal.resource().join("/")),
            "fell_back_to_root": routing.traversal.fell_back(),
            "path": routing.path,
            "url": request.url,
            "actual_url": request.actual_url,
            "server_url": request.server_url,
            "script": request.script,
            "skin": request.skin.map(|skin| skin.name),
            "skin_change_allowed": request.skin_change_allowed,
        }))
    }

    fn rewrite_url(
        &self,
        request: &str,
        vhm_url: Option<&str>,
        target: Option<&str>,
        url: &str,
    ) -> Result<String, CliError> {
        let (hosting, _, _) = self.resolve(request, vhm_url)?;
        Ok(hosting.rewrite_url(target, url)?)
    }

    fn url(
        &self,
        request: &str,
        vhm_url: Option<&str>,
        path: &str,
        preview: bool,
        relative: bool,
    ) -> Result<String, CliError> {
        let (hosting, _, _) = self.resolve(request, vhm_url)?;
        let url = hosting.content_url(&parse_path(path)?, preview)?;
        Ok(if relative { relative_url(&url) } else { url })
    }

    fn site(&self, request: &str, vhm_url: Option<&str>) -> Result<Value, CliError> {
        let (hosting, _, _) = self.resolve(request, vhm_url)?;
        Ok(json!({
            "root_url": hosting.root_url(),
            "root_path": hosting.root_path(),
            "top_level_url": hosting.top_level_url(),
            "top_level_path": hosting.top_level_path(),
        }))
    }

    fn import(&self, file: &Path) -> Result<vhosting::Config, CliError> {
        self.registry.import_csv(File::open(file)?, &self.tree)?;
        Ok(vhosting::Config {
            active: self.active,
            hosts: self.registry.hosts(),
        })
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: CliCommand, config: &Config) -> Result<(), CliError> {
    let forest = Forest::new(config)?;

    match command {
        CliCommand::Check => print_json(&forest.check()),
        CliCommand::Resolve { url, vhm_url } => {
            print_json(&forest.resolve_command(&url, vhm_url.as_deref())?)
        }
        CliCommand::RewriteUrl {
            request,
            vhm_url,
            target,
            url,
        } => {
            println!(
                "{}",
                forest.rewrite_url(&request, vhm_url.as_deref(), target.as_deref(), &url)?
            );
            Ok(())
        }
        CliCommand::Url {
            request,
            vhm_url,
            preview,
            relative,
            path,
        } => {
            println!(
                "{}",
                forest.url(&request, vhm_url.as_deref(), &path, preview, relative)?
            );
            Ok(())
        }
        CliCommand::Site { vhm_url, request } => {
            print_json(&forest.site(&request, vhm_url.as_deref())?)
        }
        CliCommand::Export => Ok(forest.registry.export_csv(io::stdout().lock())?),
        CliCommand::Import { file } => {
            let imported = forest.import(&file)?;
            serde_yaml::to_writer(io::stdout().lock(), &imported)?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry = telemetry::init_logging(config.common.logging.as_ref());
    if let Err(error) = telemetry::init_metrics(config.common.metrics.as_ref()) {
        tracing::warn!(%error, "Metrics are disabled");
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Command failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn forest() -> Forest {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/forest.yaml"));
        let config = Config::from_file(path).expect("load config");
        Forest::new(&config).expect("build forest")
    }

    #[test]
    fn test_check() {
        let report = forest().check();
        assert_eq!(report["active"], json!(true));
        assert_eq!(report["hosts"], json!(3));
        assert_eq!(
            report["origins"],
            json!([
                "http://localhost",
                "https://localhost",
                "https://www.localhost",
                "http://infrae.com/docs"
            ])
        );
    }

    #[test]
    fn test_resolve_command() {
        let forest = forest();
        let report = forest
            .resolve_command("https://www.localhost/docs/user", Some("https://www.localhost"))
            .unwrap();
        assert_eq!(report["resource"], json!("/root"));
        assert_eq!(report["path"], json!(["docs", "user"]));
        assert_eq!(report["url"], json!("https://www.localhost"));
        assert_eq!(report["skin"], json!("Multiflex"));
        assert_eq!(report["skin_change_allowed"], json!(false));

        let report = forest
            .resolve_command("http://backend/docs/silva/index", Some("http://infrae.com/docs"))
            .unwrap();
        assert_eq!(report["path"], json!(["index"]));
        assert_eq!(report["script"], json!(["docs", "silva"]));
        assert_eq!(report["skin"], json!("Standard Issue"));
        assert_eq!(report["skin_change_allowed"], json!(true));

        assert!(matches!(
            forest.resolve_command("http://localhost/x", Some("bad\nvalue")),
            Err(CliError::Header(_))
        ));
    }

    #[test]
    fn test_url_commands() {
        let forest = forest();
        assert_eq!(
            forest
                .rewrite_url(
                    "http://localhost/man/edit",
                    Some("http://localhost"),
                    Some("https://localhost"),
                    "http://localhost/man/edit",
                )
                .unwrap(),
            "https://localhost/docs/dev/man/edit"
        );
        assert_eq!(
            forest
                .url("http://localhost/", Some("http://localhost"), "/root/docs/user", false, true)
                .unwrap(),
            "/site/docs/user"
        );
        assert_eq!(
            forest
                .url("https://localhost/", Some("https://localhost"), "/root", true, false)
                .unwrap(),
            "https://localhost/++preview++"
        );

        let site = forest.site("http://localhost/site/edit", Some("http://localhost")).unwrap();
        assert_eq!(site["root_url"], json!("http://localhost/site"));
        assert_eq!(site["top_level_url"], json!("http://localhost"));
    }

    #[test]
    fn test_import() {
        let forest = forest();
        let mut csv = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(csv, "http://infrae.com,/,/root,Multiflex,off").expect("write csv");

        let imported = forest.import(csv.path()).unwrap();
        assert!(imported.active);
        assert_eq!(imported.hosts.len(), 1);
        assert_eq!(imported.hosts[0].rewrites[0].skin.as_deref(), Some("Multiflex"));
        assert!(forest.registry.query(&vhosting::path_key::url_to_key("http://localhost").unwrap()).is_none());

        let mut csv = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(csv, "http://infrae.com,/,/missing,,on").expect("write csv");
        assert!(matches!(
            forest.import(csv.path()),
            Err(CliError::Hosting(vhosting::ConfigError::InvalidPath { .. }))
        ));
        assert_eq!(forest.registry.hosts().len(), 1);
    }
}

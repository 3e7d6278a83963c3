// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Joinery CLI
//!
//! Connects to a forwarder, joins workspaces by converting a testbed
//! certificate, and manages saved connection configs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use joinery_config::{load_config_with_cli, CliOverrides};

mod commands;
mod console_sink;

/// Joinery - workspace connection and identity tool
#[derive(Parser, Debug)]
#[command(name = "joinery", version, about, long_about = None)]
struct Args {
	/// Workspace CA base URL (overrides config)
	#[arg(long, global = true)]
	ca_url: Option<String>,

	/// Forwarder locator URL (overrides config)
	#[arg(long, global = true)]
	fch_url: Option<String>,

	/// Forwarder connect timeout in seconds
	#[arg(long, global = true)]
	connect_timeout: Option<u64>,

	/// Directory for workspace state
	#[arg(long, global = true)]
	state_dir: Option<PathBuf>,

	/// Output logs as JSON
	#[arg(long, global = true)]
	log_json: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Connect to a forwarder once and report the result
	Connect {
		/// WebSocket URI, e.g. wss://suns.cs.ucla.edu/ws/
		uri: Url,
		#[command(flatten)]
		credential: CredentialArgs,
		/// Also save the config
		#[arg(long)]
		save: bool,
	},
	/// Show configuration, saved connections and persisted identities
	Status,
	/// Locate the closest forwarder and connect with the first saved config
	Auto,
	/// Join a workspace by converting the forwarder credential
	Join {
		/// Full name of the workspace trust anchor
		#[arg(long)]
		anchor: String,
		/// Index of the saved connection to use (default: first forwarder-ws)
		#[arg(long)]
		connection: Option<usize>,
		/// Keep nothing on disk
		#[arg(long)]
		in_memory: bool,
	},
	/// Start a workspace from an existing certificate and key
	Bootstrap {
		#[command(flatten)]
		source: BootstrapSource,
		/// Keep nothing on disk
		#[arg(long)]
		in_memory: bool,
	},
	/// Manage saved connection configs
	Connections {
		#[command(subcommand)]
		command: ConnectionsCommand,
	},
}

#[derive(clap::Args, Debug, Clone)]
struct CredentialArgs {
	/// Certificate (JSON) for command signing
	#[arg(long, requires = "key")]
	cert: Option<PathBuf>,
	/// Private key (base64 PKCS#8) matching --cert
	#[arg(long, requires = "cert")]
	key: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = true)]
struct BootstrapSource {
	/// Directory written by a previous join or bootstrap
	#[arg(long, conflicts_with_all = ["anchor_cert", "cert", "key"])]
	from: Option<PathBuf>,
	/// Trust anchor certificate (JSON)
	#[arg(long, requires_all = ["cert", "key"])]
	anchor_cert: Option<PathBuf>,
	/// Own certificate (JSON)
	#[arg(long)]
	cert: Option<PathBuf>,
	/// Own private key (base64 PKCS#8)
	#[arg(long)]
	key: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ConnectionsCommand {
	/// List saved configs
	List,
	/// Save a forwarder WebSocket config
	Add {
		uri: Url,
		#[command(flatten)]
		credential: CredentialArgs,
	},
	/// Save a forwarder Unix socket config
	AddUnix { socket_path: PathBuf },
	/// Remove the config at INDEX
	Remove { index: usize },
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		let in_memory = match &args.command {
			Command::Join { in_memory: true, .. } | Command::Bootstrap { in_memory: true, .. } => {
				Some(true)
			}
			_ => None,
		};
		CliOverrides {
			ca_url: args.ca_url.clone(),
			fch_url: args.fch_url.clone(),
			connect_timeout_secs: args.connect_timeout,
			in_memory,
			state_dir: args.state_dir.clone(),
		}
	}
}

fn init_tracing(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init();
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(args.log_json);

	let config =
		load_config_with_cli(CliOverrides::from(&args)).context("failed to load configuration")?;
	debug!(config_file = %config.paths.user_config_file.display(), "configuration loaded");

	let app = commands::App::new(config);

	match args.command {
		Command::Connect {
			uri,
			credential,
			save,
		} => app.connect(uri, credential.into_files(), save).await,
		Command::Status => app.status().await,
		Command::Auto => app.auto().await,
		Command::Join {
			anchor,
			connection,
			in_memory: _,
		} => app.join(&anchor, connection).await,
		Command::Bootstrap {
			source,
			in_memory: _,
		} => app.bootstrap(source.into_material_source()?).await,
		Command::Connections { command } => match command {
			ConnectionsCommand::List => app.list_connections().await,
			ConnectionsCommand::Add { uri, credential } => {
				app.add_connection(commands::forwarder_config(uri, credential.into_files()))
					.await
			}
			ConnectionsCommand::AddUnix { socket_path } => {
				app.add_connection(joinery_core::ConnectionConfig::ForwarderUnix { socket_path })
					.await
			}
			ConnectionsCommand::Remove { index } => app.remove_connection(index).await,
		},
	}
}

impl CredentialArgs {
	fn into_files(self) -> Option<joinery_core::CredentialFiles> {
		match (self.cert, self.key) {
			(Some(certificate), Some(private_key)) => Some(joinery_core::CredentialFiles {
				certificate,
				private_key,
			}),
			_ => None,
		}
	}
}

impl BootstrapSource {
	fn into_material_source(self) -> Result<commands::MaterialSource> {
		if let Some(dir) = self.from {
			return Ok(commands::MaterialSource::Persisted(dir));
		}
		match (self.anchor_cert, self.cert, self.key) {
			(Some(anchor), Some(cert), Some(key)) => Ok(commands::MaterialSource::Files {
				anchor,
				cert,
				key,
			}),
			_ => anyhow::bail!("pass --from DIR or all of --anchor-cert, --cert and --key"),
		}
	}
}

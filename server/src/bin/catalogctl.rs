//! catalogctl - command-line client for the application catalog
//!
//! Registry commands talk to the catalog server over HTTP and print the JSON
//! it returns. `exec` and `pbs` work against a compute host directly over SSH
//! (or the local shell when no host is given).

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::Context;
use appcatalog_core::{
    AuthenticationInfo, Cluster, CommandExecutor, CommandRunner, JobDescriptor, PbsCluster, RemoteSession,
    ServerInfo,
};
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{error, info};

/// catalogctl - application catalog administration tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Catalog server URL
    #[arg(short, long, default_value = "http://localhost:8080", env = "CATALOG_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Quick health check (for Docker healthcheck)
    Health,

    /// Compute resources
    Compute {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Storage resources
    Storage {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Application modules of a gateway
    Module {
        #[command(subcommand)]
        command: GatewayCommands,
    },

    /// Application interfaces of a gateway
    Interface {
        #[command(subcommand)]
        command: GatewayCommands,
    },

    /// Application deployments of a gateway
    Deployment {
        #[command(subcommand)]
        command: GatewayCommands,
    },

    /// Gateway resource profiles
    GatewayProfile {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Group resource profiles
    GroupProfile {
        #[command(subcommand)]
        command: GroupProfileCommands,
    },

    /// Run a shell command on a compute host
    Exec {
        #[command(flatten)]
        ssh: SshArgs,

        /// Command line to run
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Drive a PBS/Torque scheduler on a compute host
    Pbs {
        #[command(flatten)]
        ssh: SshArgs,

        /// Directory holding qsub, qstat and qdel
        #[arg(long, default_value = "", env = "PBS_BIN_PATH")]
        bin_path: String,

        #[command(subcommand)]
        command: PbsCommands,
    },
}

/// Commands for entries that are not scoped by gateway
#[derive(Subcommand, Debug)]
enum ResourceCommands {
    /// List all entries
    List,
    /// Show one entry
    Get { id: String },
    /// Register an entry from a JSON file
    Add { file: PathBuf },
    /// Remove an entry
    Remove { id: String },
}

/// Commands for entries owned by a gateway
#[derive(Subcommand, Debug)]
enum GatewayCommands {
    /// List the gateway's entries
    List {
        #[arg(short, long, env = "CATALOG_GATEWAY_ID")]
        gateway: String,
    },
    /// Show one entry
    Get { id: String },
    /// Register an entry from a JSON file
    Add {
        #[arg(short, long, env = "CATALOG_GATEWAY_ID")]
        gateway: String,
        file: PathBuf,
    },
    /// Remove an entry
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum GroupProfileCommands {
    /// List the profiles of a gateway that the caller may access
    List {
        #[arg(short, long, env = "CATALOG_GATEWAY_ID")]
        gateway: String,
        /// Accessible profile ids
        #[arg(short, long, value_delimiter = ',')]
        accessible: Vec<String>,
    },
    /// Show one profile
    Get { id: String },
    /// Create a profile from a JSON file
    Add { file: PathBuf },
    /// Replace a profile from a JSON file
    Update { id: String, file: PathBuf },
    /// Remove a profile
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum PbsCommands {
    /// Generate a job script from a JSON job description and submit it
    Submit { file: PathBuf },
    /// Upload an existing script and submit it
    SubmitScript {
        script: PathBuf,
        #[arg(short, long)]
        working_directory: String,
    },
    /// Show the scheduler state of a job
    Status { job_id: String },
    /// Show the full qstat record of a job
    Describe { job_id: String },
    /// Cancel a job
    Cancel { job_id: String },
}

/// Where and how to reach the compute host
#[derive(Args, Debug, Clone)]
struct SshArgs {
    /// Remote host; commands run locally when omitted
    #[arg(long, env = "SSH_HOST")]
    host: Option<String>,

    /// Login user
    #[arg(long, env = "SSH_USER", default_value = "root")]
    user: String,

    #[arg(long, env = "SSH_PORT", default_value_t = 22)]
    port: u16,

    /// Private key file; the default keys under ~/.ssh are tried otherwise
    #[arg(long, env = "SSH_KEY_PATH")]
    key: Option<String>,

    /// Passphrase for the private key
    #[arg(long, env = "SSH_KEY_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Password login instead of keys
    #[arg(long, env = "SSH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, env = "SSH_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,
}

impl SshArgs {
    fn server(&self) -> ServerInfo {
        let Some(host) = &self.host else {
            return ServerInfo::local();
        };

        let authentication = if let Some(password) = &self.password {
            AuthenticationInfo::Password {
                password: password.clone(),
            }
        } else if let Some(key) = &self.key {
            AuthenticationInfo::KeyFile {
                private_key_file: key.clone(),
                passphrase: self.passphrase.clone(),
            }
        } else {
            AuthenticationInfo::DefaultKeys
        };

        let mut server = ServerInfo::remote(&self.user, host, authentication);
        server.port = self.port;
        server
    }

    fn session(&self) -> RemoteSession {
        let executor = CommandExecutor::new(Duration::from_secs(self.timeout));
        RemoteSession::new(executor, self.server())
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = Client::new();
    let api = format!("{}/api/v1", cli.url.trim_end_matches('/'));

    let result = match cli.command {
        Commands::Health => handle_health(&client, &api).await,
        Commands::Compute { command } => handle_resource(&client, &api, "compute-resources", command).await,
        Commands::Storage { command } => handle_resource(&client, &api, "storage-resources", command).await,
        Commands::Module { command } => handle_gateway_scoped(&client, &api, "app-modules", command).await,
        Commands::Interface { command } => handle_gateway_scoped(&client, &api, "app-interfaces", command).await,
        Commands::Deployment { command } => handle_gateway_scoped(&client, &api, "app-deployments", command).await,
        Commands::GatewayProfile { command } => handle_resource(&client, &api, "gateway-profiles", command).await,
        Commands::GroupProfile { command } => handle_group_profile(&client, &api, command).await,
        Commands::Exec { ssh, command } => handle_exec(&ssh, &command.join(" ")).await,
        Commands::Pbs { ssh, bin_path, command } => handle_pbs(&ssh, &bin_path, command).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

/// Send a request and print the JSON reply; non-2xx replies become errors
async fn call(client: &Client, method: Method, url: &str, body: Option<Value>) -> anyhow::Result<()> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    let text = response.text().await?;
    let json: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        let message = json
            .as_ref()
            .and_then(|v| v["error"]["message"].as_str())
            .map(str::to_string)
            .unwrap_or(text);
        anyhow::bail!("{} ({})", message, status);
    }

    if let Some(json) = json {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

async fn handle_health(client: &Client, api: &str) -> anyhow::Result<()> {
    call(client, Method::GET, &format!("{}/health", api), None).await
}

async fn handle_resource(
    client: &Client,
    api: &str,
    collection: &str,
    command: ResourceCommands,
) -> anyhow::Result<()> {
    let base = format!("{}/{}", api, collection);
    match command {
        ResourceCommands::List => call(client, Method::GET, &base, None).await,
        ResourceCommands::Get { id } => call(client, Method::GET, &format!("{}/{}", base, id), None).await,
        ResourceCommands::Add { file } => {
            info!("Registering {} from {}", collection, file.display());
            call(client, Method::POST, &base, Some(read_json(&file)?)).await
        }
        ResourceCommands::Remove { id } => {
            call(client, Method::DELETE, &format!("{}/{}", base, id), None).await?;
            println!("Removed {}", id);
            Ok(())
        }
    }
}

async fn handle_gateway_scoped(
    client: &Client,
    api: &str,
    collection: &str,
    command: GatewayCommands,
) -> anyhow::Result<()> {
    let base = format!("{}/{}", api, collection);
    match command {
        GatewayCommands::List { gateway } => {
            call(client, Method::GET, &format!("{}?gateway_id={}", base, gateway), None).await
        }
        GatewayCommands::Get { id } => call(client, Method::GET, &format!("{}/{}", base, id), None).await,
        GatewayCommands::Add { gateway, file } => {
            info!("Registering {} for gateway {}", collection, gateway);
            let url = format!("{}?gateway_id={}", base, gateway);
            call(client, Method::POST, &url, Some(read_json(&file)?)).await
        }
        GatewayCommands::Remove { id } => {
            call(client, Method::DELETE, &format!("{}/{}", base, id), None).await?;
            println!("Removed {}", id);
            Ok(())
        }
    }
}

async fn handle_group_profile(client: &Client, api: &str, command: GroupProfileCommands) -> anyhow::Result<()> {
    let base = format!("{}/group-profiles", api);
    match command {
        GroupProfileCommands::List { gateway, accessible } => {
            let url = format!(
                "{}?gateway_id={}&accessible_ids={}",
                base,
                gateway,
                accessible.join(",")
            );
            call(client, Method::GET, &url, None).await
        }
        GroupProfileCommands::Get { id } => call(client, Method::GET, &format!("{}/{}", base, id), None).await,
        GroupProfileCommands::Add { file } => call(client, Method::POST, &base, Some(read_json(&file)?)).await,
        GroupProfileCommands::Update { id, file } => {
            call(client, Method::PUT, &format!("{}/{}", base, id), Some(read_json(&file)?)).await
        }
        GroupProfileCommands::Remove { id } => {
            call(client, Method::DELETE, &format!("{}/{}", base, id), None).await?;
            println!("Removed {}", id);
            Ok(())
        }
    }
}

async fn handle_exec(ssh: &SshArgs, command: &str) -> anyhow::Result<()> {
    let session = ssh.session();
    info!("Running on {}: {}", session.server().display(), command);

    let output = session.run(command).await?;
    print!("{}", output.stdout);
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }
    if !output.success() {
        anyhow::bail!("Command exited with status {}", output.exit_code);
    }
    Ok(())
}

async fn handle_pbs(ssh: &SshArgs, bin_path: &str, command: PbsCommands) -> anyhow::Result<()> {
    let cluster = PbsCluster::new(ssh.session(), bin_path);

    match command {
        PbsCommands::Submit { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let job: JobDescriptor = serde_json::from_str(&content)
                .with_context(|| format!("Invalid job description in {}", file.display()))?;
            let job_id = cluster.submit_batch_job(&job).await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "job_id": job_id }))?);
        }
        PbsCommands::SubmitScript {
            script,
            working_directory,
        } => {
            let job_id = cluster.submit_batch_job_with_script(&script, &working_directory).await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "job_id": job_id }))?);
        }
        PbsCommands::Status { job_id } => {
            let status = cluster.get_job_status(&job_id).await?;
            let reply = serde_json::json!({
                "job_id": job_id,
                "status": status,
                "finished": status.is_finished()
            });
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        PbsCommands::Describe { job_id } => {
            let job = cluster.get_job_descriptor_by_id(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        PbsCommands::Cancel { job_id } => {
            cluster.cancel_job(&job_id).await?;
            println!("Cancelled {}", job_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_without_host_is_local() {
        let cli = Cli::try_parse_from(["catalogctl", "exec", "uname", "-a"]).unwrap();
        let Commands::Exec { ssh, command } = cli.command else {
            panic!("expected exec");
        };
        assert!(ssh.server().is_local());
        assert_eq!(command.join(" "), "uname -a");
    }

    #[test]
    fn test_key_file_authentication() {
        let cli = Cli::try_parse_from([
            "catalogctl",
            "pbs",
            "--host",
            "login.cluster.org",
            "--user",
            "ogce",
            "--key",
            "/home/ogce/.ssh/id_rsa",
            "--port",
            "2222",
            "status",
            "1234.server",
        ])
        .unwrap();
        let Commands::Pbs { ssh, command, .. } = cli.command else {
            panic!("expected pbs");
        };
        let server = ssh.server();
        assert_eq!(server.host.as_deref(), Some("login.cluster.org"));
        assert_eq!(server.user_name, "ogce");
        assert_eq!(server.port, 2222);
        assert_eq!(
            server.authentication,
            AuthenticationInfo::KeyFile {
                private_key_file: "/home/ogce/.ssh/id_rsa".to_string(),
                passphrase: None,
            }
        );
        assert!(matches!(command, PbsCommands::Status { job_id } if job_id == "1234.server"));
    }

    #[test]
    fn test_group_profile_accessible_ids() {
        let cli = Cli::try_parse_from([
            "catalogctl",
            "group-profile",
            "list",
            "--gateway",
            "seagrid",
            "--accessible",
            "a,b",
        ])
        .unwrap();
        let Commands::GroupProfile {
            command: GroupProfileCommands::List { accessible, .. },
        } = cli.command
        else {
            panic!("expected group-profile list");
        };
        assert_eq!(accessible, vec!["a".to_string(), "b".to_string()]);
    }
}

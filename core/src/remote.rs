//! Remote execution via SSH
//!
//! Every call opens its own session, runs one command and drains its output.
//! There is no pooling and no retry.

use async_ssh2_tokio::{client::Client, AuthMethod, ServerCheckMethod};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::{AuthenticationInfo, CommandOutput, Error, Result, ServerInfo};

/// Default time allowed for establishing an SSH session
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote command executor
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    connect_timeout: Duration,
}

impl CommandExecutor {
    /// Create a new executor
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Execute a command on a server
    ///
    /// # Arguments
    ///
    /// * `server` - Target server
    /// * `command` - Command to execute
    ///
    /// # Returns
    ///
    /// Captured stdout, stderr and exit code. A non-zero exit code is not an
    /// error here; callers decide what a failure means.
    #[instrument(skip(self, server), fields(server = %server.display()))]
    pub async fn execute(&self, server: &ServerInfo, command: &str) -> Result<CommandOutput> {
        if server.is_local() {
            self.execute_local(command).await
        } else {
            self.execute_remote(server, command).await
        }
    }

    /// Write `contents` to `path` on the server, replacing any existing file
    ///
    /// Remote writes go over SFTP so the bytes land unchanged.
    pub async fn write_file(&self, server: &ServerInfo, path: &str, contents: &[u8]) -> Result<()> {
        if server.is_local() {
            tokio::fs::write(path, contents).await?;
            return Ok(());
        }

        let staged = std::env::temp_dir().join(format!("appcatalog-upload-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&staged, contents).await?;
        let result = self.upload(server, &staged, path).await;
        if let Err(e) = tokio::fs::remove_file(&staged).await {
            debug!(path = %staged.display(), error = %e, "Failed to remove staged upload");
        }
        result
    }

    /// Read a file from the server
    pub async fn read_file(&self, server: &ServerInfo, path: &str) -> Result<Vec<u8>> {
        if server.is_local() {
            return Ok(tokio::fs::read(path).await?);
        }

        let client = self.open(server).await?;
        let (stdout, stderr, exit_status) = read_channel_bytes(&client, &format!("cat {}", shell_quote(path))).await?;
        if exit_status != Some(0) {
            return Err(Error::RemoteExecutionError(format!(
                "Failed to read {}: {}",
                path,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(stdout)
    }

    /// Copy a local file into a directory on the server
    pub async fn scp_to(&self, server: &ServerInfo, remote_dir: &str, local_file: &Path) -> Result<String> {
        let file_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::RemoteExecutionError(format!("Invalid local file: {}", local_file.display()))
            })?;
        let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), file_name);
        self.upload(server, local_file, &remote_path).await?;
        Ok(remote_path)
    }

    /// Copy a file from the server to a local path
    pub async fn scp_from(&self, server: &ServerInfo, remote_file: &str, local_file: &Path) -> Result<()> {
        let contents = self.read_file(server, remote_file).await?;
        tokio::fs::write(local_file, contents).await?;
        Ok(())
    }

    /// Upload a local file to `remote_path`
    async fn upload(&self, server: &ServerInfo, local_file: &Path, remote_path: &str) -> Result<()> {
        if server.is_local() {
            tokio::fs::copy(local_file, remote_path).await?;
            return Ok(());
        }

        let client = self.open(server).await?;
        client
            .upload_file(local_file, remote_path.to_string())
            .await
            .map_err(|e| Error::RemoteExecutionError(format!("Failed to upload {}: {}", remote_path, e)))?;
        info!(path = %remote_path, server = %server.display(), "File uploaded");
        Ok(())
    }

    /// Create a directory (and parents) on the server
    pub async fn make_directory(&self, server: &ServerInfo, path: &str) -> Result<()> {
        let output = self
            .execute(server, &format!("mkdir -p {}", shell_quote(path)))
            .await?;
        if !output.success() {
            return Err(Error::RemoteExecutionError(format!(
                "Failed to create directory {}: {}",
                path,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    /// Execute locally
    async fn execute_local(&self, command: &str) -> Result<CommandOutput> {
        debug!(command = %command, "Executing locally");

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| Error::RemoteExecutionError(format!("Failed to execute: {}", e)))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute remotely via SSH
    async fn execute_remote(&self, server: &ServerInfo, command: &str) -> Result<CommandOutput> {
        debug!(command = %command, "Executing remotely via SSH");

        let client = self.open(server).await?;
        let result = client
            .execute(command)
            .await
            .map_err(|e| Error::RemoteExecutionError(format!("Remote command failed: {}", e)))?;

        Ok(CommandOutput {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_status as i32,
        })
    }

    /// Open a session within the connect timeout
    async fn open(&self, server: &ServerInfo) -> Result<Client> {
        tokio::time::timeout(self.connect_timeout, connect(server))
            .await
            .map_err(|_| {
                Error::RemoteExecutionError(format!(
                    "Connection to {} timed out after {} seconds",
                    server.display(),
                    self.connect_timeout.as_secs()
                ))
            })?
    }
}

/// Run a command on a fresh channel and collect raw stdout and stderr
async fn read_channel_bytes(client: &Client, command: &str) -> Result<(Vec<u8>, Vec<u8>, Option<u32>)> {
    let mut channel = client
        .get_channel()
        .await
        .map_err(|e| Error::RemoteExecutionError(format!("Failed to open channel: {}", e)))?;
    channel
        .exec(true, command)
        .await
        .map_err(|e| Error::RemoteExecutionError(format!("Remote command failed: {}", e)))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = None;
    while let Some(msg) = channel.wait().await {
        match msg {
            russh::ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
            russh::ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
            russh::ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            _ => {}
        }
    }
    Ok((stdout, stderr, exit_status))
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

/// Connect to a server with the configured authentication
async fn connect(server: &ServerInfo) -> Result<Client> {
    let host = server
        .host
        .clone()
        .ok_or_else(|| Error::RemoteExecutionError("No SSH host specified".into()))?;

    match &server.authentication {
        AuthenticationInfo::Password { password } => {
            connect_with_auth(server, &host, AuthMethod::with_password(password)).await
        }
        AuthenticationInfo::KeyFile {
            private_key_file,
            passphrase,
        } => {
            if !Path::new(private_key_file).exists() {
                return Err(Error::RemoteExecutionError(format!(
                    "SSH key not found: {}",
                    private_key_file
                )));
            }
            debug!(key = %private_key_file, "Using SSH key authentication");
            let auth = AuthMethod::with_key_file(private_key_file, passphrase.as_deref());
            connect_with_auth(server, &host, auth).await
        }
        AuthenticationInfo::DefaultKeys => {
            let keys = default_key_paths();
            let mut last_error = None;
            for key_path in &keys {
                let auth = AuthMethod::with_key_file(key_path, None);
                match connect_with_auth(server, &host, auth).await {
                    Ok(client) => {
                        info!(key = %key_path, "Connected with default key");
                        return Ok(client);
                    }
                    Err(e) => {
                        debug!(key = %key_path, error = %e, "Default key rejected");
                        last_error = Some(e);
                    }
                }
            }
            Err(last_error.unwrap_or_else(|| {
                Error::RemoteExecutionError("No SSH keys found in ~/.ssh".to_string())
            }))
        }
    }
}

/// Connect with specific auth method
async fn connect_with_auth(server: &ServerInfo, host: &str, auth: AuthMethod) -> Result<Client> {
    Client::connect(
        (host.to_string(), server.port),
        &server.user_name,
        auth,
        ServerCheckMethod::NoCheck,
    )
    .await
    .map_err(|e| {
        Error::RemoteExecutionError(format!(
            "Failed to connect to {}: {}",
            server.display(),
            e
        ))
    })
}

/// Existing private keys in the usual locations
pub fn default_key_paths() -> Vec<String> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| "/root".to_string());

    ["id_ed25519", "id_rsa", "id_ecdsa", "id_dsa"]
        .iter()
        .map(|name| format!("{}/.ssh/{}", home, name))
        .filter(|path| Path::new(path).exists())
        .collect()
}

/// Quote a value for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Something that can run commands and move files on one host
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput>;

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
}

/// An executor bound to a single server
#[derive(Debug, Clone)]
pub struct RemoteSession {
    executor: CommandExecutor,
    server: ServerInfo,
}

impl RemoteSession {
    pub fn new(executor: CommandExecutor, server: ServerInfo) -> Self {
        Self { executor, server }
    }

    pub fn server(&self) -> &ServerInfo {
        &self.server
    }
}

#[async_trait]
impl CommandRunner for RemoteSession {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.executor.execute(&self.server, command).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<()> {
        self.executor.write_file(&self.server, path, contents).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.executor.read_file(&self.server, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/a b"), "'/tmp/a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn test_execute_local_captures_output() {
        let executor = CommandExecutor::default();
        let output = executor
            .execute(&ServerInfo::local(), "echo hello; echo oops >&2; exit 3")
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_local_file_round_trip() {
        let executor = CommandExecutor::default();
        let server = ServerInfo::local();
        let dir = std::env::temp_dir().join(format!("appcatalog-{}", uuid::Uuid::new_v4()));
        let dir_str = dir.to_string_lossy().to_string();

        executor.make_directory(&server, &dir_str).await.unwrap();
        let path = format!("{}/script.sh", dir_str);
        executor
            .write_file(&server, &path, b"echo 'quoted'\n")
            .await
            .unwrap();
        let read = executor.read_file(&server, &path).await.unwrap();
        assert_eq!(read, b"echo 'quoted'\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_file_keeps_contents_verbatim() {
        let executor = CommandExecutor::default();
        let server = ServerInfo::local();
        let dir = std::env::temp_dir().join(format!("appcatalog-{}", uuid::Uuid::new_v4()));
        let dir_str = dir.to_string_lossy().to_string();
        executor.make_directory(&server, &dir_str).await.unwrap();

        let marker = dir.join("marker");
        let contents = format!("line1\nAPPCATALOG_EOF\ntouch {}\nno newline at end", marker.display());
        let path = format!("{}/job.pbs", dir_str);
        executor
            .write_file(&server, &path, contents.as_bytes())
            .await
            .unwrap();

        let read = executor.read_file(&server, &path).await.unwrap();
        assert_eq!(read, contents.as_bytes());
        assert!(!marker.exists());

        let binary: Vec<u8> = vec![0xff, 0xfe, 0x00, b'\n', 0x80];
        let binary_path = format!("{}/data.bin", dir_str);
        executor.write_file(&server, &binary_path, &binary).await.unwrap();
        assert_eq!(executor.read_file(&server, &binary_path).await.unwrap(), binary);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_scp_round_trip_local() {
        let executor = CommandExecutor::default();
        let server = ServerInfo::local();
        let dir = std::env::temp_dir().join(format!("appcatalog-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("remote")).unwrap();

        let source = dir.join("input.dat");
        std::fs::write(&source, [0u8, 159, 146, 150]).unwrap();
        let remote_dir = dir.join("remote").to_string_lossy().to_string();
        let remote_path = executor.scp_to(&server, &remote_dir, &source).await.unwrap();
        assert_eq!(remote_path, format!("{}/input.dat", remote_dir));

        let back = dir.join("back.dat");
        executor.scp_from(&server, &remote_path, &back).await.unwrap();
        assert_eq!(std::fs::read(&back).unwrap(), vec![0u8, 159, 146, 150]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_remote_without_host_fails() {
        let err = connect(&ServerInfo::local()).await.err().unwrap();
        assert!(matches!(err, Error::RemoteExecutionError(_)));
    }
}

//! Shared types for remote command execution

use serde::{Deserialize, Serialize};

/// How to authenticate an SSH session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthenticationInfo {
    /// Plain password login
    Password { password: String },
    /// Private key file, optionally passphrase protected
    KeyFile {
        private_key_file: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
    /// Try the usual keys under `~/.ssh`
    DefaultKeys,
}

impl Default for AuthenticationInfo {
    fn default() -> Self {
        Self::DefaultKeys
    }
}

/// Where a command runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Login user (ignored for the local host)
    pub user_name: String,
    /// Host name, `None` for the local host
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub authentication: AuthenticationInfo,
}

impl ServerInfo {
    /// The machine this process runs on
    pub fn local() -> Self {
        Self {
            user_name: std::env::var("USER").unwrap_or_else(|_| "root".to_string()),
            host: None,
            port: default_port(),
            authentication: AuthenticationInfo::DefaultKeys,
        }
    }

    /// A remote host reached over SSH
    pub fn remote(
        user_name: impl Into<String>,
        host: impl Into<String>,
        authentication: AuthenticationInfo,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            host: Some(host.into()),
            port: default_port(),
            authentication,
        }
    }

    /// Is this the local host?
    pub fn is_local(&self) -> bool {
        self.host.is_none()
    }

    /// Get display string for the target
    pub fn display(&self) -> String {
        match &self.host {
            Some(host) if self.port != 22 => format!("{}@{}:{}", self.user_name, host, self.port),
            Some(host) => format!("{}@{}", self.user_name, host),
            None => "localhost".to_string(),
        }
    }
}

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

fn default_port() -> u16 {
    22
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_display() {
        assert_eq!(ServerInfo::local().display(), "localhost");

        let mut remote = ServerInfo::remote("ogce", "gw111.iu.xsede.org", AuthenticationInfo::DefaultKeys);
        assert_eq!(remote.display(), "ogce@gw111.iu.xsede.org");

        remote.port = 2222;
        assert_eq!(remote.display(), "ogce@gw111.iu.xsede.org:2222");
    }

    #[test]
    fn test_authentication_json() {
        let auth: AuthenticationInfo = serde_json::from_str(
            r#"{"method": "key_file", "private_key_file": "/home/u/.ssh/id_rsa"}"#,
        )
        .unwrap();
        assert_eq!(
            auth,
            AuthenticationInfo::KeyFile {
                private_key_file: "/home/u/.ssh/id_rsa".to_string(),
                passphrase: None
            }
        );
    }
}

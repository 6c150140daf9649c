//! Batch cluster access over a command runner
//!
//! `PbsCluster` drives a PBS/Torque installation with `qsub`, `qstat -f` and
//! `qdel`. Anything written to stderr by those commands is treated as a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::remote::{shell_quote, CommandRunner};
use crate::{Error, Result};

/// Job states reported by `qstat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Completed
    C,
    /// Exiting after having run
    E,
    /// Held
    H,
    /// Queued
    Q,
    /// Running
    R,
    /// Being moved
    T,
    /// Waiting for its execution time
    W,
    /// Suspended
    S,
    /// Anything else
    U,
}

impl JobStatus {
    /// Parse a `job_state` value
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "C" => JobStatus::C,
            "E" => JobStatus::E,
            "H" => JobStatus::H,
            "Q" => JobStatus::Q,
            "R" => JobStatus::R,
            "T" => JobStatus::T,
            "W" => JobStatus::W,
            "S" => JobStatus::S,
            _ => JobStatus::U,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::C | JobStatus::E)
    }
}

/// Everything needed to submit a job and everything `qstat -f` reports back
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDescriptor {
    // Submission
    pub job_name: Option<String>,
    pub working_directory: String,
    pub executable_path: String,
    pub inputs: Vec<String>,
    pub queue_name: Option<String>,
    pub node_count: Option<u32>,
    pub processes_per_node: Option<u32>,
    pub cpu_count: Option<u32>,
    /// Wall time limit in minutes
    pub max_wall_time: Option<u32>,
    pub account_string: Option<String>,
    pub mail_address: Option<String>,
    pub standard_out_file: Option<String>,
    pub standard_error_file: Option<String>,
    pub environment: Vec<(String, String)>,
    pub module_load_commands: Vec<String>,
    pub pre_job_commands: Vec<String>,
    pub post_job_commands: Vec<String>,

    // Reported by qstat
    pub job_id: Option<String>,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub used_cpu_time: Option<String>,
    pub used_memory: Option<String>,
    pub elapsed_time: Option<String>,
    pub ctime: Option<String>,
    pub qtime: Option<String>,
    pub mtime: Option<String>,
    pub stime: Option<String>,
    pub comp_time: Option<String>,
    pub execute_node: Option<String>,
    pub variable_list: Option<String>,
    pub submit_args: Option<String>,
}

impl JobDescriptor {
    /// Render a PBS batch script for this job
    pub fn to_pbs_script(&self) -> String {
        let mut script = String::from("#! /bin/sh\n");

        if let Some(name) = &self.job_name {
            let _ = writeln!(script, "#PBS -N {}", name);
        }
        if let Some(queue) = &self.queue_name {
            let _ = writeln!(script, "#PBS -q {}", queue);
        }
        if let Some(account) = &self.account_string {
            let _ = writeln!(script, "#PBS -A {}", account);
        }
        if let Some(mail) = &self.mail_address {
            let _ = writeln!(script, "#PBS -m abe");
            let _ = writeln!(script, "#PBS -M {}", mail);
        }
        if let Some(out) = &self.standard_out_file {
            let _ = writeln!(script, "#PBS -o {}", out);
        }
        if let Some(err) = &self.standard_error_file {
            let _ = writeln!(script, "#PBS -e {}", err);
        }
        match (self.node_count, self.processes_per_node) {
            (Some(nodes), Some(ppn)) => {
                let _ = writeln!(script, "#PBS -l nodes={}:ppn={}", nodes, ppn);
            }
            (Some(nodes), None) => {
                let _ = writeln!(script, "#PBS -l nodes={}", nodes);
            }
            (None, _) => {
                if let Some(cpus) = self.cpu_count {
                    let _ = writeln!(script, "#PBS -l ncpus={}", cpus);
                }
            }
        }
        if let Some(minutes) = self.max_wall_time {
            let _ = writeln!(
                script,
                "#PBS -l walltime={:02}:{:02}:00",
                minutes / 60,
                minutes % 60
            );
        }
        script.push_str("#PBS -V\n\n");

        for (name, value) in &self.environment {
            let _ = writeln!(script, "export {}={}", name, shell_quote(value));
        }
        let _ = writeln!(script, "cd {}", shell_quote(&self.working_directory));
        for cmd in self
            .module_load_commands
            .iter()
            .chain(self.pre_job_commands.iter())
        {
            let _ = writeln!(script, "{}", cmd);
        }

        let mut line = self.executable_path.clone();
        for input in &self.inputs {
            line.push(' ');
            line.push_str(input);
        }
        let _ = writeln!(script, "{}", line);

        for cmd in &self.post_job_commands {
            let _ = writeln!(script, "{}", cmd);
        }
        script
    }

    /// Build a descriptor from `qstat -f` output
    pub fn from_qstat(output: &str) -> Self {
        let lines: Vec<&str> = output.lines().collect();
        let mut desc = JobDescriptor::default();
        let mut i = 0;

        while i < lines.len() {
            let raw = lines[i];
            let split = if raw.contains('=') {
                raw.split_once('=')
            } else {
                raw.split_once(':')
            };

            if let Some((header, value)) = split {
                let header = header.trim();
                let mut value = value.trim().to_string();
                debug!(header = %header, value = %value, "qstat field");

                match header {
                    "Variable_List" | "submit_args" => {
                        while i + 1 < lines.len() && lines[i + 1].starts_with('\t') {
                            value.push_str(lines[i + 1]);
                            i += 1;
                        }
                        let value = value.replace('\t', "");
                        if header == "Variable_List" {
                            desc.variable_list = Some(value);
                        } else {
                            desc.submit_args = Some(value);
                        }
                    }
                    "Output_Path" | "Error_Path" => {
                        if let Some(next) = lines.get(i + 1) {
                            if !next.contains('=') && !next.contains(':') {
                                value.push_str(next.trim());
                                i += 1;
                            }
                        }
                        if header == "Output_Path" {
                            desc.standard_out_file = Some(value);
                        } else {
                            desc.standard_error_file = Some(value);
                        }
                    }
                    "Job Id" => desc.job_id = Some(value),
                    "Job_Name" => desc.job_name = Some(value),
                    "Account_Name" => desc.account_string = Some(value),
                    "job_state" => desc.status = Some(value),
                    "Job_Owner" => desc.owner = Some(value),
                    "resources_used.cput" => desc.used_cpu_time = Some(value),
                    "resources_used.mem" => desc.used_memory = Some(value),
                    "resources_used.walltime" => desc.elapsed_time = Some(value),
                    "queue" => desc.queue_name = Some(value),
                    "ctime" => desc.ctime = Some(value),
                    "qtime" => desc.qtime = Some(value),
                    "mtime" => desc.mtime = Some(value),
                    "start_time" => desc.stime = Some(value),
                    "comp_time" => desc.comp_time = Some(value),
                    "exec_host" => desc.execute_node = Some(value),
                    _ => {}
                }
            }
            i += 1;
        }
        desc
    }
}

/// Operations offered by a batch cluster
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Generate a script for the job, upload it and submit it
    async fn submit_batch_job(&self, job: &JobDescriptor) -> Result<String>;

    /// Upload an existing script and submit it
    async fn submit_batch_job_with_script(&self, script_path: &Path, working_directory: &str) -> Result<String>;

    async fn get_job_descriptor_by_id(&self, job_id: &str) -> Result<JobDescriptor>;

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus>;

    async fn cancel_job(&self, job_id: &str) -> Result<()>;

    async fn scp_to(&self, remote_dir: &str, local_file: &Path) -> Result<String>;

    async fn scp_from(&self, remote_file: &str, local_file: &Path) -> Result<()>;

    async fn make_directory(&self, path: &str) -> Result<()>;
}

/// A PBS/Torque cluster
pub struct PbsCluster<R> {
    runner: R,
    installed_path: String,
}

impl<R: CommandRunner> PbsCluster<R> {
    /// `installed_path` is the directory holding `qsub`/`qstat`/`qdel`
    pub fn new(runner: R, installed_path: &str) -> Self {
        let installed_path = if installed_path.is_empty() || installed_path.ends_with('/') {
            installed_path.to_string()
        } else {
            format!("{}/", installed_path)
        };
        Self {
            runner,
            installed_path,
        }
    }

    pub fn installed_path(&self) -> &str {
        &self.installed_path
    }

    /// Run a PBS command, failing on any stderr output
    async fn run_pbs(&self, command: &str) -> Result<String> {
        let output = self
            .runner
            .run(&format!("{}{}", self.installed_path, command))
            .await?;
        if !output.stderr.trim().is_empty() {
            return Err(Error::RemoteExecutionError(output.stderr.trim().to_string()));
        }
        Ok(output.stdout)
    }

    async fn submit_script(&self, file_name: &str, contents: &[u8], working_directory: &str) -> Result<String> {
        let remote_path = format!("{}/{}", working_directory.trim_end_matches('/'), file_name);
        self.runner.write_file(&remote_path, contents).await?;

        let stdout = self
            .run_pbs(&format!("qsub {}", shell_quote(&remote_path)))
            .await?;
        let job_id = stdout.replace('\n', "").trim().to_string();
        info!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }
}

#[async_trait]
impl<R: CommandRunner> Cluster for PbsCluster<R> {
    #[instrument(skip(self, job), fields(job_name = ?job.job_name))]
    async fn submit_batch_job(&self, job: &JobDescriptor) -> Result<String> {
        let script = job.to_pbs_script();
        debug!(script = %script, "Generated PBS script");
        let file_name = format!("{}.pbs", uuid::Uuid::new_v4().simple());
        self.submit_script(&file_name, script.as_bytes(), &job.working_directory)
            .await
    }

    async fn submit_batch_job_with_script(&self, script_path: &Path, working_directory: &str) -> Result<String> {
        let contents = tokio::fs::read(script_path).await?;
        let file_name = script_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::RemoteExecutionError(format!("Invalid script path: {}", script_path.display()))
            })?;
        self.submit_script(file_name, &contents, working_directory)
            .await
    }

    async fn get_job_descriptor_by_id(&self, job_id: &str) -> Result<JobDescriptor> {
        let stdout = self.run_pbs(&format!("qstat -f {}", shell_quote(job_id))).await?;
        Ok(JobDescriptor::from_qstat(&stdout))
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        let stdout = self.run_pbs(&format!("qstat -f {}", shell_quote(job_id))).await?;
        for line in stdout.lines() {
            if let Some((key, value)) = line.split_once('=') {
                if key.contains("job_state") {
                    return Ok(JobStatus::parse(&value.replace(' ', "")));
                }
            }
        }
        Err(Error::RemoteExecutionError(format!(
            "No job_state reported for job {}",
            job_id
        )))
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.run_pbs(&format!("qdel {}", shell_quote(job_id))).await?;
        info!(job_id = %job_id, "Job cancelled");
        Ok(())
    }

    async fn scp_to(&self, remote_dir: &str, local_file: &Path) -> Result<String> {
        let contents = tokio::fs::read(local_file).await?;
        let file_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::RemoteExecutionError(format!("Invalid local file: {}", local_file.display()))
            })?;
        let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), file_name);
        self.runner.write_file(&remote_path, &contents).await?;
        Ok(remote_path)
    }

    async fn scp_from(&self, remote_file: &str, local_file: &Path) -> Result<()> {
        let contents = self.runner.read_file(remote_file).await?;
        tokio::fs::write(local_file, contents).await?;
        Ok(())
    }

    async fn make_directory(&self, path: &str) -> Result<()> {
        let output = self
            .runner
            .run(&format!("mkdir -p {}", shell_quote(path)))
            .await?;
        if !output.success() {
            return Err(Error::RemoteExecutionError(output.stderr.trim().to_string()));
        }
        Ok(())
    }
}

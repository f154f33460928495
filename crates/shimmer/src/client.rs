//! Pebble client that drives the `pebble` CLI
//!
//! Every operation builds a `pebble` command line, runs it through the
//! [`Runner`] and decodes the printed output. A non-zero exit becomes
//! [`Error::CommandFailed`], a missing binary [`Error::ConnectionUnavailable`].

use command_executor::{Command, IntoSignal, Runner, signal_name};
use globset::Glob;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::exec::{Encoding, ExecProcess};
use crate::records::{
    Change, ChangeId, CheckInfo, FileInfo, Identity, Notice, Plan, ServiceInfo, SystemInfo,
    notice, parse_changes, parse_checks, parse_identities, parse_listing, parse_notices,
    parse_services,
};

/// Level filter for `get_checks`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckLevel {
    /// Liveness checks
    Alive,
    /// Readiness checks
    Ready,
}

impl CheckLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Ready => "ready",
        }
    }
}

/// Selector for `get_changes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    /// Every change
    All,
    /// Changes still running
    InProgress,
    /// Finished changes
    Ready,
}

impl ChangeState {
    fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::InProgress => "in-progress",
            Self::Ready => "ready",
        }
    }
}

/// User filter for `get_notices`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticesUsers {
    /// Notices of every user; needs admin access
    All,
}

/// Filters for `get_notices`
#[derive(Debug, Clone, Default)]
pub struct NoticesQuery {
    /// Widen the user filter
    pub users: Option<NoticesUsers>,
    /// Only notices of this user
    pub user_id: Option<u32>,
    /// Only these notice types
    pub types: Vec<String>,
    /// Only these keys
    pub keys: Vec<String>,
}

/// Options for `make_dir`
#[derive(Debug, Clone, Default)]
pub struct MakeDirOptions {
    /// Create missing parents too
    pub make_parents: bool,
    /// Permission bits of the new directory
    pub permissions: Option<u32>,
    /// Owner by name; wins over `user_id`
    pub user: Option<String>,
    /// Owner by uid
    pub user_id: Option<u32>,
    /// Group by name; wins over `group_id`
    pub group: Option<String>,
    /// Group by gid
    pub group_id: Option<u32>,
}

/// Options for `exec`
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Run in the context of this service (its environment, user, directory)
    pub service_context: Option<String>,
    /// Extra environment for the command, in order
    pub environment: IndexMap<String, String>,
    /// Working directory
    pub working_dir: Option<String>,
    /// Deadline, passed to pebble and applied by the local waits
    pub timeout: Option<Duration>,
    /// Run as this user; wins over `user_id`
    pub user: Option<String>,
    /// Run as this uid
    pub user_id: Option<u32>,
    /// Run with this group; wins over `group_id`
    pub group: Option<String>,
    /// Run with this gid
    pub group_id: Option<u32>,
    /// Input written by [`ExecProcess::wait_output`]
    pub stdin: Option<Vec<u8>>,
    /// How captured output is returned
    pub encoding: Encoding,
    /// Fold standard error into standard output
    pub combine_stderr: bool,
}

/// A pebble client that shells out to the `pebble` binary
#[derive(Debug, Clone)]
pub struct PebbleCliClient {
    config: ClientConfig,
    runner: Runner,
}

impl Default for PebbleCliClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl PebbleCliClient {
    /// Create a client. The environment is captured here and reused for
    /// every command this client runs.
    pub fn new(config: ClientConfig) -> Self {
        let runner = Runner::new(&config.binary)
            .with_env(Arc::new(config.environment()))
            .with_default_timeout(config.timeout);
        Self { config, runner }
    }

    /// The configuration the client was built from
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The runner used for every command
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.runner.command(args)
    }

    async fn output(&self, command: &Command) -> Result<String> {
        Ok(self.runner.run_checked(command).await?.stdout_text())
    }

    async fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.output(&self.command(args)).await
    }

    /// Client version as printed by `pebble version --client`
    pub async fn get_system_info(&self) -> Result<SystemInfo> {
        let stdout = self.run(["version", "--client"]).await?;
        Ok(SystemInfo::from_output(&stdout))
    }

    /// The combined plan
    pub async fn get_plan(&self) -> Result<Plan> {
        let stdout = self.run(["plan"]).await?;
        Plan::from_yaml(&stdout)
    }

    /// Replan; a zero `timeout` returns without waiting for the change
    pub async fn replan_services(&self, timeout: Duration) -> Result<ChangeId> {
        self.change_command(vec!["replan".to_string()], timeout).await
    }

    /// Start every service with `startup: enabled`
    ///
    /// The CLI has no separate command for this; replan does the same.
    pub async fn autostart_services(&self, timeout: Duration) -> Result<ChangeId> {
        self.replan_services(timeout).await
    }

    /// Start the named services
    pub async fn start_services(&self, services: &[&str], timeout: Duration) -> Result<ChangeId> {
        self.service_change("start", services, timeout).await
    }

    /// Stop the named services
    pub async fn stop_services(&self, services: &[&str], timeout: Duration) -> Result<ChangeId> {
        self.service_change("stop", services, timeout).await
    }

    /// Restart the named services
    pub async fn restart_services(
        &self,
        services: &[&str],
        timeout: Duration,
    ) -> Result<ChangeId> {
        self.service_change("restart", services, timeout).await
    }

    async fn service_change(
        &self,
        verb: &str,
        services: &[&str],
        timeout: Duration,
    ) -> Result<ChangeId> {
        require_names("services", services)?;
        let mut args = vec![verb.to_string()];
        args.extend(services.iter().map(|s| s.to_string()));
        self.change_command(args, timeout).await
    }

    /// Run a change-producing command. The change id is only printed with
    /// `--no-wait`; otherwise pebble blocks until the change is done.
    async fn change_command(&self, mut args: Vec<String>, timeout: Duration) -> Result<ChangeId> {
        let no_wait = timeout.is_zero();
        if no_wait {
            args.push("--no-wait".to_string());
        }

        let mut command = self.command(&args);
        if !no_wait {
            command.timeout(Some(timeout.max(self.config.timeout)));
        }
        let stdout = self.output(&command).await?;

        if no_wait {
            Ok(ChangeId::new(stdout.trim()))
        } else {
            Ok(ChangeId::unknown())
        }
    }

    /// Service status, restricted to `names` unless empty
    pub async fn get_services(&self, names: &[&str]) -> Result<Vec<ServiceInfo>> {
        let stdout = self.run(["services", "--abs-time"]).await?;
        let mut services = parse_services(&stdout)?;
        if !names.is_empty() {
            services.retain(|s| names.contains(&s.name.as_str()));
        }
        debug!(count = services.len(), "decoded services");
        Ok(services)
    }

    /// Send `sig` to the named services
    pub async fn send_signal(&self, sig: impl IntoSignal, services: &[&str]) -> Result<()> {
        require_names("services", services)?;
        let sig = sig.into_signal()?;

        let mut args = vec!["signal".to_string(), signal_name(sig).to_string()];
        args.extend(services.iter().map(|s| s.to_string()));
        self.run(&args).await?;
        Ok(())
    }

    /// Health check status, optionally by level and restricted to `names`
    pub async fn get_checks(
        &self,
        level: Option<CheckLevel>,
        names: &[&str],
    ) -> Result<Vec<CheckInfo>> {
        let mut args = vec!["checks"];
        if let Some(level) = level {
            args.extend(["--level", level.as_str()]);
        }

        let stdout = self.run(&args).await?;
        let mut checks = parse_checks(&stdout)?;
        if !names.is_empty() {
            checks.retain(|c| names.contains(&c.name.as_str()));
        }
        Ok(checks)
    }

    /// Start the named checks and return their names
    pub async fn start_checks(&self, checks: &[&str]) -> Result<Vec<String>> {
        self.check_command("start-checks", checks).await
    }

    /// Stop the named checks and return their names
    pub async fn stop_checks(&self, checks: &[&str]) -> Result<Vec<String>> {
        self.check_command("stop-checks", checks).await
    }

    async fn check_command(&self, verb: &str, checks: &[&str]) -> Result<Vec<String>> {
        require_names("checks", checks)?;
        let mut args = vec![verb];
        args.extend_from_slice(checks);
        self.run(&args).await?;
        // The CLI does not report which checks changed state
        Ok(checks.iter().map(|c| c.to_string()).collect())
    }

    /// List `path`; with `itself`, describe the directory rather than its
    /// contents. `pattern` is a glob matched against entry names.
    pub async fn list_files(
        &self,
        path: &str,
        pattern: Option<&str>,
        itself: bool,
    ) -> Result<Vec<FileInfo>> {
        let matcher = pattern
            .map(|p| {
                Glob::new(p)
                    .map(|g| g.compile_matcher())
                    .map_err(|e| Error::InvalidArgument(format!("invalid pattern {p:?}: {e}")))
            })
            .transpose()?;

        let mut args = vec!["ls", "--abs-time", "-l", path];
        if itself {
            args.push("-d");
        }

        let stdout = self.run(&args).await?;
        let mut files = parse_listing(path, &stdout)?;
        if let Some(matcher) = matcher {
            files.retain(|f| matcher.is_match(&f.name));
        }
        Ok(files)
    }

    /// Create a directory
    pub async fn make_dir(&self, path: &str, options: &MakeDirOptions) -> Result<()> {
        let mut args = vec!["mkdir".to_string(), path.to_string()];
        if options.make_parents {
            args.push("-p".to_string());
        }
        if let Some(mode) = options.permissions {
            args.extend(["-m".to_string(), format!("{mode:03o}")]);
        }
        push_owner_args(
            &mut args,
            options.user.as_deref(),
            options.user_id,
            options.group.as_deref(),
            options.group_id,
        );

        self.run(&args).await?;
        Ok(())
    }

    /// Remove a file, or a directory tree with `recursive`
    pub async fn remove_path(&self, path: &str, recursive: bool) -> Result<()> {
        let mut args = vec!["rm", path];
        if recursive {
            args.push("--recursive");
        }
        self.run(&args).await?;
        Ok(())
    }

    /// Start `command` through `pebble exec` and hand back the live process
    pub async fn exec(&self, command: &[&str], options: ExecOptions) -> Result<ExecProcess> {
        if command.is_empty() {
            return Err(Error::InvalidArgument("command cannot be empty".to_string()));
        }

        let mut args = vec!["exec".to_string()];
        if let Some(context) = &options.service_context {
            args.extend(["--context".to_string(), context.clone()]);
        }
        if let Some(dir) = &options.working_dir {
            args.extend(["-w".to_string(), dir.clone()]);
        }
        if let Some(timeout) = options.timeout {
            args.extend(["--timeout".to_string(), seconds(timeout)]);
        }
        push_owner_args(
            &mut args,
            options.user.as_deref(),
            options.user_id,
            options.group.as_deref(),
            options.group_id,
        );
        for (key, value) in &options.environment {
            args.extend(["--env".to_string(), format!("{key}={value}")]);
        }
        args.push("--".to_string());
        args.extend(command.iter().map(|c| c.to_string()));

        let child = self.runner.spawn(&self.command(&args))?;
        let command: Vec<String> = command.iter().map(|c| c.to_string()).collect();
        info!(pid = child.pid(), command = ?command, "started exec");

        let mut process = ExecProcess::new(child, command)
            .with_encoding(options.encoding)
            .with_combined_stderr(options.combine_stderr)
            .with_timeout(options.timeout);
        if let Some(input) = options.stdin {
            process = process.with_input(input);
        }
        Ok(process)
    }

    /// Changes, optionally only those of one service
    pub async fn get_changes(
        &self,
        select: Option<ChangeState>,
        service: Option<&str>,
    ) -> Result<Vec<Change>> {
        let mut args = vec!["changes", "--abs-time"];
        if let Some(select) = select {
            args.extend(["--select", select.as_str()]);
        }
        if let Some(service) = service {
            args.push(service);
        }

        let stdout = self.run(&args).await?;
        parse_changes(&stdout)
    }

    /// Notices matching `query`
    pub async fn get_notices(&self, query: &NoticesQuery) -> Result<Vec<Notice>> {
        let mut args = vec!["notices".to_string(), "--abs-time".to_string()];
        if let Some(NoticesUsers::All) = query.users {
            args.extend(["--users".to_string(), "all".to_string()]);
        }
        if let Some(uid) = query.user_id {
            args.extend(["--uid".to_string(), uid.to_string()]);
        }
        for notice_type in &query.types {
            args.extend(["--type".to_string(), notice_type.clone()]);
        }
        for key in &query.keys {
            args.extend(["--key".to_string(), key.clone()]);
        }

        let stdout = self.run(&args).await?;
        parse_notices(&stdout)
    }

    /// One notice by id
    ///
    /// `pebble notice` rejects unknown ids; the record itself comes from the
    /// notices listing.
    pub async fn get_notice(&self, id: &str) -> Result<Notice> {
        self.run(["notice", id]).await?;
        self.get_notices(&NoticesQuery::default())
            .await?
            .into_iter()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("notice {id}")))
    }

    /// Record a custom notice and return its id
    pub async fn notify(
        &self,
        key: &str,
        data: &[(&str, &str)],
        repeat_after: Option<Duration>,
    ) -> Result<String> {
        let mut args = vec!["notify".to_string()];
        if let Some(repeat_after) = repeat_after {
            args.extend(["--repeat-after".to_string(), seconds(repeat_after)]);
        }
        args.push(key.to_string());
        args.extend(data.iter().map(|(name, value)| format!("{name}={value}")));

        let stdout = self.run(&args).await?;
        notice::recorded_id(&stdout).ok_or_else(|| Error::decode("notice id", stdout.trim()))
    }

    /// Identities keyed by name, in listing order
    pub async fn get_identities(&self) -> Result<IndexMap<String, Identity>> {
        let stdout = self.run(["identities"]).await?;
        parse_identities(&stdout)
    }
}

fn require_names(what: &str, names: &[&str]) -> Result<()> {
    if names.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} list cannot be empty")));
    }
    Ok(())
}

fn push_owner_args(
    args: &mut Vec<String>,
    user: Option<&str>,
    user_id: Option<u32>,
    group: Option<&str>,
    group_id: Option<u32>,
) {
    match (user, user_id) {
        (Some(user), _) => args.extend(["--user".to_string(), user.to_string()]),
        (None, Some(uid)) => args.extend(["--uid".to_string(), uid.to_string()]),
        (None, None) => {}
    }
    match (group, group_id) {
        (Some(group), _) => args.extend(["--group".to_string(), group.to_string()]),
        (None, Some(gid)) => args.extend(["--gid".to_string(), gid.to_string()]),
        (None, None) => {}
    }
}

/// Render a duration the way pebble's flags expect (`1.5s`)
fn seconds(duration: Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_format() {
        assert_eq!(seconds(Duration::from_secs(5)), "5s");
        assert_eq!(seconds(Duration::from_millis(1500)), "1.5s");
    }

    #[test]
    fn test_owner_args_prefer_names() {
        let mut args = Vec::new();
        push_owner_args(&mut args, Some("app"), Some(1000), None, Some(100));
        assert_eq!(args, vec!["--user", "app", "--gid", "100"]);
    }

    #[test]
    fn test_require_names() {
        assert!(matches!(
            require_names("services", &[]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(require_names("services", &["svc"]).is_ok());
    }

    #[test]
    fn test_filter_enums() {
        assert_eq!(CheckLevel::Ready.as_str(), "ready");
        assert_eq!(ChangeState::InProgress.as_str(), "in-progress");
    }
}

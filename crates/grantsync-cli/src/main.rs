use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use grantsync_core::{
    GrantReconciler, GrantSpec, GrantState, Plan, ReconcilerConfig, ResourceState, Verification,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod config;
mod remote;
mod state_file;

use config::CliConfig;
use remote::RemoteConnection;
use state_file::StateFile;

#[derive(Parser)]
#[command(name = "grantsync")]
#[command(about = "Converge declared database grants onto a server", long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct ServerArgs {
    /// Server address (host:port). Default: localhost:8765 or from ~/.grantsyncrc
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,
    /// Authentication token (if server requires it)
    #[arg(short, long, global = true, env = "GRANTSYNC_TOKEN")]
    token: Option<String>,
    /// Username for login (prompts for a password when --password is absent)
    #[arg(short, long, global = true)]
    user: Option<String>,
    /// Password for login
    #[arg(short = 'P', long, global = true, env = "GRANTSYNC_PASSWORD")]
    password: Option<String>,
    /// Directory holding grant state files
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    /// Continue Remove when the server reports the grant option never existed
    #[arg(long, global = true)]
    tolerate_missing_grant_option: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the grant described by a JSON file and record it
    ///
    /// A recorded grant whose description changed is removed and re-applied.
    Apply { grant_file: PathBuf },
    /// Confirm a recorded grant still exists; forget it when it does not
    Verify { grant_file: PathBuf },
    /// Revoke a recorded grant and forget it
    Remove { grant_file: PathBuf },
    /// Print the statements apply (or remove with --destroy) would run
    Plan {
        grant_file: PathBuf,
        #[arg(long)]
        destroy: bool,
    },
}

fn main() -> Result<()> {
    let log_format = std::env::var("GRANTSYNC_LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let file_config = CliConfig::load();
    let settings = Settings::merge(&cli.server, file_config);

    match &cli.command {
        Commands::Apply { grant_file } => apply(&settings, grant_file),
        Commands::Verify { grant_file } => verify(&settings, grant_file),
        Commands::Remove { grant_file } => remove(&settings, grant_file),
        Commands::Plan { grant_file, destroy } => plan(&settings, grant_file, *destroy),
    }
}

/// Command-line flags layered over ~/.grantsyncrc.
struct Settings {
    host: String,
    token: Option<String>,
    login: Option<(String, Option<String>)>,
    state_dir: PathBuf,
    timeout_ms: Option<u32>,
    reconciler: ReconcilerConfig,
}

impl Settings {
    fn merge(args: &ServerArgs, file: CliConfig) -> Self {
        let tolerate = args.tolerate_missing_grant_option
            || file.tolerate_missing_grant_option.unwrap_or(false);
        let user = args.user.clone().or_else(|| file.user.clone());
        Self {
            host: args.host.clone().unwrap_or_else(|| file.host().to_string()),
            token: args.token.clone().or_else(|| file.token.clone()),
            login: user.map(|u| (u, args.password.clone())),
            state_dir: args.state_dir.clone().unwrap_or_else(|| file.state_dir()),
            timeout_ms: file.timeout_ms,
            reconciler: ReconcilerConfig::builder()
                .tolerate_missing_grant_option(tolerate)
                .build(),
        }
    }

    fn connect(&self) -> Result<RemoteConnection> {
        let mut builder = grantsync_client::Config::builder();
        if let Some(ref token) = self.token {
            builder = builder.token(token.clone());
        }
        if let Some(ms) = self.timeout_ms {
            builder = builder
                .query_timeout(ms)
                .read_timeout(Duration::from_millis(u64::from(ms)).max(Duration::from_secs(1)));
        }
        let login = match &self.login {
            Some((user, Some(password))) => Some((user.clone(), password.clone())),
            Some((user, None)) => {
                let password = rpassword::prompt_password(format!("Password for {}: ", user))
                    .context("reading password")?;
                Some((user.clone(), password))
            }
            None => None,
        };
        RemoteConnection::connect(&self.host, builder.build(), login)
    }

    fn state_file(&self, grant_file: &Path) -> StateFile {
        StateFile::for_grant_file(&self.state_dir, grant_file)
    }
}

fn load_grant(path: &Path) -> Result<GrantSpec> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    GrantSpec::from_fields(&value).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

fn load_recorded(state_file: &StateFile) -> Result<GrantState> {
    state_file.load()?.ok_or_else(|| {
        anyhow!(
            "no recorded grant at {}; run `grantsync apply` first",
            state_file.path().display()
        )
    })
}

fn report(verification: &Verification, state: &GrantState) {
    match verification {
        Verification::Confirmed => {
            if let Some(id) = state.identity() {
                println!("{}: present", id);
            }
        }
        Verification::Drifted { cause } => {
            println!(
                "{}: missing on server ({}); it will be re-created on the next apply",
                state.spec().identity(),
                cause
            );
        }
    }
}

/// Close without letting a shutdown failure mask the error being returned.
fn close_after_error(conn: RemoteConnection) {
    if let Err(e) = conn.close() {
        tracing::warn!(error = %e, "failed to close connection");
    }
}

fn apply(settings: &Settings, grant_file: &Path) -> Result<()> {
    let desired = load_grant(grant_file)?;
    let state_file = settings.state_file(grant_file);
    let reconciler = GrantReconciler::new(settings.reconciler.clone());
    let conn = settings.connect()?;

    let mut state = match state_file.load()? {
        Some(recorded) => recorded,
        None => GrantState::new(desired.clone()),
    };
    let result = if state.exists() {
        reconciler.replace(&conn, &mut state, desired)
    } else {
        state = GrantState::new(desired);
        reconciler.apply(&conn, &mut state)
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            // A failed replace may already have removed the old grant.
            if !state.exists() {
                state_file.delete()?;
            }
            close_after_error(conn);
            return Err(e.into());
        }
    };

    if state.exists() {
        state_file.save(&state)?;
    } else {
        state_file.delete()?;
    }
    report(&outcome, &state);
    conn.close()
}

fn verify(settings: &Settings, grant_file: &Path) -> Result<()> {
    let state_file = settings.state_file(grant_file);
    let mut state = load_recorded(&state_file)?;
    let reconciler = GrantReconciler::new(settings.reconciler.clone());
    let conn = settings.connect()?;

    let outcome = reconciler.verify(&conn, &mut state);
    if state.exists() {
        state_file.save(&state)?;
    } else {
        state_file.delete()?;
    }
    report(&outcome, &state);
    conn.close()
}

fn remove(settings: &Settings, grant_file: &Path) -> Result<()> {
    let state_file = settings.state_file(grant_file);
    let mut state = load_recorded(&state_file)?;
    let reconciler = GrantReconciler::new(settings.reconciler.clone());
    let conn = settings.connect()?;

    if let Err(e) = reconciler.remove(&conn, &mut state) {
        close_after_error(conn);
        if e.is_partial_revoke() {
            bail!(
                "{}: grant option revoked but privileges remain, manual follow-up required: {}",
                state.spec().identity(),
                e
            );
        }
        return Err(e.into());
    }
    state_file.delete()?;
    println!("{}: removed", state.spec().identity());
    conn.close()
}

fn plan(settings: &Settings, grant_file: &Path, destroy: bool) -> Result<()> {
    let state_file = settings.state_file(grant_file);
    let recorded = state_file.load()?.filter(|s| s.exists());
    let old = recorded.as_ref().map(|s| s.spec());

    let plan = if destroy {
        Plan::between(old, None)
    } else {
        let desired = load_grant(grant_file)?;
        Plan::between(old, Some(&desired))
    };

    if plan.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for statement in plan.statements() {
        println!("{};", statement);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServerArgs {
        ServerArgs {
            host: None,
            token: None,
            user: None,
            password: None,
            state_dir: None,
            tolerate_missing_grant_option: false,
        }
    }

    #[test]
    fn test_settings_flags_override_file() {
        let file = CliConfig {
            host: Some("db1:9000".into()),
            token: Some("file-token".into()),
            user: Some("admin".into()),
            state_dir: Some(PathBuf::from("/tmp/state")),
            tolerate_missing_grant_option: Some(true),
            timeout_ms: Some(2000),
        };
        let mut cli_args = args();
        cli_args.host = Some("db2:9000".into());
        cli_args.password = Some("pw".into());

        let settings = Settings::merge(&cli_args, file);
        assert_eq!(settings.host, "db2:9000");
        assert_eq!(settings.token.as_deref(), Some("file-token"));
        assert_eq!(
            settings.login,
            Some(("admin".to_string(), Some("pw".to_string())))
        );
        assert_eq!(settings.state_dir, PathBuf::from("/tmp/state"));
        assert!(settings.reconciler.tolerate_missing_grant_option);
    }

    #[test]
    fn test_load_grant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        std::fs::write(
            &path,
            r#"{"user": "app", "database": "*", "privileges": ["SELECT"], "grant": true}"#,
        )
        .unwrap();
        let spec = load_grant(&path).unwrap();
        assert_eq!(spec.identity().as_str(), "app@localhost:*");
        assert!(spec.grant_option());

        std::fs::write(&path, r#"{"user": "app", "database": "*", "privileges": []}"#).unwrap();
        assert!(load_grant(&path).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "grantsync",
            "plan",
            "grants/app.json",
            "--destroy",
            "-H",
            "db:1",
        ])
        .unwrap();
        assert_eq!(cli.server.host.as_deref(), Some("db:1"));
        assert!(matches!(cli.command, Commands::Plan { destroy: true, .. }));
    }

    use grantsync_core::ResourceState;
    use serde_json::{json, Value};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;
    use tempfile::TempDir;

    /// How the stub server answers statements starting with a prefix.
    #[derive(Clone)]
    enum Reply {
        Fail(&'static str, u16),
        Hangup,
    }

    fn read_request(stream: &mut TcpStream) -> Option<Value> {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).ok()?;
        let mut buf = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut buf).ok()?;
        serde_json::from_slice(&buf).ok()
    }

    fn write_reply(stream: &mut TcpStream, value: Value) {
        let bytes = serde_json::to_vec(&value).unwrap();
        stream.write_all(&(bytes.len() as u32).to_be_bytes()).unwrap();
        stream.write_all(&bytes).unwrap();
    }

    /// Serves one client; every statement succeeds unless a rule matches.
    /// Returns the address and a handle yielding the statements received.
    fn spawn_server(rules: Vec<(&'static str, Reply)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut statements = Vec::new();
            while let Some(request) = read_request(&mut stream) {
                let Some(sql) = request["sql"].as_str().map(str::to_string) else {
                    write_reply(&mut stream, json!({"status": "ok"}));
                    continue;
                };
                statements.push(sql.clone());
                match rules.iter().find(|(prefix, _)| sql.starts_with(prefix)) {
                    Some((_, Reply::Hangup)) => break,
                    Some((_, Reply::Fail(message, code))) => write_reply(
                        &mut stream,
                        json!({"status": "error", "message": message, "error_code": code}),
                    ),
                    None => write_reply(&mut stream, json!({"status": "ok"})),
                }
            }
            statements
        });
        (addr, handle)
    }

    fn settings_for(addr: String, state_dir: &Path) -> Settings {
        Settings {
            host: addr,
            token: None,
            login: None,
            state_dir: state_dir.to_path_buf(),
            timeout_ms: None,
            reconciler: ReconcilerConfig::default(),
        }
    }

    fn write_grant(dir: &TempDir, privileges: &[&str]) -> PathBuf {
        let path = dir.path().join("app.json");
        std::fs::write(
            &path,
            json!({"user": "app", "database": "appdb", "privileges": privileges}).to_string(),
        )
        .unwrap();
        path
    }

    fn record(settings: &Settings, grant_file: &Path, privileges: &[&str]) -> StateFile {
        let mut state =
            GrantState::new(GrantSpec::new("app", "appdb", privileges.iter().copied()).unwrap());
        state.set_identity(state.spec().identity());
        let state_file = settings.state_file(grant_file);
        state_file.save(&state).unwrap();
        state_file
    }

    #[test]
    fn test_apply_records_state() {
        let dir = tempfile::tempdir().unwrap();
        let grant_file = write_grant(&dir, &["SELECT"]);
        let (addr, server) = spawn_server(Vec::new());
        let settings = settings_for(addr, &dir.path().join("state"));

        apply(&settings, &grant_file).unwrap();

        let state = settings.state_file(&grant_file).load().unwrap().unwrap();
        assert_eq!(state.identity().unwrap().as_str(), "app@localhost:appdb");
        assert_eq!(
            server.join().unwrap(),
            vec![
                "GRANT SELECT on `appdb`.* TO 'app'@'localhost'",
                "SHOW GRANTS FOR 'app'@'localhost'",
            ]
        );
    }

    #[test]
    fn test_verify_drift_deletes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let grant_file = write_grant(&dir, &["SELECT"]);
        let (addr, server) = spawn_server(vec![(
            "SHOW GRANTS",
            Reply::Fail("There is no such grant defined for user 'app'", 1141),
        )]);
        let settings = settings_for(addr, &dir.path().join("state"));
        let state_file = record(&settings, &grant_file, &["SELECT"]);

        verify(&settings, &grant_file).unwrap();

        assert!(!state_file.path().exists());
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn test_verify_confirmed_keeps_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let grant_file = write_grant(&dir, &["SELECT"]);
        let (addr, server) = spawn_server(Vec::new());
        let settings = settings_for(addr, &dir.path().join("state"));
        let state_file = record(&settings, &grant_file, &["SELECT"]);

        verify(&settings, &grant_file).unwrap();

        assert!(state_file.load().unwrap().unwrap().exists());
        server.join().unwrap();
    }

    #[test]
    fn test_failed_replace_after_removal_deletes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let grant_file = write_grant(&dir, &["INSERT"]);
        let (addr, server) = spawn_server(vec![("GRANT", Reply::Fail("Access denied", 1044))]);
        let settings = settings_for(addr, &dir.path().join("state"));
        let state_file = record(&settings, &grant_file, &["SELECT"]);

        let err = apply(&settings, &grant_file).unwrap_err();

        assert!(err.to_string().contains("grant apply failed"));
        assert!(!state_file.path().exists());
        assert_eq!(
            server.join().unwrap(),
            vec![
                "REVOKE GRANT OPTION ON `appdb`.* FROM 'app'@'localhost'",
                "REVOKE SELECT ON `appdb`.* FROM 'app'@'localhost'",
                "GRANT INSERT on `appdb`.* TO 'app'@'localhost'",
            ]
        );
    }

    #[test]
    fn test_partial_revoke_keeps_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let grant_file = write_grant(&dir, &["SELECT"]);
        let (addr, server) = spawn_server(vec![("REVOKE SELECT", Reply::Hangup)]);
        let settings = settings_for(addr, &dir.path().join("state"));
        let state_file = record(&settings, &grant_file, &["SELECT"]);

        let err = remove(&settings, &grant_file).unwrap_err();

        assert!(err.to_string().contains("manual follow-up required"));
        assert!(state_file.load().unwrap().unwrap().exists());
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_deletes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let grant_file = write_grant(&dir, &["SELECT"]);
        let (addr, server) = spawn_server(Vec::new());
        let settings = settings_for(addr, &dir.path().join("state"));
        let state_file = record(&settings, &grant_file, &["SELECT"]);

        remove(&settings, &grant_file).unwrap();

        assert!(!state_file.path().exists());
        assert_eq!(server.join().unwrap().len(), 2);
    }
}

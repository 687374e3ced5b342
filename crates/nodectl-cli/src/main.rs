//! nodectl control CLI
//!
//! Sends one command (or a raw request body) to a running `nodectld` and
//! prints the result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use nodectl_rpc::{ClientError, RpcClient, socket_path};
use nodectl_server::ServerConfig;
use serde_json::{Map, Value};

/// nodectl - send control commands to nodectld
#[derive(Parser, Debug)]
#[command(name = "nodectl")]
#[command(version)]
#[command(after_help = "\
Examples:
  nodectl help                 List all commands
  nodectl help uptime          Show help for one command
  nodectl uptime               Seconds since the server started
  nodectl --named help command=stop
  nodectl --raw '[{\"method\": \"uptime\", \"id\": 0}, {\"method\": \"help\", \"id\": 1}]'
")]
struct Cli {
    /// Socket to connect to (defaults to `socketPath` from the config, then
    /// `$XDG_RUNTIME_DIR/nodectl.sock`)
    #[arg(long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Config file shared with nodectld (defaults to `<config dir>/nodectl/config.json`)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds to wait for a reply (defaults to `clientTimeoutSecs` from the config)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Pass arguments as name=value pairs instead of by position
    #[arg(long)]
    named: bool,

    /// Send this JSON request body (object or batch array) as-is
    #[arg(long, value_name = "JSON", conflicts_with_all = ["method", "args"])]
    raw: Option<String>,

    /// Method to call
    #[arg(required_unless_present = "raw")]
    method: Option<String>,

    /// Method arguments; each is parsed as JSON, or taken as a string if that fails
    args: Vec<String>,
}

fn parse_arg(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn positional_params(args: &[String]) -> Value {
    Value::Array(args.iter().map(|arg| parse_arg(arg)).collect())
}

fn named_params(args: &[String]) -> Result<Value> {
    let mut params = Map::new();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("No '=' in named argument '{arg}', this needs to be present for every argument (even if it is empty)");
        };
        params.insert(name.to_string(), parse_arg(value));
    }
    Ok(Value::Object(params))
}

fn print_result(result: &Value) {
    match result {
        Value::Null => {}
        Value::String(text) => println!("{text}"),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    match path.map(Path::to_path_buf).or_else(ServerConfig::default_path) {
        Some(path) => ServerConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn socket_for(cli: &Cli, config: &ServerConfig) -> PathBuf {
    cli.socket
        .clone()
        .or_else(|| config.socket_path.clone())
        .unwrap_or_else(socket_path)
}

fn timeout_for(cli: &Cli, config: &ServerConfig) -> Duration {
    Duration::from_secs(cli.timeout.unwrap_or(config.client_timeout_secs))
}

async fn connect(cli: &Cli) -> Result<RpcClient> {
    let config = load_config(cli.config.as_deref())?;
    let socket = socket_for(cli, &config);
    let client = RpcClient::connect_to(&socket).await.with_context(|| {
        format!(
            "Could not connect to nodectld at {}. Is it running?",
            socket.display()
        )
    })?;
    Ok(client.with_timeout(timeout_for(cli, &config)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut client = connect(&cli).await?;

    if let Some(raw) = &cli.raw {
        let body: Value = serde_json::from_str(raw).context("--raw is not valid JSON")?;
        let reply = client.call_raw(&body).await.context("Request failed")?;
        print_result(&reply);
        return Ok(());
    }

    let Some(method) = cli.method.as_deref() else {
        bail!("No method given");
    };
    let params = if cli.named {
        named_params(&cli.args)?
    } else {
        positional_params(&cli.args)
    };

    match client.call(method, params).await {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(ClientError::Rpc { code, message }) => {
            bail!("error code: {code}\nerror message:\n{message}")
        }
        Err(e) => Err(e).context("Request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arg_json_or_string() {
        assert_eq!(parse_arg("42"), json!(42));
        assert_eq!(parse_arg("true"), json!(true));
        assert_eq!(parse_arg("[1,2]"), json!([1, 2]));
        assert_eq!(parse_arg("stop"), json!("stop"));
        assert_eq!(parse_arg("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_positional_params() {
        let args = vec!["uptime".to_string(), "3".to_string()];
        assert_eq!(positional_params(&args), json!(["uptime", 3]));
        assert_eq!(positional_params(&[]), json!([]));
    }

    #[test]
    fn test_named_params_keep_order() {
        let args = vec!["z=1".to_string(), "a=x=y".to_string(), "e=".to_string()];
        let params = named_params(&args).unwrap();
        let keys: Vec<_> = params.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "e"]);
        assert_eq!(params["a"], "x=y");
        assert_eq!(params["e"], "");
    }

    #[test]
    fn test_named_params_require_equals() {
        let err = named_params(&["command".to_string()]).unwrap_err();
        assert!(err.to_string().contains("No '='"));
    }

    #[test]
    fn test_cli_parses_named_call() {
        let cli = Cli::try_parse_from(["nodectl", "--named", "help", "command=stop"]).unwrap();
        assert!(cli.named);
        assert_eq!(cli.method.as_deref(), Some("help"));
        assert_eq!(cli.args, vec!["command=stop"]);
        assert_eq!(cli.timeout, None);
        assert_eq!(timeout_for(&cli, &ServerConfig::default()), Duration::from_secs(900));
    }

    #[test]
    fn test_config_supplies_timeout_and_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"clientTimeoutSecs": 30, "socketPath": "/tmp/other.sock"}"#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();

        let cli = Cli::try_parse_from(["nodectl", "uptime"]).unwrap();
        assert_eq!(timeout_for(&cli, &config), Duration::from_secs(30));
        assert_eq!(socket_for(&cli, &config), PathBuf::from("/tmp/other.sock"));

        let cli = Cli::try_parse_from([
            "nodectl",
            "--timeout",
            "5",
            "--socket",
            "/tmp/mine.sock",
            "uptime",
        ])
        .unwrap();
        assert_eq!(timeout_for(&cli, &config), Duration::from_secs(5));
        assert_eq!(socket_for(&cli, &config), PathBuf::from("/tmp/mine.sock"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.json"))).unwrap();
        let cli = Cli::try_parse_from(["nodectl", "uptime"]).unwrap();
        assert_eq!(timeout_for(&cli, &config), Duration::from_secs(900));
        assert_eq!(socket_for(&cli, &config), socket_path());
    }

    #[test]
    fn test_cli_raw_excludes_method() {
        assert!(Cli::try_parse_from(["nodectl", "--raw", "{}", "uptime"]).is_err());
        let cli = Cli::try_parse_from(["nodectl", "--raw", "{}"]).unwrap();
        assert_eq!(cli.raw.as_deref(), Some("{}"));
    }

    #[test]
    fn test_cli_requires_method() {
        assert!(Cli::try_parse_from(["nodectl"]).is_err());
    }
}

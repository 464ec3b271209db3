//! ontap-publickey: reconcile one SSH public key of an ONTAP account.
//!
//! Prints a single JSON object on stdout:
//! - `{"changed": bool, "warnings": [..]}` on success
//! - `{"failed": true, "msg": ".."}` on failure (exit status 1)

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ontap_publickey::{
    ConnectionConfig, Outcome, PublicKeyReconciler, PublicKeySpec, Reconciler, RestClient, State,
    UseRest,
};

/// ONTAP SSH public key reconciler
#[derive(Parser, Debug)]
#[command(name = "ontap-publickey", version, about)]
struct Args {
    /// Cluster management address
    #[arg(long, env = "ONTAP_HOSTNAME")]
    hostname: String,

    /// API user
    #[arg(long, env = "ONTAP_USERNAME", default_value = "admin")]
    username: String,

    /// API password
    #[arg(long, env = "ONTAP_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Use HTTPS
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    https: bool,

    /// Port override for the management interface
    #[arg(long)]
    http_port: Option<u16>,

    /// Verify the server certificate
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    validate_certs: bool,

    /// Whether the REST API may be used
    #[arg(long, value_enum, default_value_t = UseRest::Auto)]
    use_rest: UseRest,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// Administrative account the key belongs to
    #[arg(long)]
    account: Option<String>,

    /// SVM owning the account (cluster scope when omitted)
    #[arg(long)]
    vserver: Option<String>,

    /// Key material
    #[arg(long)]
    public_key: Option<String>,

    /// Index selecting one of several keys of the account
    #[arg(long)]
    index: Option<u32>,

    /// Free-form comment
    #[arg(long)]
    comment: Option<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t = State::Present)]
    state: State,

    /// With state=absent and no index, delete every key of the account
    #[arg(long)]
    delete_all: bool,

    /// Decide and report, but do not write
    #[arg(long)]
    check: bool,
}

impl Args {
    fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            https: self.https,
            http_port: self.http_port,
            validate_certs: self.validate_certs,
            use_rest: self.use_rest,
            timeout: Duration::from_secs(self.timeout),
        }
    }

    fn spec(&self) -> PublicKeySpec {
        PublicKeySpec {
            account: self.account.clone().unwrap_or_default(),
            vserver: self.vserver.clone(),
            public_key: self.public_key.clone(),
            index: self.index,
            comment: self.comment.clone(),
            state: self.state,
            delete_all: self.delete_all,
        }
    }
}

async fn run(args: &Args) -> Result<Outcome> {
    let spec = args.spec();
    spec.validate()?;

    let config = args.connection();
    info!("Connecting to {}", config.base_url());
    let client = RestClient::new(&config).context("Failed to build REST client")?;

    let reconciler = PublicKeyReconciler::connect(client, config.use_rest)
        .await?
        .with_check_mode(args.check);
    Ok(reconciler.reconcile(&spec).await?)
}

#[tokio::main]
async fn main() {
    // Logs go to stderr, stdout carries only the JSON result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ontap_publickey=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(outcome) => {
            info!("Done (changed={})", outcome.changed);
            println!("{}", json!(outcome));
        }
        Err(e) => {
            error!("{:#}", e);
            println!("{}", json!({"failed": true, "msg": format!("{:#}", e)}));
            std::process::exit(1);
        }
    }
}

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::fs;

use fractal_form::auth::{build_link_query, now_unix, validate_link};
use fractal_form::models::LinkQuery;

#[derive(Parser)]
#[command(name = "fractal-link")]
#[command(about = "Issue and check signed links for the Vórtices e Fractais form", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Shared link secret
    #[arg(short, long, env = "LINK_SECRET_KEY", hide_env_values = true, global = true)]
    secret: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a signed form link
    Sign {
        #[arg(short, long)]
        org: String,
        /// Link lifetime, counted from now
        #[arg(short = 'H', long, default_value_t = 72, conflicts_with = "exp")]
        expires_in_hours: i64,
        /// Absolute expiry as unix seconds
        #[arg(short, long)]
        exp: Option<i64>,
        #[arg(short, long, default_value = "http://localhost:8501")]
        base_url: String,
    },
    /// Check org/exp/sig the way the server does
    Verify {
        #[arg(short, long)]
        org: Option<String>,
        #[arg(short, long)]
        exp: Option<String>,
        #[arg(long)]
        sig: Option<String>,
    },
    /// POST a JSON submission file to a running server
    Submit {
        #[arg(short, long)]
        file: String,
        #[arg(short, long, default_value = "http://localhost:8501")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { org, expires_in_hours, exp, base_url } => {
            let secret = cli.secret.ok_or("LINK_SECRET_KEY not set (use --secret)")?;
            let exp = exp.unwrap_or_else(|| (Utc::now() + Duration::hours(expires_in_hours)).timestamp());
            let query = build_link_query(&org, exp, secret.as_bytes())?;
            println!("{}/?{}", base_url.trim_end_matches('/'), query);
        }
        Commands::Verify { org, exp, sig } => {
            let secret = cli.secret.ok_or("LINK_SECRET_KEY not set (use --secret)")?;
            let decision = validate_link(&LinkQuery { org, exp, sig }, secret.as_bytes(), now_unix());
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Submit { file, url } => {
            let body: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
            let res = Client::new()
                .post(format!("{}/api/submissions", url.trim_end_matches('/')))
                .json(&body)
                .send()
                .await?;
            println!("Response ({}): {}", res.status(), res.text().await?);
        }
    }

    Ok(())
}

use super::Services;
use crate::cli::ui;
use anyhow::Result;
use clap::Args;
use log::info;
use std::process::ExitCode;
use tokio::time::Instant;

#[derive(Args)]
pub struct LoginArgs {
    /// Print the access token (careful: it is a live credential)
    #[arg(long)]
    pub show_token: bool,
}

pub async fn login_command(args: LoginArgs, services: &Services) -> Result<ExitCode> {
    let identity = services.session.identity();
    info!(
        "Logging in as {:?} against realm {}",
        identity.flow(),
        identity.realm
    );

    let token = match services.session.access_token().await {
        Ok(token) => token,
        Err(e) => {
            ui::failure(&format!("Login failed: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    };

    ui::success(&format!("Authenticated with {}", identity.issuer_url));
    if let Some((access_expiry, refresh_expiry)) = services.session.credential_expiry() {
        let now = Instant::now();
        println!(
            "  access token valid for {}s",
            access_expiry.saturating_duration_since(now).as_secs()
        );
        println!(
            "  refresh token valid for {}s",
            refresh_expiry.saturating_duration_since(now).as_secs()
        );
    }
    if args.show_token {
        println!("{}", token);
    }

    Ok(ExitCode::SUCCESS)
}

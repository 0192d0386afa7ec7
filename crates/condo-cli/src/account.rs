//! `condo login` and `condo statement`.

use anyhow::{Context, Result};
use clap::Args;
use condo_core::HouseId;
use serde_json::json;

use crate::client::{ApiClient, ConnectionArgs};
use crate::password::prompt_secret;
use crate::render::{render_statement, LoginResponse, Statement};

/// Arguments for `login`. The password is read from stdin.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// DNI of the account.
    #[arg(long)]
    pub dni: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Arguments for `statement`.
#[derive(Args, Debug)]
pub struct StatementArgs {
    /// House to show (ADMIN only). Without it, the caller's own house.
    #[arg(long)]
    pub house: Option<HouseId>,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Path of the statement for `house`, or of the caller's own.
pub fn statement_path(house: Option<HouseId>) -> String {
    match house {
        Some(h) => format!("/admin/estado-cuenta/{h}"),
        None => "/condomino/estado_cuenta".to_string(),
    }
}

/// Log in and print the bearer token on stdout.
pub async fn run_login(args: &LoginArgs) -> Result<u8> {
    let client = ApiClient::new(&args.connection.api_url, None)?;
    let password = prompt_secret("Password")?;
    let response: LoginResponse = client
        .post(
            "/login",
            &json!({ "dni": args.dni, "password": password.as_str() }),
        )
        .await
        .context("login failed")?;
    tracing::info!(
        role = %response.rol,
        expires_in = response.expires_in,
        "logged in"
    );
    println!("{}", response.access_token);
    Ok(0)
}

pub async fn run_statement(args: &StatementArgs) -> Result<u8> {
    let client = ApiClient::from_args(&args.connection)?;
    client.require_token()?;
    let path = statement_path(args.house);
    if args.json {
        let raw: serde_json::Value = client.get(&path).await?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
    } else {
        let statement: Statement = client.get(&path).await?;
        print!("{}", render_statement(&statement));
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_and_admin_paths() {
        assert_eq!(statement_path(None), "/condomino/estado_cuenta");
        assert_eq!(statement_path(Some(HouseId::new(0))), "/admin/estado-cuenta/0");
        assert_eq!(statement_path(Some(HouseId::new(12))), "/admin/estado-cuenta/12");
    }
}

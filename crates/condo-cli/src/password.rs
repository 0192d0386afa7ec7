//! `condo hash-password`: produce a bcrypt hash for the `PASSWORD_HASH`
//! column of `USUARIOS`.

use std::io::{BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

/// Arguments for `hash-password`.
#[derive(Args, Debug)]
pub struct HashPasswordArgs {
    /// bcrypt cost factor (4 to 31).
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
    pub cost: u32,
}

/// Read one line from `reader` as a secret, without the line ending.
/// Empty input is rejected.
pub fn read_secret(reader: &mut impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader.read_line(&mut line).context("failed to read password")?;
    let trimmed = Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string());
    if trimmed.is_empty() {
        bail!("password must not be empty");
    }
    Ok(trimmed)
}

/// Read a secret from stdin, prompting on stderr when stdin is a terminal.
pub fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        let mut stderr = std::io::stderr();
        write!(stderr, "{prompt}: ").context("failed to write prompt")?;
        stderr.flush().context("failed to write prompt")?;
    }
    read_secret(&mut stdin.lock())
}

pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("bcrypt hashing failed")
}

/// Hash a password read from stdin and print the hash.
pub fn run_hash_password(args: &HashPasswordArgs) -> Result<u8> {
    let password = prompt_secret("Password")?;
    let hash = hash_password(&password, args.cost)?;
    println!("{hash}");
    Ok(0)
}

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use tbg_cli::{chat, cli::Cli, logging};
use tbgclient::{ForumConfig, Session};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        error!(target: "tbg.chat", error = %err, "chat client failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ForumConfig::from_file(path).with_context(|| format!("reading {}", path.display()))?,
        None => ForumConfig::default(),
    }
    .with_env_overrides()?;
    let interval = cli.interval();

    let username = match cli.username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = match cli.password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let session = Session::with_config(config)?;
    let user = session.login(&username, &password).context("login failed")?;
    info!(target: "tbg.chat", uid = user.uid, "logged in");

    chat::run(session, interval)
}

fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{label}")?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

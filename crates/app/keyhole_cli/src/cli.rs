use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8082";

#[derive(Parser, Debug)]
#[command(name = "keyhole")]
#[command(about = "Keyhole CLI: register, log in and manage a session")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL
    #[arg(short, long, global = true, env = "KEYHOLE_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Session file (defaults to <config dir>/keyhole/session.json)
    #[arg(long, global = true, env = "KEYHOLE_SESSION_FILE")]
    pub session_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account
    Register(RegisterArgs),
    /// Log in and store the session
    Login(LoginArgs),
    /// Show the logged-in user's profile
    Profile,
    /// Log out and remove the stored session
    Logout,
    /// Show the local session and server health
    Status,
    /// Print version
    Version,
}

#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    /// Username (3-80 characters)
    #[arg(short, long)]
    pub username: String,
    /// Email address
    #[arg(short, long)]
    pub email: String,
    /// Password (at least 6 characters)
    #[arg(short, long, env = "KEYHOLE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: String,
    /// Password
    #[arg(short, long, env = "KEYHOLE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

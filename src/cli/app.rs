use super::commands::{LoginArgs, TrackArgs, WaitArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compute-cli")]
#[command(about = "Track and wait on tasks running on the remote compute platform")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the per-user config location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate once and report the token lifetimes
    Login(LoginArgs),
    /// Follow a task's staged progress until it finishes (Ctrl-C stops)
    Track(TrackArgs),
    /// Block until a computation reaches a terminal status
    Wait(WaitArgs),
}

//! Terminal output for the command handlers

use anyhow::Result;
use colored::*;
use compute_cli::api::{LogSink, ProgressEvent, ProgressSink};

/// Prints progress events to stdout and mirrors them to the log
pub struct ConsoleSink {
    log: LogSink,
}

impl ConsoleSink {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            log: LogSink::new(task_id),
        }
    }

    pub fn correlation_id(&self) -> &str {
        self.log.correlation_id()
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&mut self, event: ProgressEvent) {
        match &event {
            ProgressEvent::StageStarted {
                stage_number,
                num_stages,
                stage_name,
                num_steps,
                step_number,
                ..
            } => {
                println!(
                    "{} {}",
                    format!("[stage {}/{}]", stage_number, num_stages).cyan().bold(),
                    stage_name.bold()
                );
                println!("  step {}/{}", step_number, num_steps);
            }
            ProgressEvent::StepAdvanced {
                step_number,
                num_steps,
                ..
            } => {
                println!("  step {}/{}", step_number, num_steps);
            }
            ProgressEvent::StageFinished { stage_number } => {
                println!("  {} stage {}", "✓".green(), stage_number);
            }
            ProgressEvent::Completed => {
                println!("{}", "Task finished".green().bold());
            }
        }
        self.log.emit(event);
    }
}

pub fn prompt_password(username: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("Password for {}: ", username))?;
    Ok(password)
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn failure(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

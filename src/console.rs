//! Line-oriented control surface on stdin/stdout.
//!
//! Commands: `show`, `hide`, `toggle`, `stop`, `status`, `quit`.

use crate::coordinator::{ToggleLabel, UiEvent};
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub fn parse_command(line: &str) -> Option<UiEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "show" | "resume" => Some(UiEvent::Shown),
        "hide" | "pause" => Some(UiEvent::Hidden),
        "toggle" | "t" => Some(UiEvent::ToggleSensing),
        "stop" | "s" => Some(UiEvent::Stop),
        "status" => Some(UiEvent::Status),
        "quit" | "exit" | "q" => Some(UiEvent::Quit),
        _ => None,
    }
}

/// Forward stdin commands to the coordinator and print the toggle label
/// whenever it changes. Ends when stdin closes or the coordinator is gone.
pub fn spawn(
    commands: mpsc::Sender<UiEvent>,
    mut labels: watch::Receiver<ToggleLabel>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Commands: show, hide, toggle, stop, status, quit");

        loop {
            tokio::select! {
                changed = labels.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let label = *labels.borrow_and_update();
                    println!("[{label}]");
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match parse_command(&line) {
                        Some(event) => {
                            if commands.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => warn!("[Console] Unknown command: {}", line.trim()),
                    },
                    Ok(None) => {
                        debug!("[Console] stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("[Console] stdin read failed: {}", e);
                        break;
                    }
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("show"), Some(UiEvent::Shown));
        assert_eq!(parse_command("  HIDE \n"), Some(UiEvent::Hidden));
        assert_eq!(parse_command("toggle"), Some(UiEvent::ToggleSensing));
        assert_eq!(parse_command("stop"), Some(UiEvent::Stop));
        assert_eq!(parse_command("status"), Some(UiEvent::Status));
        assert_eq!(parse_command("q"), Some(UiEvent::Quit));
        assert_eq!(parse_command("dance"), None);
    }
}

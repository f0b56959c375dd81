use std::io::BufRead;
use std::str::FromStr;

use crossbeam_channel::Sender;

/// Console stand-ins for the viewer's buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Snap,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "snap" | "snapshot" | "screenshot" => Ok(Command::Snap),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

pub const HELP: &str = "commands: start, stop, snap, status, quit";

/// Reads commands from stdin on a background thread. End of input sends `Quit`.
pub fn spawn_reader(tx: Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        return;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        let _ = tx.send(Command::Quit);
    });
}

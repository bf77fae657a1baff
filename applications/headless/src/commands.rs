//! Line-oriented commands read from stdin

use crate::error::{HeadlessError, Result};
use musik_core::TrackId;
use std::str::FromStr;

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play(usize),
    Next,
    Prev,
    Pause,
    Stop,
    Shuffle,
    Repeat,
    Seek(f64),
    Volume(f64),
    Mute,
    Delete(usize),
    Move { from: usize, to: usize },
    Add(TrackId),
    Clear,
    List,
    Status,
    Reload,
    /// End the current stream as if it ran out
    Finish,
    Help,
    Quit,
}

/// Text shown by `help`
pub const HELP: &str = "\
play <index>       start playing the playlist entry at <index>
next | prev        skip forward or back
pause              pause, resume, or start from the top
stop               stop playback
shuffle            toggle shuffle
repeat             cycle repeat mode (none, list, track)
seek <seconds>     move within the current track
volume <0..1>      set output volume
mute               toggle mute
delete <index>     remove a playlist entry
move <from> <to>   move a playlist entry
add <track id>     append a library track
clear              empty the playlist
list               print the playlist
status             print the service state as JSON
reload             recreate the output
finish             end the current track
quit               save and exit";

fn argument<T: FromStr>(parts: &[&str], position: usize, name: &str) -> Result<T> {
    let raw = parts
        .get(position)
        .ok_or_else(|| HeadlessError::Command(format!("missing <{}>", name)))?;
    raw.parse()
        .map_err(|_| HeadlessError::Command(format!("<{}> is not valid: {}", name, raw)))
}

impl FromStr for Command {
    type Err = HeadlessError;

    fn from_str(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(verb) = parts.first() else {
            return Err(HeadlessError::Command("empty line".to_string()));
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "play" => Command::Play(argument(&parts, 1, "index")?),
            "next" => Command::Next,
            "prev" | "previous" => Command::Prev,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "shuffle" => Command::Shuffle,
            "repeat" => Command::Repeat,
            "seek" => Command::Seek(argument(&parts, 1, "seconds")?),
            "volume" => Command::Volume(argument(&parts, 1, "volume")?),
            "mute" => Command::Mute,
            "delete" | "rm" => Command::Delete(argument(&parts, 1, "index")?),
            "move" | "mv" => Command::Move {
                from: argument(&parts, 1, "from")?,
                to: argument(&parts, 2, "to")?,
            },
            "add" => Command::Add(TrackId::new(argument(&parts, 1, "track id")?)),
            "clear" => Command::Clear,
            "list" | "ls" => Command::List,
            "status" => Command::Status,
            "reload" => Command::Reload,
            "finish" => Command::Finish,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(HeadlessError::Command(format!("unknown command '{}'", other))),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!("play 3".parse::<Command>().unwrap(), Command::Play(3));
        assert_eq!("  SEEK   12.5 ".parse::<Command>().unwrap(), Command::Seek(12.5));
        assert_eq!(
            "move 4 0".parse::<Command>().unwrap(),
            Command::Move { from: 4, to: 0 }
        );
        assert_eq!(
            "add 17".parse::<Command>().unwrap(),
            Command::Add(TrackId::new(17))
        );
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            "".parse::<Command>(),
            Err(HeadlessError::Command(_))
        ));
        assert!(matches!(
            "play".parse::<Command>(),
            Err(HeadlessError::Command(msg)) if msg.contains("missing")
        ));
        assert!(matches!(
            "volume loud".parse::<Command>(),
            Err(HeadlessError::Command(msg)) if msg.contains("loud")
        ));
        assert!("dance".parse::<Command>().is_err());
    }
}

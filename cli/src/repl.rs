//! REPL line parsing.

#[cfg(test)]
#[path = "repl_test.rs"]
mod repl_test;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Blank,
    Quit,
    Help,
    Models,
    /// `/model <id>`; `None` when the id is missing.
    Model(Option<&'a str>),
    Unknown(&'a str),
    Message(&'a str),
}

#[must_use]
pub fn parse_line(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line);
    };

    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    let arg = Some(rest.trim()).filter(|arg| !arg.is_empty());
    match name {
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        "models" => Input::Models,
        "model" => Input::Model(arg),
        _ => Input::Unknown(name),
    }
}

pub const HELP: &str = "\
commands:
  /models        list selectable models
  /model <id>    switch model for the next message
  /help          show this help
  /quit          exit (Ctrl-D also works)
Ctrl-C while a reply is streaming cancels it; at the prompt it exits.";

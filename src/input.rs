use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub enum Input {
    Line(String),
    Eof,
}

/// Line source for the interpreter loop.
///
/// An interactive terminal gets an editing line reader with persistent
/// history; redirected stdin is read plainly with the prompt suppressed, so
/// scripted input pipes through without stray prompt bytes.
pub struct LineReader {
    editor: Option<DefaultEditor>,
    history: PathBuf,
}

impl LineReader {
    pub fn new(home: &str) -> Self {
        let history = PathBuf::from(home).join(".psh_history");
        let editor = if io::stdin().is_terminal() {
            match DefaultEditor::new() {
                Ok(mut editor) => {
                    // Missing history is normal on first run.
                    let _ = editor.load_history(&history);
                    Some(editor)
                }
                Err(err) => {
                    eprintln!("psh: line editor unavailable: {}", err);
                    None
                }
            }
        } else {
            None
        };

        Self { editor, history }
    }

    pub fn read(&mut self, prompt: &str) -> Input {
        match self.editor.as_mut() {
            Some(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                        let _ = editor.save_history(&self.history);
                    }
                    Input::Line(line)
                }
                // Ctrl-C abandons the current line, not the shell.
                Err(ReadlineError::Interrupted) => Input::Line(String::new()),
                Err(ReadlineError::Eof) => Input::Eof,
                Err(err) => {
                    eprintln!("psh: read error: {}", err);
                    Input::Eof
                }
            },
            None => {
                let mut line = String::new();
                match io::stdin().lock().read_line(&mut line) {
                    Ok(0) => Input::Eof,
                    Ok(_) => Input::Line(line),
                    Err(err) => {
                        eprintln!("psh: read error: {}", err);
                        Input::Eof
                    }
                }
            }
        }
    }
}

use std::env;

use colored::Colorize;

pub struct Prompt {
    user: String,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            user: whoami::username(),
        }
    }

    pub fn get_string(&self) -> String {
        let cwd = env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| String::from("?"));

        format!("{} {}> ", self.user.green().bold(), cwd.cyan())
    }
}

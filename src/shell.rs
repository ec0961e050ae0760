use std::env;

use nix::sys::signal::{signal, SigHandler, Signal};

use crate::builtin;
use crate::input::{Input, LineReader};
use crate::jobs::{JobRegistry, WaitSet};
use crate::parser::{self, Pipeline};
use crate::pipeline;
use crate::prompt::Prompt;

/// Process-wide interpreter state: there are no globals, everything the loop
/// mutates lives here and is drained explicitly at shutdown.
pub struct Shell {
    prompt: Prompt,
    reader: LineReader,
    home: String,
    jobs: JobRegistry,
    pending: WaitSet,
    running: bool,
}

impl Shell {
    pub fn new() -> Self {
        // Resolved once; cd's ~ substitution and the history file use it.
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/"));
        let reader = LineReader::new(&home);

        Self {
            prompt: Prompt::new(),
            reader,
            home,
            jobs: JobRegistry::new(),
            pending: WaitSet::new(),
            running: true,
        }
    }

    pub fn run(&mut self) {
        // Ctrl-C should land on the foreground child, never on the shell.
        #[cfg(unix)]
        unsafe {
            let _ = signal(Signal::SIGINT, SigHandler::SigIgn);
        }

        while self.running {
            // Report background completions between prompts.
            self.jobs.poll();

            let line = match self.reader.read(&self.prompt.get_string()) {
                Input::Line(line) => line,
                Input::Eof => break,
            };

            match parser::parse_line(&line) {
                Ok(Some(pipeline)) => self.execute(pipeline),
                Ok(None) => {}
                Err(err) => eprintln!("psh: {}", err),
            }
        }

        // Shutdown: nothing may be left pending, and the registry poll is
        // upgraded to a blocking drain so no child outlives its reporter.
        if !self.pending.is_empty() {
            self.pending.wait_all();
        }
        self.jobs.drain();
    }

    /// Run one pipeline: builtin short-circuit, then spawn and reconcile.
    /// Blocks until a foreground pipeline is fully reaped; returns right
    /// after registration for a background one.
    pub fn execute(&mut self, pipeline: Pipeline) {
        let first = &pipeline.stages[0];
        if let Some(cmd) = builtin::lookup(&first.argv[0]) {
            self.running = cmd.run(&first.argv, &self.home, &mut self.pending);
            return;
        }

        let records = match pipeline::spawn_pipeline(&pipeline.stages) {
            Ok(records) => records,
            Err(err) => {
                eprintln!("psh: {}", err);
                return;
            }
        };
        if records.is_empty() {
            return;
        }

        if pipeline.background {
            match self.jobs.register_all(&records) {
                Ok(slot) => {
                    if let Some(last) = records.last() {
                        println!("[{}] {}", slot, last.pid);
                    }
                    return;
                }
                // Full table: the job still runs, just synchronously.
                Err(err) => eprintln!("psh: {}; waiting in foreground", err),
            }
        }

        self.pending.push_all(records);
        self.pending.wait_all();
    }
}

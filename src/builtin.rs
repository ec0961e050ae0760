use std::env;

use crate::jobs::WaitSet;

/// The closed set of in-process commands. Anything else is spawned as a
/// pipeline of external programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Wait,
    Cd,
    Pwd,
}

/// Exact, case-sensitive name match.
pub fn lookup(name: &str) -> Option<Builtin> {
    match name {
        "exit" => Some(Builtin::Exit),
        "wait" => Some(Builtin::Wait),
        "cd" => Some(Builtin::Cd),
        "pwd" => Some(Builtin::Pwd),
        _ => None,
    }
}

/// Replace a leading `~` with the home directory resolved at startup.
pub fn expand_home(path: &str, home: &str) -> String {
    match path.strip_prefix('~') {
        Some(rest) => format!("{}{}", home, rest),
        None => path.to_string(),
    }
}

impl Builtin {
    /// Run the builtin in-process. Returns false when the interpreter loop
    /// should stop; only `exit` with a valid argument count does that.
    pub fn run(self, argv: &[String], home: &str, pending: &mut WaitSet) -> bool {
        match self {
            Builtin::Exit => {
                if argv.len() != 1 {
                    eprintln!("exit: invalid number of arguments");
                    return true;
                }
                pending.wait_all();
                false
            }

            Builtin::Wait => {
                if argv.len() != 1 {
                    eprintln!("wait: invalid number of arguments");
                    return true;
                }
                pending.wait_all();
                true
            }

            Builtin::Cd => {
                if argv.len() != 2 {
                    eprintln!("cd: invalid number of arguments");
                    return true;
                }
                let target = expand_home(&argv[1], home);
                if let Err(err) = env::set_current_dir(&target) {
                    // Reported, not fatal; the working directory is unchanged.
                    eprintln!("cd: {}: {}", target, err);
                }
                true
            }

            Builtin::Pwd => {
                if argv.len() != 1 {
                    eprintln!("pwd: invalid number of arguments");
                    return true;
                }
                match env::current_dir() {
                    Ok(path) => println!("{}", path.display()),
                    Err(err) => eprintln!("pwd: {}", err),
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lookup_matches_exactly_and_case_sensitively() {
        assert_eq!(lookup("exit"), Some(Builtin::Exit));
        assert_eq!(lookup("wait"), Some(Builtin::Wait));
        assert_eq!(lookup("cd"), Some(Builtin::Cd));
        assert_eq!(lookup("pwd"), Some(Builtin::Pwd));

        assert_eq!(lookup("Exit"), None);
        assert_eq!(lookup("PWD"), None);
        assert_eq!(lookup("exits"), None);
        assert_eq!(lookup("ls"), None);
    }

    #[test]
    fn home_prefix_substitution() {
        assert_eq!(expand_home("~", "/home/u"), "/home/u");
        assert_eq!(expand_home("~/sub", "/home/u"), "/home/u/sub");
        assert_eq!(expand_home("/etc", "/home/u"), "/etc");
        assert_eq!(expand_home("a~b", "/home/u"), "a~b");
    }

    #[test]
    fn exit_with_arguments_keeps_the_shell_running() {
        let mut pending = WaitSet::new();
        assert!(Builtin::Exit.run(&argv(&["exit", "now"]), "/", &mut pending));
    }

    #[test]
    fn exit_without_arguments_stops_the_shell() {
        let mut pending = WaitSet::new();
        assert!(!Builtin::Exit.run(&argv(&["exit"]), "/", &mut pending));
    }

    #[test]
    fn wait_validates_arguments_and_returns_promptly_when_idle() {
        let mut pending = WaitSet::new();
        assert!(Builtin::Wait.run(&argv(&["wait"]), "/", &mut pending));
        assert!(Builtin::Wait.run(&argv(&["wait", "x"]), "/", &mut pending));
    }

    #[test]
    fn cd_changes_and_preserves_the_working_directory() {
        // All cwd mutation lives in this one test; cargo's parallel test
        // threads share the process-wide working directory.
        let original = env::current_dir().unwrap();
        let mut pending = WaitSet::new();

        let target = env::temp_dir().canonicalize().unwrap();
        let target_str = target.display().to_string();
        assert!(Builtin::Cd.run(&argv(&["cd", &target_str]), "/", &mut pending));
        assert_eq!(env::current_dir().unwrap(), target);

        // A failing cd reports and leaves the directory alone.
        assert!(Builtin::Cd.run(
            &argv(&["cd", "/no/such/directory/here"]),
            "/",
            &mut pending
        ));
        assert_eq!(env::current_dir().unwrap(), target);

        // Wrong argument counts change nothing either.
        assert!(Builtin::Cd.run(&argv(&["cd"]), "/", &mut pending));
        assert!(Builtin::Cd.run(&argv(&["cd", "a", "b"]), "/", &mut pending));
        assert_eq!(env::current_dir().unwrap(), target);

        env::set_current_dir(&original).unwrap();
    }

    #[test]
    fn pwd_validates_arguments() {
        let mut pending = WaitSet::new();
        assert!(Builtin::Pwd.run(&argv(&["pwd"]), "/", &mut pending));
        assert!(Builtin::Pwd.run(&argv(&["pwd", "x"]), "/", &mut pending));
    }
}

//! Terminal interaction seam between the pipeline and the user.
//!
//! Core logic never formats escape sequences itself; it drives a
//! [`Console`] through explicit state transitions (begin item, step,
//! notify, ask) and the tree renderer takes care of presentation.

use std::io::{BufRead, IsTerminal, Read, Write};

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// Passive renderer plus prompt capability driven by the session.
pub trait Console {
    /// Shows a prompt and returns the trimmed line the user typed.
    fn ask(&mut self, prompt: &str) -> String;
    /// Reads free-form text until end-of-input (manual paste).
    fn read_block(&mut self) -> String;
    /// Emits a user-visible notice outside the tree flow.
    fn notify(&mut self, level: NoticeLevel, message: &str);
    /// True when a human is attached and rescue prompts are allowed.
    fn is_interactive(&self) -> bool;

    /// Announces an album run of `total` items.
    fn begin_album(&mut self, album_label: &str, total: usize);
    /// Advances to the next item in the tree.
    fn begin_item(&mut self, label: &str);
    /// Replaces the current item's transient progress line.
    fn step(&mut self, message: &str);
    /// Clears the progress line for the current item.
    fn finish_item(&mut self);
}

/// Interactive stdout tree renderer.
pub struct TreeConsole {
    total: usize,
    index: usize,
    last_item: bool,
    step_line_open: bool,
}

const ROOT_INDENT: &str = "   ";

impl TreeConsole {
    pub fn new() -> Self {
        Self {
            total: 0,
            index: 0,
            last_item: false,
            step_line_open: false,
        }
    }

    fn branch_indent(&self) -> &'static str {
        if self.last_item {
            "    "
        } else {
            "\u{2502}   "
        }
    }

    fn clear_step_line(&mut self) {
        if self.step_line_open {
            print!("\u{1b}[2K\r");
            let _ = std::io::stdout().flush();
            self.step_line_open = false;
        }
    }
}

impl Default for TreeConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TreeConsole {
    fn ask(&mut self, prompt: &str) -> String {
        self.clear_step_line();
        print!("{prompt} ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        line.trim().to_string()
    }

    fn read_block(&mut self) -> String {
        self.clear_step_line();
        println!("Paste lyrics, then end input (Ctrl-D):");
        let mut text = String::new();
        let _ = std::io::stdin().lock().read_to_string(&mut text);
        text.trim().to_string()
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.clear_step_line();
        match level {
            NoticeLevel::Info => println!("{message}"),
            NoticeLevel::Warn => println!("[WARN] {message}"),
            NoticeLevel::Error => eprintln!("[ERROR] {message}"),
        }
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    fn begin_album(&mut self, album_label: &str, total: usize) {
        self.total = total;
        self.index = 0;
        self.last_item = false;
        println!("{ROOT_INDENT}Retagging: {album_label}");
    }

    fn begin_item(&mut self, label: &str) {
        self.clear_step_line();
        self.index += 1;
        self.last_item = self.index == self.total;
        let prefix = if self.last_item {
            "\u{2514}\u{2500}\u{2500}"
        } else {
            "\u{251c}\u{2500}\u{2500}"
        };
        println!("{ROOT_INDENT}{prefix} {label} ({}/{})", self.index, self.total);
    }

    fn step(&mut self, message: &str) {
        let indent = self.branch_indent();
        print!("\u{1b}[2K\r{ROOT_INDENT}{indent}\u{2514}\u{2500}\u{2500} {message}");
        let _ = std::io::stdout().flush();
        self.step_line_open = true;
    }

    fn finish_item(&mut self) {
        self.clear_step_line();
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted console double for exercising interactive flows.

    use std::collections::VecDeque;

    use super::{Console, NoticeLevel};

    /// Replays canned answers and records everything the session said.
    pub struct ScriptedConsole {
        answers: VecDeque<String>,
        pasted_block: String,
        pub interactive: bool,
        pub notices: Vec<(NoticeLevel, String)>,
        pub prompts: Vec<String>,
    }

    impl ScriptedConsole {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|answer| answer.to_string()).collect(),
                pasted_block: String::new(),
                interactive: true,
                notices: Vec::new(),
                prompts: Vec::new(),
            }
        }

        pub fn non_interactive() -> Self {
            let mut console = Self::new(&[]);
            console.interactive = false;
            console
        }

        pub fn with_pasted_block(mut self, block: &str) -> Self {
            self.pasted_block = block.to_string();
            self
        }
    }

    impl Console for ScriptedConsole {
        fn ask(&mut self, prompt: &str) -> String {
            self.prompts.push(prompt.to_string());
            self.answers.pop_front().unwrap_or_else(|| "s".to_string())
        }

        fn read_block(&mut self) -> String {
            self.pasted_block.clone()
        }

        fn notify(&mut self, level: NoticeLevel, message: &str) {
            self.notices.push((level, message.to_string()));
        }

        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn begin_album(&mut self, _album_label: &str, _total: usize) {}
        fn begin_item(&mut self, _label: &str) {}
        fn step(&mut self, _message: &str) {}
        fn finish_item(&mut self) {}
    }
}

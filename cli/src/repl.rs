use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::ToplevelConfig;
use crate::toplevel::{FragmentSource, Toplevel};

/// True once every `(`, `{` is closed, ignoring string contents and comments.
pub fn delimiters_balanced(input: &str) -> bool {
    let mut depth: i64 = 0;
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => {
                // Line comment: skip to end of line
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        closed = true;
                        break;
                    }
                    prev = ch;
                }
                // An open block comment needs more lines
                if !closed {
                    return false;
                }
            }
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            _ => {}
        }
    }
    // Over-closed input is complete; the parser reports it
    depth <= 0 && !in_string
}

/// Line-editor input. Keeps reading lines while delimiters are open.
pub struct ReplInput {
    editor: DefaultEditor,
    prompt: String,
    continuation: String,
    history: Option<PathBuf>,
    is_tty: bool,
}

impl ReplInput {
    pub fn new(config: &ToplevelConfig) -> Result<Self> {
        let mut editor =
            DefaultEditor::new().map_err(|e| anyhow!("failed to initialize line editor: {e}"))?;
        if let Some(path) = &config.history_file {
            if editor.load_history(path).is_err() {
                debug!("no history at {}", path.display());
            }
        }
        Ok(Self {
            editor,
            prompt: config.prompt.clone(),
            continuation: config.continuation_prompt.clone(),
            history: config.history_file.clone(),
            is_tty: io::stdin().is_terminal(),
        })
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        if self.is_tty {
            return self.editor.readline(prompt);
        }
        // rustyline suppresses prompts on piped input: echo a transcript
        print!("{prompt}");
        io::stdout().flush().ok();
        let line = self.editor.readline("")?;
        println!("{line}");
        Ok(line)
    }

    pub fn save_history(&mut self) {
        let Some(path) = &self.history else {
            return;
        };
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                debug!("could not create history directory {}: {}", dir.display(), e);
            }
        }
        if let Err(e) = self.editor.save_history(path) {
            debug!("could not save history to {}: {}", path.display(), e);
        }
    }
}

impl FragmentSource for ReplInput {
    fn read_fragment(&mut self) -> Result<Option<String>> {
        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() {
                self.prompt.clone()
            } else {
                self.continuation.clone()
            };
            match self.read_line(&prompt) {
                Ok(line) => {
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C drops the pending fragment
                    buffer.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(anyhow!("failed to read input: {e}")),
            }

            if !delimiters_balanced(&buffer) {
                continue;
            }
            let fragment = buffer.trim().to_string();
            if fragment.is_empty() {
                buffer.clear();
                continue;
            }
            let _ = self.editor.add_history_entry(fragment.as_str());
            return Ok(Some(fragment));
        }
    }
}

pub fn run_repl(config: ToplevelConfig) -> Result<()> {
    println!("Quill toplevel {}", env!("CARGO_PKG_VERSION"));
    let mut input = ReplInput::new(&config)?;
    let mut toplevel = Toplevel::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = toplevel.run_session(&mut input, &mut out);
    input.save_history();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_braces_wait_for_more_input() {
        assert!(!delimiters_balanced("fn f(x) {"));
        assert!(!delimiters_balanced("print(1,"));
        assert!(delimiters_balanced("fn f(x) {\n  x\n}"));
    }

    #[test]
    fn braces_inside_strings_and_comments_do_not_count() {
        assert!(delimiters_balanced(r#"print("{")"#));
        assert!(delimiters_balanced("1 // {"));
        assert!(!delimiters_balanced("\"unterminated"));
    }

    #[test]
    fn block_comments_do_not_count() {
        assert!(delimiters_balanced("1 /* { */"));
        assert!(delimiters_balanced("f(/* ) */ 2)"));
        assert!(!delimiters_balanced("{ /* } */"));
        assert!(!delimiters_balanced("1 /* still open"));
        assert!(delimiters_balanced("/**/ 3"));
    }
}

//! The toplevel driver: one turn is read, compile, reify, execute, report.
//!
//! A turn either commits completely (global writes and symbol definitions)
//! or not at all. Faults are caught at the turn boundary and reported, so
//! the session continues with the bindings of the last successful turn.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use compiler::{CompiledFragment, SymbolEnv};
use log::{debug, warn};
use memory::Value;
use vm::format::repr_value;
use vm::{
    section_table, BytecodeBackend, DynamicLibraryStub, LinkError, NativeFn, NativeObj,
    ProgramImage, Reifier, ReifyBackend, RuntimeError, TermInfo, TermStatus,
};

/// How many `#use` files may be open inside one another.
pub const MAX_USE_DEPTH: usize = 16;

use crate::config::ToplevelConfig;

/// A compile failure, with the position it points at when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<(usize, usize)>,
}

impl From<String> for Diagnostic {
    fn from(message: String) -> Self {
        Self {
            message,
            location: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Turns source text into a bytecode unit. The one way the toplevel reaches
/// a compiler.
pub trait FragmentCompiler {
    fn compile(&mut self, source: &str, env: &SymbolEnv) -> Result<CompiledFragment, Diagnostic>;
}

impl<F> FragmentCompiler for F
where
    F: FnMut(&str, &SymbolEnv) -> Result<CompiledFragment, Diagnostic>,
{
    fn compile(&mut self, source: &str, env: &SymbolEnv) -> Result<CompiledFragment, Diagnostic> {
        self(source, env)
    }
}

/// The Quill compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuillCompiler;

impl FragmentCompiler for QuillCompiler {
    fn compile(&mut self, source: &str, env: &SymbolEnv) -> Result<CompiledFragment, Diagnostic> {
        compiler::compile(source, env).map_err(|e| Diagnostic {
            location: e.location(),
            message: e.to_string(),
        })
    }
}

/// Where fragments come from. `Ok(None)` ends the session.
pub trait FragmentSource {
    fn read_fragment(&mut self) -> Result<Option<String>>;
}

/// A fixed list of fragments, for scripts and tests.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    fragments: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }
}

impl FragmentSource for ScriptedInput {
    fn read_fragment(&mut self) -> Result<Option<String>> {
        Ok(self.fragments.pop_front())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub type_name: &'static str,
    pub repr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reported {
    pub type_name: &'static str,
    pub repr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Evaluated {
        bindings: Vec<Binding>,
        value: Option<Reported>,
    },
    /// A `#` directive ran; its output is attached.
    Directive(String),
    Quit,
    /// Rendered diagnostic, including the caret line when a location is known.
    CompileFailed(String),
    LinkFailed(LinkError),
    Faulted(RuntimeError),
    /// A fragment mixing directive lines and code, run piece by piece.
    /// Stops after the first piece that fails or quits.
    Sequence(Vec<TurnOutcome>),
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            TurnOutcome::Evaluated { .. } | TurnOutcome::Directive(_) | TurnOutcome::Quit => true,
            TurnOutcome::Sequence(parts) => parts.iter().all(TurnOutcome::is_success),
            _ => false,
        }
    }

    /// Whether the session should end after this turn.
    pub fn quits(&self) -> bool {
        match self {
            TurnOutcome::Quit => true,
            TurnOutcome::Sequence(parts) => parts.last().is_some_and(TurnOutcome::quits),
            _ => false,
        }
    }

    /// The first failing piece, if any.
    pub fn failure(&self) -> Option<&TurnOutcome> {
        match self {
            TurnOutcome::Sequence(parts) => parts.iter().find_map(TurnOutcome::failure),
            other if !other.is_success() => Some(other),
            _ => None,
        }
    }
}

enum Segment {
    Directive(String),
    /// Code lines, padded with blank lines so positions match the source.
    Code(String),
}

/// Split a fragment into its `#` directive lines and the code between them.
fn segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut code = String::new();
    let mut has_code = false;
    for (index, line) in source.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            if has_code {
                segments.push(Segment::Code(std::mem::take(&mut code)));
                has_code = false;
            }
            segments.push(Segment::Directive(line.trim().to_string()));
            continue;
        }
        if !has_code && !line.trim().is_empty() {
            code = "\n".repeat(index);
            has_code = true;
        }
        if has_code {
            code.push_str(line);
            code.push('\n');
        }
    }
    if has_code || segments.is_empty() {
        segments.push(Segment::Code(if has_code { code } else { source.to_string() }));
    }
    segments
}

enum Directive {
    Quit,
    Use(String),
    Sections,
    Libs,
    Native { library: String, symbol: String },
}

/// Split a directive's arguments into words, honouring double quotes.
fn directive_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut word = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => word.push(ch),
                    None => return Err("unterminated string in directive".into()),
                }
            }
            words.push(word);
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            words.push(word);
        }
    }
    Ok(words)
}

fn parse_directive(line: &str) -> Result<Directive, String> {
    let words = directive_words(line.trim_start_matches('#'))?;
    let args: Vec<&str> = words.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["quit"] => Ok(Directive::Quit),
        ["use", file] => Ok(Directive::Use(file.to_string())),
        ["sections"] => Ok(Directive::Sections),
        ["libs"] => Ok(Directive::Libs),
        ["native", library, symbol] => Ok(Directive::Native {
            library: library.to_string(),
            symbol: symbol.to_string(),
        }),
        [name, ..] => Err(format!("unknown directive #{name} or wrong arguments")),
        [] => Err("empty directive".into()),
    }
}

pub struct Toplevel<C = QuillCompiler> {
    image: ProgramImage,
    reifier: Reifier,
    env: SymbolEnv,
    compiler: C,
    libraries: DynamicLibraryStub,
    term_status: TermStatus,
    config: ToplevelConfig,
    /// Canonical paths of the `#use` files being run, outermost first.
    use_stack: Vec<PathBuf>,
}

impl Toplevel<QuillCompiler> {
    /// A ready session: stdlib primitives and the bytecode backend installed.
    pub fn new(config: ToplevelConfig) -> Self {
        let mut toplevel = Self::uninitialized(config, QuillCompiler);
        toplevel.install_backend(BytecodeBackend);
        toplevel
    }
}

impl<C: FragmentCompiler> Toplevel<C> {
    /// A session with no reification backend: every turn that reaches
    /// reification fails with `ToplevelNotInitialized`.
    pub fn uninitialized(config: ToplevelConfig, compiler: C) -> Self {
        let image = ProgramImage::with_stdlib();
        let env = SymbolEnv::with_primitives(&image.primitives.borrow());
        Self {
            reifier: Reifier::new(image.clone()),
            image,
            env,
            compiler,
            libraries: DynamicLibraryStub::new(),
            term_status: TermInfo::setup(),
            config,
            use_stack: Vec::new(),
        }
    }

    pub fn with_compiler(config: ToplevelConfig, compiler: C) -> Self {
        let mut toplevel = Self::uninitialized(config, compiler);
        toplevel.install_backend(BytecodeBackend);
        toplevel
    }

    pub fn install_backend(&mut self, backend: impl ReifyBackend + 'static) {
        self.reifier.install_backend(backend);
    }

    pub fn image(&self) -> &ProgramImage {
        &self.image
    }

    pub fn env(&self) -> &SymbolEnv {
        &self.env
    }

    pub fn config(&self) -> &ToplevelConfig {
        &self.config
    }

    /// Register a host primitive; the next compile can refer to it by name.
    pub fn define_primitive(&mut self, name: &str, func: NativeFn, arity: isize) -> u32 {
        let index = self
            .image
            .primitives
            .borrow_mut()
            .register(NativeObj::new(name, func, arity));
        self.env.define_primitive(name, index);
        index
    }

    fn repr(&self, value: Value) -> String {
        let heap = self.image.heap.borrow();
        let primitives = self.image.primitives.borrow();
        repr_value(&heap, &primitives, value)
    }

    fn render_diagnostic(&self, source: &str, diag: &Diagnostic) -> String {
        let mut text = String::new();
        if let Some((line, col)) = diag.location {
            if let Some(src_line) = source.lines().nth(line.saturating_sub(1)) {
                match self.term_status {
                    TermStatus::BadTerm => {
                        text.push_str(src_line);
                        text.push('\n');
                        text.push_str(&" ".repeat(col.saturating_sub(1)));
                        text.push_str("^\n");
                    }
                }
            }
        }
        text.push_str("Error: ");
        text.push_str(&diag.message);
        text
    }

    /// Execute one fragment. Program output goes to `out`; the report does not.
    ///
    /// Lines starting with `#` are directives. When a fragment mixes them with
    /// code, each directive and each run of code lines is its own step.
    pub fn run_turn(&mut self, source: &str, out: &mut dyn Write) -> TurnOutcome {
        let mut pieces = segments(source);
        if pieces.len() == 1 {
            if let Some(piece) = pieces.pop() {
                return self.run_segment(&piece, out);
            }
        }
        let mut outcomes = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            let outcome = self.run_segment(piece, out);
            let stop = !outcome.is_success() || outcome.quits();
            outcomes.push(outcome);
            if stop {
                break;
            }
        }
        TurnOutcome::Sequence(outcomes)
    }

    fn run_segment(&mut self, segment: &Segment, out: &mut dyn Write) -> TurnOutcome {
        match segment {
            Segment::Directive(line) => self.run_directive(line, out),
            Segment::Code(code) => self.run_source(code, out),
        }
    }

    fn run_source(&mut self, source: &str, out: &mut dyn Write) -> TurnOutcome {
        let fragment = match self.compiler.compile(source, &self.env) {
            Ok(fragment) => fragment,
            Err(diag) => {
                debug!("compile failed: {}", diag);
                return TurnOutcome::CompileFailed(self.render_diagnostic(source, &diag));
            }
        };
        self.run_fragment(&fragment, out)
    }

    /// Reify and run an already compiled fragment, then commit on success.
    pub fn run_fragment(&mut self, fragment: &CompiledFragment, out: &mut dyn Write) -> TurnOutcome {
        let unit = match self.reifier.reify(&fragment.bytes, fragment.size_hint) {
            Ok(unit) => unit,
            Err(e) => {
                warn!("reification failed: {}", e);
                return TurnOutcome::LinkFailed(e);
            }
        };

        let result = unit.run(out, self.config.fuel);
        if let Err(e) = self.reifier.release_reified(unit) {
            warn!("release failed: {}", e);
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("turn faulted: {}", e);
                return TurnOutcome::Faulted(e);
            }
        };

        if let Err(e) = outcome.commit(&mut self.image.globals.borrow_mut()) {
            warn!("commit failed: {}", e);
            return TurnOutcome::LinkFailed(e);
        }
        self.env.commit(&fragment.definitions);

        let mut bindings = Vec::new();
        for def in &fragment.definitions {
            // Later definitions of the same name in this turn win
            if self.env.global(&def.name).map(|g| g.slot) != Some(def.slot) {
                continue;
            }
            let value = match self.image.globals.borrow().get(def.slot) {
                Ok(value) => value,
                Err(_) => continue,
            };
            bindings.push(Binding {
                name: def.name.clone(),
                type_name: value.type_name(),
                repr: self.repr(value),
            });
        }
        let value = fragment.yields_value.then(|| Reported {
            type_name: outcome.value.type_name(),
            repr: self.repr(outcome.value),
        });
        TurnOutcome::Evaluated { bindings, value }
    }

    /// Run a compiled unit that did not come from this session's compiler.
    pub fn run_unit_bytes(&mut self, bytes: &[u8], out: &mut dyn Write) -> TurnOutcome {
        let size_hint = vm::load_from_bytes(bytes)
            .map(|exe| exe.instruction_count())
            .unwrap_or(0);
        let fragment = CompiledFragment {
            bytes: bytes.to_vec(),
            size_hint,
            definitions: Vec::new(),
            yields_value: true,
        };
        self.run_fragment(&fragment, out)
    }

    fn run_directive(&mut self, line: &str, out: &mut dyn Write) -> TurnOutcome {
        let directive = match parse_directive(line) {
            Ok(d) => d,
            Err(msg) => return TurnOutcome::CompileFailed(format!("Error: {msg}")),
        };
        match directive {
            Directive::Quit => TurnOutcome::Quit,
            Directive::Use(path) => self.use_file(&path, out),
            Directive::Sections => TurnOutcome::Directive(section_table(&self.image).to_string()),
            Directive::Libs => {
                let libs = self.libraries.current_libraries();
                TurnOutcome::Directive(format!("libraries: {} loaded", libs.count))
            }
            Directive::Native { library, symbol } => {
                let found = self
                    .libraries
                    .with_library(&library, |stub, lib| stub.lookup_symbol(lib, &symbol));
                match found {
                    Ok(addr) => TurnOutcome::Directive(format!("{symbol} = {addr:?}")),
                    Err(e) => TurnOutcome::Directive(format!("Error: {e}")),
                }
            }
        }
    }

    /// Run a file's contents as one turn, refusing files already being run.
    fn use_file(&mut self, path: &str, out: &mut dyn Write) -> TurnOutcome {
        let cannot_read = |e: std::io::Error| {
            TurnOutcome::CompileFailed(format!("Error: cannot read {path}: {e}"))
        };
        let resolved = match fs::canonicalize(path) {
            Ok(resolved) => resolved,
            Err(e) => return cannot_read(e),
        };
        if self.use_stack.contains(&resolved) {
            return TurnOutcome::CompileFailed(format!("Error: recursive #use of {path}"));
        }
        if self.use_stack.len() >= MAX_USE_DEPTH {
            return TurnOutcome::CompileFailed(format!(
                "Error: recursive #use of {path}: more than {MAX_USE_DEPTH} nested files"
            ));
        }
        let content = match fs::read_to_string(&resolved) {
            Ok(content) => content,
            Err(e) => return cannot_read(e),
        };
        debug!("#use {}", resolved.display());
        self.use_stack.push(resolved);
        let outcome = self.run_turn(&content, out);
        self.use_stack.pop();
        outcome
    }

    /// Print the toplevel's report of a turn.
    pub fn report(&self, outcome: &TurnOutcome, out: &mut dyn Write) -> std::io::Result<()> {
        match outcome {
            TurnOutcome::Evaluated { bindings, value } => {
                if self.config.echo_bindings {
                    for b in bindings {
                        writeln!(out, "val {} : {} = {}", b.name, b.type_name, b.repr)?;
                    }
                }
                if let Some(v) = value {
                    writeln!(out, "- : {} = {}", v.type_name, v.repr)?;
                }
            }
            TurnOutcome::Directive(text) => writeln!(out, "{text}")?,
            TurnOutcome::Quit => {}
            TurnOutcome::CompileFailed(text) => writeln!(out, "{text}")?,
            TurnOutcome::LinkFailed(e) => writeln!(out, "Error: {e}")?,
            TurnOutcome::Faulted(e) => writeln!(out, "Exception: {e}")?,
            TurnOutcome::Sequence(parts) => {
                for part in parts {
                    self.report(part, out)?;
                }
            }
        }
        Ok(())
    }

    /// Drive turns until the source runs dry or `#quit`.
    pub fn run_session(
        &mut self,
        input: &mut dyn FragmentSource,
        out: &mut dyn Write,
    ) -> Result<()> {
        while let Some(fragment) = input.read_fragment()? {
            if fragment.trim().is_empty() {
                continue;
            }
            let outcome = self.run_turn(&fragment, out);
            self.report(&outcome, out)?;
            if outcome.quits() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_words_handle_quotes() {
        assert_eq!(
            directive_words(r#"native "libm.so" "cos""#).unwrap(),
            vec!["native", "libm.so", "cos"]
        );
        assert!(directive_words(r#"use "oops"#).is_err());
    }

    #[test]
    fn fragments_split_on_directive_lines() {
        let pieces = segments("let a = 1\n  #libs\n\nlet b = 2\n");
        assert_eq!(pieces.len(), 3);
        assert!(matches!(&pieces[0], Segment::Code(code) if code == "let a = 1\n"));
        assert!(matches!(&pieces[1], Segment::Directive(line) if line == "#libs"));
        assert!(matches!(&pieces[2], Segment::Code(code) if code == "\n\n\nlet b = 2\n"));
        assert_eq!(segments("").len(), 1);
    }

    #[test]
    fn unknown_directive_is_reported() {
        assert!(parse_directive("#frobnicate").is_err());
        assert!(parse_directive("#use").is_err());
        assert!(matches!(parse_directive("#quit"), Ok(Directive::Quit)));
    }
}

use std::collections::HashMap;

use log::debug;
use quill_parser::ast::{Program, Stmt};
use quill_parser::parse_program;
use vm::opcode::OpCode;
use vm::{Executable, Prototype};

use crate::error::CompilerError;
use crate::function_compiler::FunctionCompiler;
use crate::statements::StatementCompiler;
use crate::symbols::{Definition, GlobalSymbol, SymbolEnv};

/// Output of one fragment compile.
#[derive(Debug, Clone)]
pub struct CompiledFragment {
    /// Encoded [`Executable`], ready for the reifier.
    pub bytes: Vec<u8>,
    /// Total instruction count across every prototype.
    pub size_hint: usize,
    /// Globals introduced by this fragment, in definition order.
    pub definitions: Vec<Definition>,
    /// Whether the fragment ends its top level with an expression.
    pub yields_value: bool,
}

/// Lowers one fragment against a read-only view of the session's symbols.
pub struct Compiler<'env> {
    pub env: &'env SymbolEnv,
    pub compilers: Vec<FunctionCompiler>,
    pub prototypes: Vec<Prototype>,
    pub strings: Vec<String>,
    string_index: HashMap<String, u32>,

    // Globals defined earlier in this same fragment
    pub staged: Vec<Definition>,
    staged_index: HashMap<String, usize>,

    /// Register holding the fragment's value in `main`.
    pub result_reg: u8,
    yields_value: bool,
}

impl<'env> Compiler<'env> {
    pub fn new(env: &'env SymbolEnv) -> Self {
        Self {
            env,
            compilers: vec![FunctionCompiler::new("main", 0)],
            prototypes: Vec::new(),
            strings: Vec::new(),
            string_index: HashMap::new(),
            staged: Vec::new(),
            staged_index: HashMap::new(),
            result_reg: 0,
            yields_value: false,
        }
    }

    pub fn current(&mut self) -> &mut FunctionCompiler {
        // `compilers` always holds at least `main`
        let last = self.compilers.len() - 1;
        &mut self.compilers[last]
    }

    pub fn current_ref(&self) -> &FunctionCompiler {
        let last = self.compilers.len() - 1;
        &self.compilers[last]
    }

    /// True while emitting top-level code of `main` outside any block.
    pub fn at_top_level(&self) -> bool {
        self.compilers.len() == 1 && self.current_ref().scope_depth == 0
    }

    pub fn in_function(&self) -> bool {
        self.compilers.len() > 1
    }

    pub fn alloc_reg(&mut self) -> Result<u8, CompilerError> {
        self.current().alloc_reg()
    }

    pub fn free_reg(&mut self, reg: u8) {
        self.current().free_reg(reg)
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u8, b: u8, c: u8) {
        self.current().emit_abc(op, a, b, c)
    }

    pub fn emit_abx(&mut self, op: OpCode, a: u8, bx: u16) {
        self.current().emit_abx(op, a, bx)
    }

    pub fn intern_string(&mut self, s: String) -> u32 {
        if let Some(&idx) = self.string_index.get(&s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.string_index.insert(s.clone(), idx);
        self.strings.push(s);
        idx
    }

    /// Reserve a fresh slot for `name`, visible to the rest of this fragment.
    pub fn stage_global(&mut self, name: &str, mutable: bool) -> Result<u16, CompilerError> {
        let slot = self.env.next_slot() + self.staged.len();
        let bx = u16::try_from(slot).map_err(|_| CompilerError::TooManyGlobals)?;
        self.staged_index.insert(name.to_string(), self.staged.len());
        self.staged.push(Definition {
            name: name.to_string(),
            slot,
            mutable,
        });
        Ok(bx)
    }

    /// Staged definitions shadow the committed environment.
    pub fn resolve_global(&self, name: &str) -> Option<GlobalSymbol> {
        if let Some(&i) = self.staged_index.get(name) {
            let def = &self.staged[i];
            return Some(GlobalSymbol {
                slot: def.slot,
                mutable: def.mutable,
            });
        }
        self.env.global(name)
    }

    pub fn compile_program(mut self, program: &Program) -> Result<CompiledFragment, CompilerError> {
        self.result_reg = self.alloc_reg()?;
        self.emit_abx(OpCode::LoadNil, self.result_reg, 0);

        for stmt in &program.stmts {
            self.compile_stmt(stmt)?;
        }
        self.emit_abc(OpCode::Return, self.result_reg, 0, 0);
        self.yields_value = matches!(program.stmts.last(), Some(Stmt::Expr(_)));

        let main = match self.compilers.pop() {
            Some(main) => main.into_prototype(),
            None => Prototype::new("main"),
        };
        let exe = Executable {
            strings: self.strings,
            prototypes: self.prototypes,
            main,
        };
        let size_hint = exe.instruction_count();
        debug!(
            "compiled fragment: {} prototypes, {} instructions, {} definitions",
            exe.prototypes.len(),
            size_hint,
            self.staged.len()
        );

        Ok(CompiledFragment {
            bytes: exe.to_bytes(),
            size_hint,
            definitions: self.staged,
            yields_value: self.yields_value,
        })
    }
}

/// Compile an already parsed fragment.
pub fn compile_program(program: &Program, env: &SymbolEnv) -> Result<CompiledFragment, CompilerError> {
    Compiler::new(env).compile_program(program)
}

/// Parse and compile one toplevel fragment.
pub fn compile(source: &str, env: &SymbolEnv) -> Result<CompiledFragment, CompilerError> {
    let program = parse_program(source)?;
    compile_program(&program, env)
}

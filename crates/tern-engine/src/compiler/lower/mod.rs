//! AST to IR Lowering
//!
//! Converts a resolved and typed AST into the IR. Each function literal
//! becomes its own [`IrFunction`]; the script body is function 0.
//!
//! Dispatch sites and speculation ids are numbered in the order their
//! nodes are lowered, so lowering the same tree twice yields the same
//! module.

mod control_flow;
mod expr;
mod stmt;

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

pub use control_flow::{ControlEntry, ControlStack, JumpTarget};

use crate::analysis::{Binding, Capture, FunctionScope, OptType, Resolution, TypeMap};
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{
    BasicBlock, BasicBlockId, FunctionId, IrConstant, IrFunction, IrInstr, IrModule, Register, RegisterId, SiteId,
    SiteInfo, SiteKind, SpecId, Speculation, Terminator,
};
use crate::parser::ast::{FunctionKind, FunctionNode, Identifier, NodeId, Program, Statement};
use crate::parser::interner::{Interner, Symbol};
use crate::parser::token::Span;

/// Per-function lowering state.
struct FunctionBuilder<'a> {
    func: IrFunction,
    current: BasicBlockId,
    next_block: u32,
    next_register: u32,
    control: ControlStack<'a>,
    /// Script only: register holding the completion value
    completion: Option<Register>,
    line: u32,
    /// Function declarations already initialized at block entry
    hoisted: FxHashSet<NodeId>,
}

impl<'a> FunctionBuilder<'a> {
    fn new(mut func: IrFunction, line: u32) -> Self {
        let entry = BasicBlockId(0);
        func.add_block(BasicBlock::with_label(entry, "entry"));
        func.entry_block = entry;
        Self {
            func,
            current: entry,
            next_block: 1,
            next_register: 0,
            control: ControlStack::new(),
            completion: None,
            line,
            hoisted: FxHashSet::default(),
        }
    }
}

/// Lowers one program into an [`IrModule`].
pub struct Lowerer<'a> {
    interner: &'a Interner,
    resolution: &'a Resolution,
    types: &'a TypeMap,
    functions: Vec<Option<IrFunction>>,
    sites: Vec<SiteInfo>,
    next_spec: u32,
    strings: FxHashMap<Symbol, Rc<str>>,
    fb: FunctionBuilder<'a>,
}

impl<'a> Lowerer<'a> {
    pub fn new(interner: &'a Interner, resolution: &'a Resolution, types: &'a TypeMap) -> Self {
        Self {
            interner,
            resolution,
            types,
            functions: Vec::new(),
            sites: Vec::new(),
            next_spec: 0,
            strings: FxHashMap::default(),
            fb: FunctionBuilder::new(IrFunction::new(FunctionId(0), None), 1),
        }
    }

    /// Lower the whole program.
    pub fn lower_program(mut self, program: &'a Program) -> CompileResult<IrModule> {
        let main = self.reserve_function();
        let layout = self.layout(program.id);

        let mut func = IrFunction::new(main, None);
        func.is_script = true;
        func.constructible = false;
        func.source_span = program.span;
        self.apply_layout(&mut func, &layout);
        self.fb = FunctionBuilder::new(func, program.span.line);

        for name in &layout.global_declarations {
            let name = self.string(*name);
            self.emit(IrInstr::DeclareGlobal { name });
        }
        let completion = self.const_reg(IrConstant::Undefined);
        self.fb.completion = Some(completion);
        self.prologue(&layout);
        self.hoist_functions(&program.body)?;
        self.lower_statements(&program.body)?;
        self.terminate(Terminator::Return(completion));
        self.finish_function();

        let functions: Vec<IrFunction> = self.functions.into_iter().flatten().collect();
        log::debug!(
            "lowered {} functions, {} dispatch sites, {} speculations",
            functions.len(),
            self.sites.len(),
            self.next_spec
        );
        Ok(IrModule {
            functions,
            main,
            sites: self.sites,
            speculation_count: self.next_spec,
        })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn reserve_function(&mut self) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(None);
        id
    }

    fn layout(&self, node: NodeId) -> FunctionScope {
        self.resolution.function(node).cloned().unwrap_or_default()
    }

    fn apply_layout(&self, func: &mut IrFunction, layout: &FunctionScope) {
        func.param_count = layout.param_count;
        func.local_count = layout.local_count;
        func.cell_count = layout.cell_count;
        func.upvalues = layout.upvalues.clone();
        func.strict = layout.strict;
    }

    /// Lower a function literal into a fresh `IrFunction`.
    fn lower_function(&mut self, node: &'a FunctionNode) -> CompileResult<FunctionId> {
        let id = self.reserve_function();
        let layout = self.layout(node.id);
        let name = node.name.as_ref().map(|n| self.string(n.name));

        let mut func = IrFunction::new(id, name);
        func.source_span = node.span;
        func.constructible = matches!(node.kind, FunctionKind::Declaration | FunctionKind::Expression);
        self.apply_layout(&mut func, &layout);

        let saved = std::mem::replace(&mut self.fb, FunctionBuilder::new(func, node.span.line));
        let result: CompileResult<()> = (|| {
            self.prologue(&layout);
            self.hoist_functions(&node.body)?;
            self.lower_statements(&node.body)?;
            let undefined = self.const_reg(IrConstant::Undefined);
            self.terminate(Terminator::Return(undefined));
            Ok(())
        })();
        self.finish_function();
        self.fb = saved;
        result.map(|_| id)
    }

    /// Move parameters into their cells and materialize `arguments` and
    /// the self-name binding.
    fn prologue(&mut self, layout: &FunctionScope) {
        for (slot, cell) in layout.param_cells.iter().enumerate() {
            if let Some(cell) = cell {
                let value = self.new_register(OptType::Generic);
                self.emit(IrInstr::LoadLocal {
                    dest: value,
                    slot: slot as u32,
                });
                self.emit(IrInstr::StoreCell { cell: *cell, value });
            }
        }
        if let Some(binding) = &layout.arguments {
            let dest = self.new_register(OptType::Object);
            self.emit(IrInstr::CreateArguments { dest });
            self.store_binding(binding, "arguments".into(), dest);
        }
        if let Some(binding) = &layout.self_name {
            let dest = self.new_register(OptType::Object);
            self.emit(IrInstr::LoadCallee { dest });
            let name = self.fb.func.name.clone().unwrap_or_else(|| "".into());
            self.store_binding(binding, name, dest);
        }
    }

    fn finish_function(&mut self) {
        let placeholder = FunctionBuilder::new(IrFunction::new(FunctionId(u32::MAX), None), 0);
        let fb = std::mem::replace(&mut self.fb, placeholder);
        let mut func = fb.func;
        func.register_count = fb.next_register;
        func.compact();
        let index = func.id.0 as usize;
        if let Some(slot) = self.functions.get_mut(index) {
            *slot = Some(func);
        }
    }

    /// Initialize the function declarations of a statement list.
    fn hoist_functions(&mut self, statements: &'a [Statement]) -> CompileResult<()> {
        for statement in statements {
            if let Statement::Function(f) = statement {
                self.declare_function(f)?;
                self.fb.hoisted.insert(f.id);
            }
        }
        Ok(())
    }

    fn declare_function(&mut self, f: &'a FunctionNode) -> CompileResult<()> {
        let Some(name) = &f.name else {
            return Err(CompileError::syntax("Function declaration requires a name", f.span));
        };
        let function = self.lower_function(f)?;
        let dest = self.new_register(OptType::Object);
        self.emit(IrInstr::MakeClosure { dest, function });
        let binding = self.binding_of(name);
        let text = self.string(name.name);
        self.store_binding(&binding, text, dest);
        Ok(())
    }

    // ========================================================================
    // Blocks, registers and emission
    // ========================================================================

    fn new_block(&mut self, label: &str) -> BasicBlockId {
        let id = BasicBlockId(self.fb.next_block);
        self.fb.next_block += 1;
        self.fb.func.add_block(BasicBlock::with_label(id, label));
        id
    }

    fn switch_to(&mut self, block: BasicBlockId) {
        self.fb.current = block;
    }

    fn is_terminated(&self) -> bool {
        self.fb
            .func
            .get_block(self.fb.current)
            .map_or(true, |b| b.is_terminated())
    }

    fn emit(&mut self, instr: IrInstr) {
        let line = self.fb.line;
        if let Some(block) = self.fb.func.get_block_mut(self.fb.current) {
            if !block.is_terminated() {
                block.add_instr(instr, line);
            }
        }
    }

    /// Set the current block's terminator unless one is already set.
    fn terminate(&mut self, term: Terminator) {
        if let Some(block) = self.fb.func.get_block_mut(self.fb.current) {
            if !block.is_terminated() {
                block.set_terminator(term);
            }
        }
    }

    /// Continue in a block nothing jumps to; `compact` removes it.
    fn start_dead_block(&mut self) {
        let block = self.new_block("dead");
        self.switch_to(block);
    }

    fn new_register(&mut self, ty: OptType) -> Register {
        let id = RegisterId(self.fb.next_register);
        self.fb.next_register += 1;
        Register::new(id, ty)
    }

    fn const_reg(&mut self, value: IrConstant) -> Register {
        let ty = match &value {
            IrConstant::Int(_) => OptType::Int32,
            IrConstant::Number(_) => OptType::Number,
            IrConstant::Boolean(_) => OptType::Boolean,
            IrConstant::String(_) => OptType::String,
            IrConstant::Undefined | IrConstant::Null => OptType::Generic,
        };
        let dest = self.new_register(ty);
        self.emit(IrInstr::Const { dest, value });
        dest
    }

    fn set_line(&mut self, span: &Span) {
        self.fb.line = span.line;
    }

    fn site(&mut self, kind: SiteKind) -> SiteId {
        let id = SiteId(self.sites.len() as u32);
        self.sites.push(SiteInfo {
            id,
            kind,
            line: self.fb.line,
        });
        id
    }

    /// Speculation for an arithmetic node typed numeric.
    fn speculation(&mut self, node: NodeId) -> Option<Speculation> {
        let ty = self.types.get(node);
        if !ty.is_numeric() {
            return None;
        }
        let id = SpecId(self.next_spec);
        self.next_spec += 1;
        Some(Speculation { id, ty })
    }

    fn string(&mut self, sym: Symbol) -> Rc<str> {
        let interner = self.interner;
        self.strings
            .entry(sym)
            .or_insert_with(|| Rc::from(interner.resolve(sym)))
            .clone()
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    fn binding_of(&self, ident: &Identifier) -> Binding {
        self.resolution.binding(ident.id).cloned().unwrap_or(Binding::Global)
    }

    fn reset_cells(&mut self, node: NodeId) {
        for cell in self.resolution.block_cells(node) {
            self.emit(IrInstr::ResetCell { cell: *cell });
        }
    }

    fn load_binding(&mut self, binding: &Binding, name: Rc<str>, ty: OptType, typeof_guard: bool) -> Register {
        let dest = self.new_register(ty);
        let instr = match binding {
            Binding::Local(slot) => IrInstr::LoadLocal { dest, slot: *slot },
            Binding::Captured(Capture::Own(cell)) => IrInstr::LoadCell { dest, cell: *cell },
            Binding::Captured(Capture::Upvalue(index)) => IrInstr::LoadUpvalue { dest, index: *index },
            Binding::Global => IrInstr::LoadGlobal {
                dest,
                name,
                typeof_guard,
            },
            Binding::Dynamic(inner) => IrInstr::LoadName {
                dest,
                name,
                fallback: inner.fallback().clone(),
                typeof_guard,
            },
        };
        self.emit(instr);
        dest
    }

    fn store_binding(&mut self, binding: &Binding, name: Rc<str>, value: Register) {
        let strict = self.fb.func.strict;
        let instr = match binding {
            Binding::Local(slot) => IrInstr::StoreLocal { slot: *slot, value },
            Binding::Captured(Capture::Own(cell)) => IrInstr::StoreCell { cell: *cell, value },
            Binding::Captured(Capture::Upvalue(index)) => IrInstr::StoreUpvalue { index: *index, value },
            Binding::Global => IrInstr::StoreGlobal { name, value, strict },
            Binding::Dynamic(inner) => IrInstr::StoreName {
                name,
                value,
                fallback: inner.fallback().clone(),
                strict,
            },
        };
        self.emit(instr);
    }
}

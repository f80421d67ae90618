//! Pretty-printing for IR

use std::fmt::{self, Write};

use super::block::BasicBlock;
use super::function::IrFunction;
use super::module::IrModule;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for IrModule {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = write_module(&mut output, self);
        output
    }
}

impl PrettyPrint for IrFunction {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        let _ = write_function(&mut output, self);
        output
    }
}

fn write_module(out: &mut String, module: &IrModule) -> fmt::Result {
    writeln!(out, "; {} sites, {} speculations", module.sites.len(), module.speculation_count)?;
    for site in &module.sites {
        writeln!(out, "; {} = {} (line {})", site.id, site.kind, site.line)?;
    }
    for function in &module.functions {
        writeln!(out)?;
        write_function(out, function)?;
    }
    Ok(())
}

fn write_function(out: &mut String, func: &IrFunction) -> fmt::Result {
    writeln!(
        out,
        "fn {} {}(params={}, locals={}, cells={}, upvalues={}){} {{",
        func.id,
        func.display_name(),
        func.param_count,
        func.local_count,
        func.cell_count,
        func.upvalues.len(),
        if func.strict { " strict" } else { "" }
    )?;
    for block in &func.blocks {
        write_block(out, block, 2)?;
    }
    writeln!(out, "}}")
}

fn write_block(out: &mut String, block: &BasicBlock, indent: usize) -> fmt::Result {
    let prefix = " ".repeat(indent);
    match &block.label {
        Some(label) => writeln!(out, "{}{}: ; {}", prefix, block.id, label)?,
        None => writeln!(out, "{}{}:", prefix, block.id)?,
    }
    for instr in &block.instructions {
        writeln!(out, "{}  {}", prefix, instr)?;
    }
    writeln!(out, "{}  {}", prefix, block.terminator)
}

//! Compilation pipeline: parse, resolve, type, lower.

pub mod error;
pub mod ir;
pub mod lower;

pub use error::{CompileError, CompileErrorKind, CompileResult};
pub use ir::IrModule;
pub use lower::Lowerer;

use crate::analysis::{analyze, resolve};
use crate::config::CompileOptions;
use crate::parser::Parser;

/// Compile `source` into an IR module.
pub fn compile(source: &str, options: &CompileOptions, max_parse_depth: usize) -> CompileResult<IrModule> {
    let (program, interner) = Parser::with_options(source, options.strict_mode, max_parse_depth).parse()?;
    let resolution = resolve(&program, &interner)?;
    let types = analyze(&program, &resolution, options.optimistic_types);
    log::debug!("typed {} expressions (optimistic={})", types.len(), options.optimistic_types);
    let module = Lowerer::new(&interner, &resolution, &types).lower_program(&program)?;
    if let Err(message) = module.validate() {
        return Err(CompileError::syntax(format!("Internal compiler error: {}", message), program.span));
    }
    Ok(module)
}

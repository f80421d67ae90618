//! IR Module: every function of one compiled script plus the dispatch
//! site and speculation tables the executor allocates state for.

use std::rc::Rc;

use super::function::IrFunction;
use super::instr::{FunctionId, SiteId};

/// What a dispatch site dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SiteKind {
    /// `obj.name`, as a read, write or both
    Property(Rc<str>),
    /// `obj[key]`
    Element,
    Call,
    Construct,
}

impl std::fmt::Display for SiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteKind::Property(name) => write!(f, "property .{}", name),
            SiteKind::Element => write!(f, "element"),
            SiteKind::Call => write!(f, "call"),
            SiteKind::Construct => write!(f, "construct"),
        }
    }
}

/// Static description of one dispatch site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub id: SiteId,
    pub kind: SiteKind,
    pub line: u32,
}

/// A compiled script.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    /// Indexed by `FunctionId`; the script body is `main`
    pub functions: Vec<IrFunction>,
    pub main: FunctionId,
    /// Indexed by `SiteId`
    pub sites: Vec<SiteInfo>,
    pub speculation_count: u32,
}

impl IrModule {
    pub fn function(&self, id: FunctionId) -> Option<&IrFunction> {
        self.functions.get(id.0 as usize)
    }

    pub fn main_function(&self) -> Option<&IrFunction> {
        self.function(self.main)
    }

    pub fn site(&self, id: SiteId) -> Option<&SiteInfo> {
        self.sites.get(id.0 as usize)
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        for function in &self.functions {
            function.validate()?;
        }
        Ok(())
    }
}

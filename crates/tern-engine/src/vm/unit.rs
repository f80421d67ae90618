//! Runtime state of a compiled script: its IR plus the mutable dispatch
//! sites and speculation table the executor updates.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use super::deopt::SpeculationTable;
use super::dispatch::DispatchSite;
use crate::compiler::ir::IrModule;

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

pub struct UnitCode {
    pub id: u64,
    pub module: IrModule,
    pub sites: RefCell<Vec<DispatchSite>>,
    pub speculations: RefCell<SpeculationTable>,
}

impl UnitCode {
    pub fn new(module: IrModule) -> Self {
        let sites = module.sites.iter().map(DispatchSite::new).collect();
        let speculations = SpeculationTable::new(module.speculation_count as usize);
        Self {
            id: NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed),
            module,
            sites: RefCell::new(sites),
            speculations: RefCell::new(speculations),
        }
    }
}

impl std::fmt::Debug for UnitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCode")
            .field("id", &self.id)
            .field("functions", &self.module.functions.len())
            .field("sites", &self.module.sites.len())
            .finish()
    }
}

use num_derive::FromPrimitive;

use super::options::QualityType;

/// Initialization options for `init_h`.
///
/// A 2-digit flag: the tens digit selects whether link flows are
/// re-initialized and the ones digit whether results are saved to the
/// scratch hydraulics file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum InitHydOption {
    NoSave = 0,       // Don't save hydraulics; don't re-initialize flows
    Save = 1,         // Save hydraulics to file; don't re-initialize flows
    InitFlow = 10,    // Don't save hydraulics; re-initialize flows
    SaveAndInit = 11, // Save hydraulics; re-initialize flows
}

impl InitHydOption {
    pub(crate) fn saves(self) -> bool {
        matches!(self, InitHydOption::Save | InitHydOption::SaveAndInit)
    }

    pub(crate) fn reinits_flows(self) -> bool {
        matches!(self, InitHydOption::InitFlow | InitHydOption::SaveAndInit)
    }
}

/// Describes the kind of water quality analysis a project performs.
pub struct QualityAnalysisInfo {
    pub quality_type: QualityType,
    pub chem_name: String,
    pub chem_units: String,
    pub trace_node_index: i32,
}

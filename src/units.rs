//! Internal unit system and numerical constants.
//!
//! The engine works in US customary internal units: feet for length and
//! head, seconds for time, cfs for flow. Converting user units to these is
//! the responsibility of whatever loads the network; the factors here are
//! exposed for embedders and tests.

use crate::types::options::FlowUnits;

pub const GPM_PER_CFS: f64 = 448.831;
pub const AFD_PER_CFS: f64 = 1.9837;
pub const MGD_PER_CFS: f64 = 0.64632;
pub const IMGD_PER_CFS: f64 = 0.5382;
pub const LPS_PER_CFS: f64 = 28.317;
pub const LPM_PER_CFS: f64 = 1699.0;
pub const CMH_PER_CFS: f64 = 101.94;
pub const CMD_PER_CFS: f64 = 2446.6;
pub const MLD_PER_CFS: f64 = 2.4466;
pub const CMS_PER_CFS: f64 = 0.028317;

pub const M_PER_FT: f64 = 0.3048;
pub const PSI_PER_FT: f64 = 0.4333;
pub const KPA_PER_PSI: f64 = 6.895;
pub const L_PER_FT3: f64 = 28.317;
pub const KW_PER_HP: f64 = 0.7457;
pub const SEC_PER_DAY: u64 = 86400;

/// Kinematic viscosity of water @ 20 deg C (sq ft/sec)
pub const VISCOS: f64 = 1.1e-5;
/// Diffusivity of chlorine @ 20 deg C (sq ft/sec)
pub const DIFFUS: f64 = 1.3e-8;

// Numerical constants shared across the engine.
pub(crate) const BIG: f64 = 1.0e10;
pub(crate) const TINY: f64 = 1.0e-6;
pub(crate) const CBIG: f64 = 1.0e8;
pub(crate) const CSMALL: f64 = 1.0e-6;
/// Sentinel for an unset link setting.
pub(crate) const MISSING: f64 = -1.0e10;

/// Multiplier converting internal cfs into the given flow units.
pub fn flow_ucf(units: FlowUnits) -> f64 {
    match units {
        FlowUnits::Cfs => 1.0,
        FlowUnits::Gpm => GPM_PER_CFS,
        FlowUnits::Mgd => MGD_PER_CFS,
        FlowUnits::Imgd => IMGD_PER_CFS,
        FlowUnits::Afd => AFD_PER_CFS,
        FlowUnits::Lps => LPS_PER_CFS,
        FlowUnits::Lpm => LPM_PER_CFS,
        FlowUnits::Mld => MLD_PER_CFS,
        FlowUnits::Cmh => CMH_PER_CFS,
        FlowUnits::Cmd => CMD_PER_CFS,
        FlowUnits::Cms => CMS_PER_CFS,
    }
}

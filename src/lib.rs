//! Native Rust implementation of the EPANET water distribution network
//! simulation core: extended-period hydraulics driven by the Global
//! Gradient Algorithm and Lagrangian water quality transport.
//!
//! All state belongs to an [`EPANET`] project value. The engine holds no
//! process-wide mutable state, so independent projects may run in
//! parallel on separate threads; a single project is strictly
//! single-threaded.
//!
//! The engine computes in US customary internal units (feet, seconds,
//! cfs). Converting user units is the responsibility of whatever loads
//! the network; conversion factors live in [`units`].

pub mod epanet_error;
pub mod types;
pub mod units;

mod hydraul;
mod impls;
mod network;
mod quality;
mod rules;

pub use epanet_error::{EPANETError, Result};
pub use hydraul::energy::PumpEnergyUsage;
pub use hydraul::flowbalance::FlowBalance;

use hydraul::hydfile::HydFile;
use hydraul::{Hydraul, Times};
use network::Network;
use quality::Quality;
use types::options::{FlowUnits, HeadLossType, PressUnits};

/// An EPANET Project.
///
/// Create one with [`EPANET::new`], build a network through the node,
/// link, pattern, curve, control and rule methods, then run the
/// hydraulic (`open_h` / `init_h` / `run_h` / `next_h`) and water
/// quality (`open_q` / `init_q` / `run_q` / `next_q`) solvers.
pub struct EPANET {
    pub(crate) network: Network,
    pub(crate) hydraul: Hydraul,
    pub(crate) quality: Quality,
    pub(crate) times: Times,
    pub(crate) hydfile: HydFile,
    pub(crate) title: Vec<String>,
    pub(crate) flow_units: FlowUnits,
    pub(crate) press_units: PressUnits,
    pub(crate) progress: std::option::Option<Box<dyn FnMut(u64) + Send>>,
}

impl EPANET {
    /// Creates an empty project.
    ///
    /// The report and output file names are accepted for toolkit
    /// compatibility; report and binary output writing belong to external
    /// collaborators, so the core ignores them.
    pub fn new(
        _report_path: &str,
        _out_path: &str,
        flow_units: FlowUnits,
        headloss: HeadLossType,
    ) -> Result<Self> {
        let mut hydraul = Hydraul::new();
        hydraul.formflag = headloss;
        Ok(EPANET {
            network: Network::new(),
            hydraul,
            quality: Quality::new(),
            times: Times::default(),
            hydfile: HydFile::default(),
            title: Vec::new(),
            flow_units,
            press_units: PressUnits::Psi,
            progress: None,
        })
    }

    /// Registers a callback invoked with the simulation clock after each
    /// completed hydraulic step. It is a pure observer and carries no
    /// cancellation channel.
    pub fn set_progress_callback<F>(&mut self, cb: F)
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.progress = Some(Box::new(cb));
    }
}

impl std::fmt::Debug for EPANET {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EPANET")
            .field("nodes", &self.network.nnodes())
            .field("links", &self.network.nlinks())
            .field("flow_units", &self.flow_units)
            .finish()
    }
}

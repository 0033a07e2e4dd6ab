//! The hydraulic engine: solver state, coefficient assembly, discrete
//! status machines, leakage, the Newton outer loop and the extended-period
//! time stepper.

pub(crate) mod coeffs;
pub(crate) mod energy;
pub(crate) mod flowbalance;
pub(crate) mod hydfile;
pub(crate) mod leakage;
pub(crate) mod smatrix;
pub(crate) mod solver;
pub(crate) mod status;
pub(crate) mod timestep;

use crate::network::Network;
use crate::types::link::{LinkStatus, LinkType};
use crate::types::options::{DemandModel, HeadLossType, StatusReport};
use crate::units::{MISSING, PSI_PER_FT, VISCOS};

use flowbalance::FlowBalance;
use leakage::LeakNode;
use smatrix::Smatrix;

/// Simulation clock and scheduling parameters, all in seconds.
#[derive(Debug, Clone)]
pub(crate) struct Times {
    pub dur: u64,
    pub hstep: u64,
    pub qstep: u64,
    pub pstep: u64,
    pub pstart: u64,
    pub rstep: u64,
    pub rstart: u64,
    /// Next reporting time.
    pub rtime: u64,
    pub rulestep: u64,
    /// Starting time of day.
    pub tstart: u64,
    pub htime: u64,
    pub qtime: u64,
    pub haltflag: bool,
}

impl Default for Times {
    fn default() -> Self {
        Times {
            dur: 0,
            hstep: 3600,
            qstep: 0,
            pstep: 3600,
            pstart: 0,
            rstep: 3600,
            rstart: 0,
            rtime: 0,
            rulestep: 360,
            tstart: 0,
            htime: 0,
            qtime: 0,
            haltflag: false,
        }
    }
}

/// Hydraulic solver state. All vectors are 1-based to match the network's
/// object indices.
#[derive(Debug, Default)]
pub(crate) struct Hydraul {
    pub node_head: Vec<f64>,
    /// Consumer demand target at junctions; net inflow at tanks/reservoirs.
    pub node_demand: Vec<f64>,
    /// Demand requested at full pressure.
    pub full_demand: Vec<f64>,
    /// Demand actually delivered (equals the target under DDA).
    pub demand_flow: Vec<f64>,
    pub emitter_flow: Vec<f64>,
    pub leakage_flow: Vec<f64>,
    pub link_flow: Vec<f64>,
    pub link_status: Vec<LinkStatus>,
    pub link_setting: Vec<f64>,
    /// Status at the previous step, kept for change reporting
    /// (links first, then one slot per tank).
    pub old_status: Vec<LinkStatus>,
    /// Node flow imbalance workspace used by coefficient assembly.
    pub xflow: Vec<f64>,
    /// Inverse head-loss gradient per link.
    pub p: Vec<f64>,
    /// Flow correction term per link.
    pub y: Vec<f64>,
    pub sm: Smatrix,
    /// Per-junction leakage state; empty when no pipe can leak.
    pub leakage: Vec<LeakNode>,
    pub has_leakage: bool,
    /// Net tank inflow at the previous hydraulic solution, for the
    /// trapezoidal volume integration.
    pub tank_qlast: Vec<f64>,

    // --- options ---
    pub formflag: HeadLossType,
    pub demand_model: DemandModel,
    pub htol: f64,
    pub qtol: f64,
    pub hacc: f64,
    /// Exponent in the Hazen-Williams head loss formula.
    pub hexp: f64,
    /// Emitter head loss exponent (reciprocal of the discharge exponent).
    pub qexp: f64,
    pub rqtol: f64,
    pub head_error_limit: f64,
    pub flow_change_limit: f64,
    pub maxiter: usize,
    /// Extra iterations allowed when unbalanced; -1 stops with an error.
    pub extra_iter: i32,
    pub checkfreq: usize,
    pub maxcheck: usize,
    pub damplimit: f64,
    pub viscos: f64,
    pub spgrav: f64,
    pub pmin: f64,
    pub preq: f64,
    pub pexp: f64,
    pub dmult: f64,
    pub emit_backflow: bool,
    pub statflag: StatusReport,

    // --- global energy options ---
    pub epat: usize,
    pub ecost: f64,
    pub dcost: f64,
    pub epump: f64,
    pub emax: f64,

    // --- solver status ---
    pub relax_factor: f64,
    pub dsystem: f64,
    pub iterations: usize,
    pub relative_error: f64,
    pub max_head_error: f64,
    pub max_flow_change: f64,
    pub deficient_nodes: usize,
    pub demand_reduction: f64,
    pub leakage_loss: f64,
    pub flow_balance: FlowBalance,

    // --- flags ---
    pub open_flag: bool,
    /// Saving the current run's results to the scratch hydraulics file.
    pub save_flag: bool,
    /// A complete saved solution exists in the scratch hydraulics file.
    pub saved_flag: bool,
    /// Hydraulics were supplied from an external file.
    pub from_file: bool,
}

impl Hydraul {
    pub fn new() -> Self {
        Hydraul {
            formflag: HeadLossType::HazenWilliams,
            demand_model: DemandModel::Dda,
            htol: 0.0005,
            qtol: 0.0001,
            hacc: 0.001,
            hexp: 1.852,
            qexp: 2.0,
            rqtol: 1.0e-7,
            head_error_limit: 0.0,
            flow_change_limit: 0.0,
            maxiter: 200,
            extra_iter: -1,
            checkfreq: 2,
            maxcheck: 10,
            damplimit: 0.0,
            viscos: VISCOS,
            spgrav: 1.0,
            pmin: 0.0,
            preq: 0.1 / PSI_PER_FT,
            pexp: 0.5,
            dmult: 1.0,
            emit_backflow: true,
            statflag: StatusReport::NoReport,
            epump: 75.0,
            relax_factor: 1.0,
            ..Hydraul::default()
        }
    }

    /// Sizes the state vectors for the current network and builds the
    /// sparse matrix structures. Called by `open_h`.
    pub fn open(&mut self, net: &Network) {
        let nnodes = net.nnodes();
        let nlinks = net.nlinks();
        let ntanks = net.ntanks();
        self.node_head = vec![0.0; nnodes + 1];
        self.node_demand = vec![0.0; nnodes + 1];
        self.full_demand = vec![0.0; nnodes + 1];
        self.demand_flow = vec![0.0; nnodes + 1];
        self.emitter_flow = vec![0.0; nnodes + 1];
        self.leakage_flow = vec![0.0; nnodes + 1];
        self.link_flow = vec![0.0; nlinks + 1];
        self.link_status = vec![LinkStatus::Open; nlinks + 1];
        self.link_setting = vec![0.0; nlinks + 1];
        self.old_status = vec![LinkStatus::Open; nlinks + ntanks + 1];
        self.xflow = vec![0.0; nnodes + 1];
        self.p = vec![0.0; nlinks + 1];
        self.y = vec![0.0; nlinks + 1];
        self.tank_qlast = vec![0.0; ntanks + 1];
        self.sm = Smatrix::create(net);
        self.open_flag = true;
    }

    /// Default starting flow for a link, used when flows are (re)initialized.
    fn init_link_flow(link: &crate::network::Link, status: LinkStatus, pump_q0: f64) -> f64 {
        if status.is_closed() {
            crate::units::CSMALL
        } else if link.ty == LinkType::Pump && pump_q0 > 0.0 {
            pump_q0
        } else {
            // One ft/s through the link's cross-section.
            link.area().max(crate::units::CSMALL)
        }
    }

    /// Resets tank levels, link status/settings/flows and solver statistics
    /// ahead of a run. Called by `init_h`.
    pub fn init(&mut self, net: &mut Network, times: &mut Times, init_flows: bool) {
        // Initialize tanks.
        for j in 1..=net.ntanks() {
            net.tanks[j].v = net.tanks[j].v0;
            let node = net.tanks[j].node;
            self.node_head[node] = net.tanks[j].h0;
            self.node_demand[node] = 0.0;
            self.tank_qlast[j] = 0.0;
            let nlinks = net.nlinks();
            self.old_status[nlinks + j] = LinkStatus::TempClosed;
        }
        // Initialize junction heads to their elevations.
        for i in 1..=net.njuncs {
            self.node_head[i] = net.nodes[i].el;
            self.emitter_flow[i] = if net.nodes[i].ke > 0.0 { 1.0 } else { 0.0 };
            self.leakage_flow[i] = 0.0;
        }
        // Initialize link status and settings from their initial values.
        for k in 1..=net.nlinks() {
            let link = &net.links[k];
            self.link_status[k] = link.status;
            self.link_setting[k] = match link.ty {
                LinkType::CvPipe | LinkType::Pipe | LinkType::Pump => link.kc,
                // A GPV's setting always carries its head loss curve.
                LinkType::Gpv => link.kc,
                _ => {
                    // A valve fixed open or closed has no active setting.
                    if link.status != LinkStatus::Active {
                        MISSING
                    } else {
                        link.kc
                    }
                }
            };
            if init_flows || self.link_flow[k] == 0.0 {
                let pump_q0 = net.find_pump(k).map(|p| net.pumps[p].q0).unwrap_or(0.0);
                self.link_flow[k] = Self::init_link_flow(link, self.link_status[k], pump_q0);
            }
            self.old_status[k] = self.link_status[k];
        }
        // Reset pump energy usage.
        for p in 1..=net.npumps() {
            net.pumps[p].energy = Default::default();
        }
        self.emax = 0.0;
        self.relax_factor = 1.0;
        self.iterations = 0;
        self.relative_error = 0.0;
        self.max_head_error = 0.0;
        self.max_flow_change = 0.0;
        self.deficient_nodes = 0;
        self.demand_reduction = 0.0;
        self.leakage_loss = 0.0;
        self.flow_balance = FlowBalance::default();
        leakage::init_node_leakage(self);
        times.htime = 0;
        times.rtime = times.rstart;
        times.haltflag = false;
    }
}

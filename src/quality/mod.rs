//! The water quality engine: Lagrangian segment transport driven from a
//! saved hydraulic solution, with reaction kinetics, tank mixing models
//! and mass balance accounting.

pub(crate) mod massbalance;
pub(crate) mod react;
pub(crate) mod route;
pub(crate) mod segs;
pub(crate) mod tankmix;

use crate::epanet_error::{EPANETError, Result};
use crate::types::options::QualityType;
use crate::units::DIFFUS;
use crate::EPANET;

use massbalance::MassBalance;
use segs::SegPool;

/// Water quality solver state.
#[derive(Debug, Default)]
pub(crate) struct Quality {
    pub qualflag: QualityType,
    pub chem_name: String,
    pub chem_units: String,
    /// Node traced in source-trace mode.
    pub trace_node: usize,
    /// Minimum quality change below which segments coalesce.
    pub ctol: f64,
    /// Molecular diffusivity (sq ft/sec); 0 disables mass transfer limits.
    pub diffus: f64,
    /// Schmidt number, computed at open.
    pub sc: f64,
    pub bulk_order: f64,
    pub wall_order: f64,
    pub tank_order: f64,
    /// Limiting concentration for growth reactions.
    pub climit: f64,
    /// Bulk rate unit conversion factors for pipes and tanks.
    pub bucf: f64,
    pub tucf: f64,
    /// Whether the run involves any reaction at all.
    pub reactflag: bool,
    pub node_qual: Vec<f64>,
    /// Average reaction rate in each pipe (mass/L/day equivalent).
    pub pipe_rate_coeff: Vec<f64>,
    /// Current flow direction of each link (+1 or -1).
    pub flow_dir: Vec<i8>,
    pub segs: SegPool,
    // Per-node accumulators for the transport sweep.
    pub vol_in: Vec<f64>,
    pub mass_in: Vec<f64>,
    pub x: Vec<f64>,
    // Cumulative mass reacted in pipes (bulk, wall), tanks, and added
    // by sources.
    pub wbulk: f64,
    pub wwall: f64,
    pub wtank: f64,
    pub wsource: f64,
    pub mass_balance: MassBalance,
    /// Time at which the currently loaded hydraulic snapshot expires.
    pub htime: u64,
    pub open_flag: bool,
    /// Segment chains exist (built on the first hydraulic load).
    segs_ready: bool,
}

impl Quality {
    pub fn new() -> Self {
        Quality {
            qualflag: QualityType::None,
            chem_name: "Chlorine".to_string(),
            chem_units: "mg/L".to_string(),
            ctol: 0.01,
            diffus: DIFFUS,
            bulk_order: 1.0,
            wall_order: 1.0,
            tank_order: 1.0,
            ..Quality::default()
        }
    }
}

/// Sets up the water quality solver over the saved hydraulics.
pub(crate) fn open_qual(pr: &mut EPANET) {
    let nnodes = pr.network.nnodes();
    let nlinks = pr.network.nlinks();
    let ntanks = pr.network.ntanks();

    if pr.times.qstep == 0 {
        pr.times.qstep = (pr.times.hstep / 10).max(1);
    }

    let reactflag = react::set_react_flag(pr);
    let qual = &mut pr.quality;
    qual.sc = if qual.diffus > 0.0 {
        pr.hydraul.viscos / qual.diffus
    } else {
        0.0
    };
    qual.bucf = react::get_ucf(qual.bulk_order);
    qual.tucf = react::get_ucf(qual.tank_order);
    qual.node_qual = vec![0.0; nnodes + 1];
    qual.pipe_rate_coeff = vec![0.0; nlinks + 1];
    qual.flow_dir = vec![1; nlinks + 1];
    qual.vol_in = vec![0.0; nnodes + 1];
    qual.mass_in = vec![0.0; nnodes + 1];
    qual.x = vec![0.0; nnodes + 1];
    qual.segs.reset(nlinks + ntanks);
    qual.reactflag = reactflag;
    pr.quality.open_flag = true;
}

/// Resets nodal and tank quality to initial conditions and rewinds the
/// saved hydraulics.
pub(crate) fn init_qual(pr: &mut EPANET) -> Result<()> {
    for i in 1..=pr.network.nnodes() {
        pr.quality.node_qual[i] = pr.network.nodes[i].c0;
        if let Some(src) = pr.network.nodes[i].source.as_mut() {
            src.smass = 0.0;
        }
    }
    for j in 1..=pr.network.ntanks() {
        let n = pr.network.tanks[j].node;
        pr.network.tanks[j].c = pr.network.nodes[n].c0;
        pr.network.tanks[j].v = pr.network.tanks[j].v0;
    }
    if pr.quality.qualflag == QualityType::Trace && pr.quality.trace_node > 0 {
        pr.quality.node_qual[pr.quality.trace_node] = 100.0;
    }

    let qual = &mut pr.quality;
    qual.wbulk = 0.0;
    qual.wwall = 0.0;
    qual.wtank = 0.0;
    qual.wsource = 0.0;
    qual.htime = 0;
    qual.segs_ready = false;
    let nchains = pr.network.nlinks() + pr.network.ntanks();
    qual.segs.reset(nchains);
    qual.mass_balance.start(0.0);

    pr.times.qtime = 0;
    pr.hydfile.open_reader(&pr.network)?;
    Ok(())
}

/// Retrieves hydraulic and quality results at the current quality time,
/// loading the next hydraulic snapshot when the previous one expires.
pub(crate) fn run_qual(pr: &mut EPANET) -> Result<u64> {
    let t = pr.times.qtime;
    if t == pr.quality.htime {
        gethyd(pr)?;
    }
    Ok(t)
}

/// Advances the quality solution through the remainder of the current
/// hydraulic interval. Returns the simulation time remaining.
pub(crate) fn next_qual(pr: &mut EPANET) -> Result<u64> {
    let hydstep = pr.quality.htime.saturating_sub(pr.times.qtime);
    if pr.quality.qualflag != QualityType::None && hydstep > 0 {
        transport(pr, hydstep);
    }
    pr.times.qtime += hydstep;
    let tleft = pr.times.dur.saturating_sub(pr.times.qtime);
    if tleft == 0 {
        let stored = stored_mass(pr);
        pr.quality.mass_balance.close(stored);
    }
    Ok(tleft)
}

/// Advances the quality solution one quality time step. Returns the
/// simulation time remaining.
pub(crate) fn step_qual(pr: &mut EPANET) -> Result<u64> {
    let mut tstep = pr.times.qstep;
    while tstep > 0 {
        let mut dt = tstep;
        let hstep = pr.quality.htime.saturating_sub(pr.times.qtime);
        if hstep < dt {
            dt = hstep;
            tstep -= dt;
            if pr.quality.qualflag != QualityType::None && dt > 0 {
                transport(pr, dt);
            }
            pr.times.qtime += dt;
            run_qual(pr)?;
        } else {
            tstep = 0;
            if pr.quality.qualflag != QualityType::None {
                transport(pr, dt);
            }
            pr.times.qtime += dt;
        }
        if pr.times.qtime >= pr.times.dur {
            break;
        }
    }
    let tleft = pr.times.dur.saturating_sub(pr.times.qtime);
    if tleft == 0 {
        let stored = stored_mass(pr);
        pr.quality.mass_balance.close(stored);
    }
    Ok(tleft)
}

/// Frees the water quality solver's working storage. Nodal quality
/// results persist for reading after the close.
pub(crate) fn close_qual(pr: &mut EPANET) {
    let qual = &mut pr.quality;
    qual.flow_dir = Vec::new();
    qual.vol_in = Vec::new();
    qual.mass_in = Vec::new();
    qual.x = Vec::new();
    qual.segs.reset(0);
    qual.open_flag = false;
}

/// Loads the next hydraulic snapshot from the scratch file, building the
/// segment chains on the first load and reorienting them on flow
/// reversals afterwards.
fn gethyd(pr: &mut EPANET) -> Result<()> {
    let Some(snap) = pr.hydfile.read_snapshot(&pr.network)? else {
        return Err(EPANETError::CannotReadHydFile);
    };
    pr.hydraul.node_demand = snap.node_demand;
    pr.hydraul.node_head = snap.node_head;
    pr.hydraul.link_flow = snap.link_flow;
    pr.hydraul.link_status = snap.link_status;
    pr.hydraul.link_setting = snap.link_setting;

    if !pr.quality.segs_ready {
        route::init_segs(pr);
        let initial = stored_mass(pr);
        pr.quality.mass_balance.start(initial);
        pr.quality.segs_ready = true;
        if pr.quality.qualflag != QualityType::None {
            react::rate_coeffs(pr);
        }
    } else {
        route::reorient_segs(pr);
        if pr.quality.reactflag {
            react::rate_coeffs(pr);
        }
    }
    pr.quality.htime = snap.time + snap.hstep;
    Ok(())
}

/// Transports the constituent over `tstep` seconds in sub-steps of the
/// quality time step.
fn transport(pr: &mut EPANET, tstep: u64) {
    let mut qtime = 0;
    while qtime < tstep {
        let dt = pr.times.qstep.min(tstep - qtime);
        qtime += dt;
        if pr.quality.reactflag {
            react::react_pipes(pr, dt);
            react::react_tanks(pr, dt);
        }
        route::accumulate(pr, dt);
        route::update_nodes(pr, dt);
        route::source_input(pr, dt);
        route::release(pr, dt);
        tankmix::update_tanks(pr, dt);
        route::update_source_nodes(pr);
    }
}

/// Total constituent mass currently stored in pipes and tanks.
pub(crate) fn stored_mass(pr: &EPANET) -> f64 {
    let mut total = 0.0;
    for k in 1..=pr.network.nlinks() + pr.network.ntanks() {
        total += pr.quality.segs.chain_mass(k);
    }
    total
}

/// Volume-averaged quality within link `k`.
pub(crate) fn avg_qual(pr: &EPANET, k: usize) -> f64 {
    if pr.quality.qualflag == QualityType::None || !pr.quality.open_flag {
        return 0.0;
    }
    let mut vsum = 0.0;
    let mut msum = 0.0;
    let mut i = pr.quality.segs.first[k];
    while i != 0 {
        let seg = pr.quality.segs.segs[i];
        vsum += seg.v;
        msum += seg.c * seg.v;
        i = seg.prev;
    }
    if vsum > 0.0 {
        msum / vsum
    } else {
        let link = &pr.network.links[k];
        (pr.quality.node_qual[link.n1] + pr.quality.node_qual[link.n2]) / 2.0
    }
}

//! Components of the network's flow balance, accumulated over a run.

use crate::hydraul::{Hydraul, Times};
use crate::network::Network;
use crate::types::options::DemandModel;

/// Components of the network's flow balance averaged over a completed
/// run (all flows, with `ratio` comparing total outflow to inflow).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowBalance {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub consumer_demand: f64,
    pub emitter_demand: f64,
    pub leakage_demand: f64,
    pub deficit_demand: f64,
    pub storage_demand: f64,
    pub ratio: f64,
}

/// Updates the running flow balance with the current solution held for
/// `hstep` seconds.
pub(crate) fn update_flow_balance(net: &Network, hyd: &mut Hydraul, times: &Times, hstep: u64) {
    let dt = if times.dur == 0 {
        1.0
    } else if times.htime < times.dur {
        hstep as f64
    } else {
        return;
    };

    let mut fb = FlowBalance::default();
    hyd.leakage_loss = 0.0;

    for i in 1..=net.njuncs {
        let v = hyd.demand_flow[i];
        if v < 0.0 {
            fb.total_inflow += -v;
        } else {
            fb.consumer_demand += v;
            fb.total_outflow += v;
        }

        let v = hyd.emitter_flow[i];
        fb.emitter_demand += v;
        fb.total_outflow += v;
        let v = hyd.leakage_flow[i];
        fb.leakage_demand += v;
        fb.total_outflow += v;

        if hyd.demand_model == DemandModel::Pda && hyd.full_demand[i] > 0.0 {
            let deficit = hyd.full_demand[i] - hyd.demand_flow[i];
            if deficit > 0.0 {
                fb.deficit_demand += deficit;
            }
        }
    }

    for j in 1..=net.ntanks() {
        let i = net.tanks[j].node;
        let v = hyd.node_demand[i];
        if net.tanks[j].is_reservoir() {
            if v >= 0.0 {
                fb.total_outflow += v;
            } else {
                fb.total_inflow += -v;
            }
        } else {
            fb.storage_demand += v;
        }
    }

    // Percent of supply lost to leakage this period.
    let mut v = fb.total_inflow;
    if fb.storage_demand < 0.0 {
        v += -fb.storage_demand;
    }
    if v > 0.0 {
        hyd.leakage_loss = fb.leakage_demand / v * 100.0;
    }

    let total = &mut hyd.flow_balance;
    total.total_inflow += fb.total_inflow * dt;
    total.total_outflow += fb.total_outflow * dt;
    total.consumer_demand += fb.consumer_demand * dt;
    total.emitter_demand += fb.emitter_demand * dt;
    total.leakage_demand += fb.leakage_demand * dt;
    total.deficit_demand += fb.deficit_demand * dt;
    total.storage_demand += fb.storage_demand * dt;
}

/// Converts the accumulated totals to average flows and computes the
/// final inflow/outflow ratio.
pub(crate) fn end_flow_balance(hyd: &mut Hydraul, times: &Times) {
    let seconds = if times.htime > 0 { times.htime as f64 } else { 1.0 };
    let fb = &mut hyd.flow_balance;
    fb.total_inflow /= seconds;
    fb.total_outflow /= seconds;
    fb.consumer_demand /= seconds;
    fb.emitter_demand /= seconds;
    fb.leakage_demand /= seconds;
    fb.deficit_demand /= seconds;
    fb.storage_demand /= seconds;

    let mut qin = fb.total_inflow;
    let mut qout = fb.total_outflow;
    let qstor = fb.storage_demand;
    if qstor > 0.0 {
        qout += qstor;
    } else {
        qin -= qstor;
    }
    fb.ratio = if qin == qout {
        1.0
    } else if qin > 0.0 {
        qout / qin
    } else {
        0.0
    };
}

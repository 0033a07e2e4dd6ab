//! Lagrangian transport of quality segments through the network: the
//! accumulate / update-nodes / source-input / release sweep executed once
//! per water quality sub-step.

use crate::network::node::Source;
use crate::types::node::SourceType;
use crate::types::options::QualityType;
use crate::units::TINY;
use crate::EPANET;

/// Upstream node of link `k` under the current flow direction.
pub(crate) fn up_node(pr: &EPANET, k: usize) -> usize {
    if pr.quality.flow_dir[k] >= 0 {
        pr.network.links[k].n1
    } else {
        pr.network.links[k].n2
    }
}

/// Downstream node of link `k` under the current flow direction.
pub(crate) fn down_node(pr: &EPANET, k: usize) -> usize {
    if pr.quality.flow_dir[k] >= 0 {
        pr.network.links[k].n2
    } else {
        pr.network.links[k].n1
    }
}

/// Gives every link one segment of full volume at the quality of its
/// downstream node, and seeds the tank chains their mixing models need.
pub(crate) fn init_segs(pr: &mut EPANET) {
    for k in 1..=pr.network.nlinks() {
        pr.quality.flow_dir[k] = if pr.hydraul.link_flow[k] < 0.0 { -1 } else { 1 };
        let j = down_node(pr, k);
        let c = if let Some(t) = pr.network.find_tank(j) {
            pr.network.tanks[t].c
        } else {
            pr.quality.node_qual[j]
        };
        let v = pr.network.links[k].volume();
        pr.quality.segs.add_seg(k, v, c);
    }

    for j in 1..=pr.network.ntanks() {
        let tank = &pr.network.tanks[j];
        if tank.is_reservoir() {
            continue;
        }
        let k = pr.network.nlinks() + j;
        let c = tank.c;
        match tank.mix_model {
            crate::types::node::MixingModel::Mix2 => {
                let v1 = tank.v.min(tank.v1max());
                let stag = (tank.v - tank.v1max()).max(0.0);
                pr.quality.segs.add_seg(k, stag, c);
                pr.quality.segs.add_seg(k, v1, c);
            }
            _ => {
                let v = tank.v;
                pr.quality.segs.add_seg(k, v, c);
            }
        }
    }
}

/// Reverses the segment chains of links whose flow changed direction
/// since the previous hydraulic solution.
pub(crate) fn reorient_segs(pr: &mut EPANET) {
    for k in 1..=pr.network.nlinks() {
        let dir: i8 = if pr.hydraul.link_flow[k] < 0.0 { -1 } else { 1 };
        if dir != pr.quality.flow_dir[k] {
            pr.quality.segs.reverse(k);
            pr.quality.flow_dir[k] = dir;
        }
    }
}

/// Moves the flow volume of each link out of its leading segments into
/// the downstream node's accumulators.
pub(crate) fn accumulate(pr: &mut EPANET, dt: u64) {
    let nnodes = pr.network.nnodes();
    pr.quality.vol_in[..=nnodes].iter_mut().for_each(|v| *v = 0.0);
    pr.quality.mass_in[..=nnodes].iter_mut().for_each(|v| *v = 0.0);
    pr.quality.x[..=nnodes].iter_mut().for_each(|v| *v = 0.0);

    // Average the quality of the segments incident on each node, used
    // when no flow transports anything through the node.
    for k in 1..=pr.network.nlinks() {
        let j = down_node(pr, k);
        let first = pr.quality.segs.first[k];
        if first != 0 {
            pr.quality.mass_in[j] += pr.quality.segs.segs[first].c;
            pr.quality.vol_in[j] += 1.0;
        }
        let j = up_node(pr, k);
        let last = pr.quality.segs.last[k];
        if last != 0 {
            pr.quality.mass_in[j] += pr.quality.segs.segs[last].c;
            pr.quality.vol_in[j] += 1.0;
        }
    }
    for n in 1..=nnodes {
        if pr.quality.vol_in[n] > 0.0 {
            pr.quality.x[n] = pr.quality.mass_in[n] / pr.quality.vol_in[n];
        }
    }

    // Transport each link's flow volume into its downstream node.
    pr.quality.vol_in[..=nnodes].iter_mut().for_each(|v| *v = 0.0);
    pr.quality.mass_in[..=nnodes].iter_mut().for_each(|v| *v = 0.0);
    for k in 1..=pr.network.nlinks() {
        let i = down_node(pr, k);
        let q = pr.hydraul.link_flow[k].abs();
        let mut v = q * dt as f64;
        let mut wlink = 0.0;

        while v > 0.0 {
            let seg_i = pr.quality.segs.first[k];
            if seg_i == 0 {
                break;
            }
            let seg = pr.quality.segs.segs[seg_i];
            // The trailing segment surrenders whatever volume remains.
            let mut vseg = seg.v.min(v);
            if seg_i == pr.quality.segs.last[k] {
                vseg = v;
            }
            pr.quality.mass_in[i] += vseg * seg.c;
            pr.quality.vol_in[i] += vseg;
            wlink += vseg * seg.c;
            v -= vseg;
            if v >= 0.0 && vseg >= seg.v {
                if seg.prev != 0 {
                    pr.quality.segs.pop_first(k);
                } else {
                    pr.quality.segs.segs[seg_i].v = 0.0;
                }
            } else {
                pr.quality.segs.segs[seg_i].v -= vseg;
            }
        }

        // Mass flowing into a fixed grade boundary leaves the system.
        if pr.network.find_tank(i).map(|t| pr.network.tanks[t].is_reservoir()) == Some(true) {
            pr.quality.mass_balance.outflow += wlink;
        }
    }
}

/// Volume-averages the mass accumulated at each junction into a new
/// nodal quality, and charges withdrawn demand against the mass balance.
pub(crate) fn update_nodes(pr: &mut EPANET, dt: u64) {
    for i in 1..=pr.network.njuncs {
        let demand = pr.hydraul.node_demand[i];
        if demand < 0.0 {
            // External inflow dilutes the node.
            pr.quality.vol_in[i] -= demand * dt as f64;
        }
        if pr.quality.vol_in[i] > 0.0 {
            pr.quality.node_qual[i] = pr.quality.mass_in[i] / pr.quality.vol_in[i];
        } else {
            pr.quality.node_qual[i] = pr.quality.x[i];
        }
        // Mass withdrawn by consumer demand leaves the system.
        if demand > 0.0 {
            pr.quality.mass_balance.outflow += pr.quality.node_qual[i] * demand * dt as f64;
        }
    }
    if pr.quality.qualflag == QualityType::Trace {
        let n = pr.quality.trace_node;
        if n > 0 {
            pr.quality.node_qual[n] = 100.0;
        }
    }
}

/// Strength of a source at the current quality time, with its pattern
/// applied. Mass sources convert from mass/minute to mass/second.
fn source_qual(pr: &EPANET, source: &Source) -> f64 {
    let mut c = source.c0;
    if source.ty == SourceType::Mass {
        c /= 60.0;
    }
    if source.pat > 0 {
        let p = (pr.times.qtime + pr.times.pstart) / pr.times.pstep;
        c *= pr.network.patterns[source.pat].factor(p);
    }
    c
}

/// Evaluates the quality contribution each source adds to the flow
/// leaving its node.
pub(crate) fn source_input(pr: &mut EPANET, dt: u64) {
    let qcutoff = 10.0 * TINY;
    let nnodes = pr.network.nnodes();
    pr.quality.x[..=nnodes].iter_mut().for_each(|v| *v = 0.0);
    if pr.quality.qualflag != QualityType::Chem {
        return;
    }

    for n in 1..=nnodes {
        let Some(source) = pr.network.nodes[n].source.clone() else {
            continue;
        };
        if source.c0 == 0.0 {
            continue;
        }

        // Total flow volume leaving the node.
        let volout = if n <= pr.network.njuncs {
            pr.quality.vol_in[n]
        } else {
            pr.quality.vol_in[n] - pr.hydraul.node_demand[n] * dt as f64
        };
        let qout = volout / dt as f64;
        if qout <= qcutoff {
            continue;
        }

        let s = source_qual(pr, &source);
        let massadded = match source.ty {
            SourceType::Concen => {
                // Only contributes when external inflow enters the node;
                // for a fixed grade node that is its supply to the system.
                let d = pr.hydraul.node_demand[n];
                if d < 0.0 {
                    if n > pr.network.njuncs {
                        pr.quality.node_qual[n] = 0.0;
                    }
                    -s * d * dt as f64
                } else {
                    0.0
                }
            }
            SourceType::Mass => s * dt as f64,
            SourceType::Setpoint => {
                let c = pr.quality.node_qual[n];
                if s > c {
                    (s - c) * volout
                } else {
                    0.0
                }
            }
            SourceType::FlowPaced => s * volout,
        };

        pr.quality.x[n] = massadded / volout;
        if let Some(src) = pr.network.nodes[n].source.as_mut() {
            src.smass += massadded;
        }
        if pr.times.htime >= pr.times.rstart {
            pr.quality.wsource += massadded;
        }
        pr.quality.mass_balance.inflow += massadded;
    }
}

/// Releases each node's outflow into the upstream ends of its outgoing
/// links, merging with the trailing segment when the quality matches.
pub(crate) fn release(pr: &mut EPANET, dt: u64) {
    for k in 1..=pr.network.nlinks() {
        if pr.hydraul.link_flow[k] == 0.0 {
            continue;
        }
        let n = up_node(pr, k);
        let q = pr.hydraul.link_flow[k].abs();
        let v = q * dt as f64;

        // Quality released includes any source contribution at the node.
        let c = pr.quality.node_qual[n] + pr.quality.x[n];

        // Water drawn from a fixed grade boundary enters the system; the
        // source contribution is already credited by source_input.
        if pr.network.find_tank(n).map(|t| pr.network.tanks[t].is_reservoir()) == Some(true) {
            pr.quality.mass_balance.inflow += pr.quality.node_qual[n] * v;
        }

        let last_i = pr.quality.segs.last[k];
        if last_i != 0 {
            let last = &mut pr.quality.segs.segs[last_i];
            if (last.c - c).abs() < pr.quality.ctol {
                last.c = (last.c * last.v + c * v) / (last.v + v);
                last.v += v;
            } else {
                pr.quality.segs.add_seg(k, v, c);
            }
        } else {
            pr.quality.segs.add_seg(k, v, c);
        }
    }
}

/// Folds each source's contribution into its node's reported quality;
/// tank nodes propagate the result to the tank itself.
pub(crate) fn update_source_nodes(pr: &mut EPANET) {
    if pr.quality.qualflag != QualityType::Chem {
        return;
    }
    for n in 1..=pr.network.nnodes() {
        if pr.network.nodes[n].source.is_none() {
            continue;
        }
        pr.quality.node_qual[n] += pr.quality.x[n];
        if let Some(t) = pr.network.find_tank(n) {
            pr.network.tanks[t].c = pr.quality.node_qual[n];
        }
    }
}

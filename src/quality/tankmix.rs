//! The four tank mixing models: complete mix, 2-compartment, FIFO plug
//! flow and LIFO plug flow.

use crate::types::node::MixingModel;
use crate::types::options::QualityType;
use crate::EPANET;

/// Mixes each tank's inflow with its contents for the current sub-step.
/// Reservoir nodes keep their fixed boundary quality.
pub(crate) fn update_tanks(pr: &mut EPANET, dt: u64) {
    for i in 1..=pr.network.ntanks() {
        let n = pr.network.tanks[i].node;
        if pr.network.tanks[i].is_reservoir() {
            pr.quality.node_qual[n] = pr.network.nodes[n].c0;
            if pr.quality.qualflag == QualityType::Trace && n == pr.quality.trace_node {
                pr.quality.node_qual[n] = 100.0;
            }
            continue;
        }
        let vin = pr.quality.vol_in[n];
        let win = pr.quality.mass_in[n];
        let vnet = pr.hydraul.node_demand[n] * dt as f64;
        match pr.network.tanks[i].mix_model {
            MixingModel::Mix1 => tankmix1(pr, i, vin, win, vnet),
            MixingModel::Mix2 => tankmix2(pr, i, vin, win, vnet),
            MixingModel::Fifo => tankmix3(pr, i, vin, win, vnet),
            MixingModel::Lifo => tankmix4(pr, i, vin, win, vnet),
        }
        pr.quality.node_qual[n] = pr.network.tanks[i].c;
    }
}

/// Complete mix model: one segment holds the whole tank.
fn tankmix1(pr: &mut EPANET, i: usize, vin: f64, win: f64, vnet: f64) {
    let k = pr.network.nlinks() + i;
    let seg_i = pr.quality.segs.first[k];
    if seg_i == 0 {
        return;
    }
    let seg = &mut pr.quality.segs.segs[seg_i];
    let vnew = seg.v + vin;
    if vnew > 0.0 {
        seg.c = (seg.c * seg.v + win) / vnew;
    }
    seg.v = (seg.v + vnet).max(0.0);
    pr.network.tanks[i].c = seg.c;
}

/// 2-compartment model: inflow mixes in a fixed mixing zone; overflow
/// transfers to the stagnant zone when filling and returns when draining.
fn tankmix2(pr: &mut EPANET, i: usize, vin: f64, win: f64, vnet: f64) {
    let k = pr.network.nlinks() + i;
    let mix_i = pr.quality.segs.last[k];
    let stag_i = pr.quality.segs.first[k];
    if mix_i == 0 || stag_i == 0 {
        return;
    }
    let vmz = pr.network.tanks[i].v1max();
    let mut mixzone = pr.quality.segs.segs[mix_i];
    let mut stagzone = pr.quality.segs.segs[stag_i];

    let mut vt = 0.0;
    if vnet > 0.0 {
        // Filling.
        vt = (mixzone.v + vnet - vmz).max(0.0);
        if vin > 0.0 {
            mixzone.c = (mixzone.c * mixzone.v + win) / (mixzone.v + vin);
        }
        if vt > 0.0 {
            stagzone.c = (stagzone.c * stagzone.v + mixzone.c * vt) / (stagzone.v + vt);
        }
    } else if vnet < 0.0 {
        // Emptying.
        if stagzone.v > 0.0 {
            vt = stagzone.v.min(-vnet);
        }
        if vin + vt > 0.0 {
            mixzone.c =
                (mixzone.c * mixzone.v + win + stagzone.c * vt) / (mixzone.v + vin + vt);
        }
    }

    if vt > 0.0 {
        mixzone.v = vmz;
        if vnet > 0.0 {
            stagzone.v += vt;
        } else {
            stagzone.v = (stagzone.v - vt).max(0.0);
        }
    } else {
        mixzone.v = (mixzone.v + vnet).clamp(0.0, vmz);
        stagzone.v = 0.0;
    }

    pr.quality.segs.segs[mix_i] = mixzone;
    pr.quality.segs.segs[stag_i] = stagzone;

    // Outflow leaves from the mixing zone, so it represents tank quality.
    pr.network.tanks[i].c = mixzone.c;
}

/// FIFO model: inflow queues behind existing segments, withdrawal takes
/// from the oldest.
fn tankmix3(pr: &mut EPANET, i: usize, vin: f64, win: f64, vnet: f64) {
    let k = pr.network.nlinks() + i;
    if pr.quality.segs.first[k] == 0 || pr.quality.segs.last[k] == 0 {
        return;
    }
    let ctol = pr.quality.ctol;

    // Add new last segment for flow entering the tank.
    if vin > 0.0 {
        let cin = win / vin;
        let last_i = pr.quality.segs.last[k];
        let last = &mut pr.quality.segs.segs[last_i];
        if (last.c - cin).abs() < ctol {
            last.v += vin;
        } else {
            pr.quality.segs.add_seg(k, vin, cin);
        }
    }

    // Withdraw flow from the first (oldest) segment.
    let mut vsum = 0.0;
    let mut wsum = 0.0;
    let mut vout = vin - vnet;
    while vout > 0.0 {
        let seg_i = pr.quality.segs.first[k];
        if seg_i == 0 {
            break;
        }
        let seg = pr.quality.segs.segs[seg_i];
        let mut vseg = seg.v.min(vout);
        if seg_i == pr.quality.segs.last[k] {
            vseg = vout;
        }
        vsum += vseg;
        wsum += seg.c * vseg;
        vout -= vseg;
        if vout >= 0.0 && vseg >= seg.v {
            // Segment used up; the lone remaining segment stays.
            if seg.prev != 0 {
                pr.quality.segs.pop_first(k);
            } else {
                pr.quality.segs.segs[seg_i].v = 0.0;
            }
        } else {
            pr.quality.segs.segs[seg_i].v -= vseg;
        }
    }

    pr.network.tanks[i].c = if vsum > 0.0 {
        wsum / vsum
    } else {
        let first_i = pr.quality.segs.first[k];
        if first_i == 0 {
            0.0
        } else {
            pr.quality.segs.segs[first_i].c
        }
    };
}

/// LIFO model: water stacks up; withdrawal takes from the newest end by
/// temporarily reversing the chain.
fn tankmix4(pr: &mut EPANET, i: usize, vin: f64, win: f64, vnet: f64) {
    let k = pr.network.nlinks() + i;
    if pr.quality.segs.first[k] == 0 || pr.quality.segs.last[k] == 0 {
        return;
    }
    let ctol = pr.quality.ctol;
    let cin = if vin > 0.0 { win / vin } else { 0.0 };

    let last_i = pr.quality.segs.last[k];
    pr.network.tanks[i].c = pr.quality.segs.segs[last_i].c;

    if vnet > 0.0 {
        // Filling: extend or add the newest segment.
        if (pr.quality.segs.segs[last_i].c - cin).abs() < ctol {
            pr.quality.segs.segs[last_i].v += vnet;
        } else {
            pr.quality.segs.add_seg(k, vnet, cin);
        }
        let last_i = pr.quality.segs.last[k];
        pr.network.tanks[i].c = pr.quality.segs.segs[last_i].c;
    } else if vnet < 0.0 {
        // Emptying: remove newest segments until the net volume is gone.
        let mut vsum = 0.0;
        let mut wsum = 0.0;
        let mut vnet = -vnet;

        pr.quality.segs.reverse(k);
        while vnet > 0.0 {
            let seg_i = pr.quality.segs.first[k];
            if seg_i == 0 {
                break;
            }
            let seg = pr.quality.segs.segs[seg_i];
            let mut vseg = seg.v.min(vnet);
            if seg_i == pr.quality.segs.last[k] {
                vseg = vnet;
            }
            vsum += vseg;
            wsum += seg.c * vseg;
            vnet -= vseg;
            if vnet >= 0.0 && vseg >= seg.v {
                if seg.prev != 0 {
                    pr.quality.segs.pop_first(k);
                } else {
                    pr.quality.segs.segs[seg_i].v = 0.0;
                }
            } else {
                pr.quality.segs.segs[seg_i].v -= vseg;
            }
        }
        pr.quality.segs.reverse(k);

        // Tank quality is the blend of released water and any inflow.
        pr.network.tanks[i].c = (wsum + win) / (vsum + vin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::{approx_eq, ph_close};
    use crate::types::analysis::InitHydOption;
    use crate::types::link::LinkType;
    use crate::types::node::{NodeProperty, NodeType};
    use crate::types::options::{QualityType, TimeParameter};
    use crate::EPANET;

    /// A 500 cu ft tank at quality 1.0 with its segment chains built,
    /// ready for direct mixing-model calls.
    fn wq_ready(model: MixingModel) -> EPANET {
        let mut ph = ph_close();
        let j1 = ph.add_node("J1", NodeType::Junction).unwrap();
        let t1 = ph.add_node("T1", NodeType::Tank).unwrap();
        ph.set_junction_data(j1, 0.0, -10.0, "").unwrap();
        let diam = (4.0 * 50.0 / std::f64::consts::PI).sqrt();
        ph.set_tank_data(t1, 0.0, 10.0, 0.0, 1000.0, diam, 0.0, "").unwrap();
        ph.set_node_value(t1, NodeProperty::MixModel, model as u32 as f64)
            .unwrap();
        ph.set_node_value(t1, NodeProperty::InitQual, 1.0).unwrap();
        let p1 = ph.add_link("P1", LinkType::Pipe, "J1", "T1").unwrap();
        ph.set_pipe_data(p1, 100.0, 1.0, 130.0, 0.0).unwrap();
        ph.set_qual_type(QualityType::Chem, "Chlorine", "mg/L", "").unwrap();
        ph.set_time_param(TimeParameter::Duration, 100).unwrap();
        ph.set_time_param(TimeParameter::HydStep, 100).unwrap();
        ph.solve_h().unwrap();
        ph.open_q().unwrap();
        ph.init_q(InitHydOption::NoSave).unwrap();
        ph.run_q().unwrap();
        ph
    }

    #[test]
    fn complete_mix_dilutes_instantly() {
        let mut ph = wq_ready(MixingModel::Mix1);
        // 100 cu ft of clean water into 500 cu ft at 1.0, no outflow.
        tankmix1(&mut ph, 1, 100.0, 0.0, 100.0);
        assert!(approx_eq(ph.network.tanks[1].c, 500.0 / 600.0, 1e-9));
        let k = ph.network.nlinks() + 1;
        assert!(approx_eq(ph.quality.segs.chain_volume(k), 600.0, 1e-9));
    }

    #[test]
    fn fifo_withdraws_the_oldest_water() {
        let mut ph = wq_ready(MixingModel::Fifo);
        // Inflow at 0.5 while the same volume leaves: outflow carries the
        // original 1.0 water, and the new water queues behind it.
        tankmix3(&mut ph, 1, 100.0, 50.0, 0.0);
        assert!(approx_eq(ph.network.tanks[1].c, 1.0, 1e-9));
        let k = ph.network.nlinks() + 1;
        let first = ph.quality.segs.first[k];
        let last = ph.quality.segs.last[k];
        assert!(approx_eq(ph.quality.segs.segs[first].c, 1.0, 1e-9));
        assert!(approx_eq(ph.quality.segs.segs[last].c, 0.5, 1e-9));
    }

    #[test]
    fn lifo_withdraws_the_newest_water() {
        let mut ph = wq_ready(MixingModel::Lifo);
        // A net 100 cu ft drawdown with 100 cu ft of inflow at 0.5: the
        // release blends the newest stored water with the inflow.
        tankmix4(&mut ph, 1, 100.0, 50.0, -100.0);
        assert!(approx_eq(ph.network.tanks[1].c, 150.0 / 200.0, 1e-9));
    }

    #[test]
    fn two_compartment_overflow_reaches_the_stagnant_zone() {
        let mut ph = wq_ready(MixingModel::Mix2);
        let t1 = ph.get_node_index("T1").unwrap();
        ph.set_node_value(t1, NodeProperty::MixFraction, 0.01).unwrap();
        // With a small mixing zone, filling pushes water onward into the
        // stagnant compartment.
        let vmz = ph.network.tanks[1].v1max();
        tankmix2(&mut ph, 1, 100.0, 0.0, 100.0);
        let k = ph.network.nlinks() + 1;
        let mix = ph.quality.segs.last[k];
        let stag = ph.quality.segs.first[k];
        assert!(approx_eq(ph.quality.segs.segs[mix].v, vmz, 1e-9));
        assert!(ph.quality.segs.segs[stag].v > 0.0);
    }
}

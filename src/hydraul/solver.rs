//! The damped Newton iteration over the Global Gradient Algorithm system.
//!
//! Each trial assembles the link coefficients and the sparse system, solves
//! for junction heads, applies the GGA flow update, then re-examines the
//! discrete link statuses. Convergence requires a small relative flow
//! change, the optional head-error and flow-change limits, and stable
//! statuses; pressure-driven demand and leakage each carry their own
//! convergence test.

use crate::epanet_error::{EPANETError, Result};
use crate::hydraul::{coeffs, leakage, status, Hydraul};
use crate::network::Network;
use crate::types::control::ControlType;
use crate::types::link::{LinkStatus, LinkType, PumpType};
use crate::types::options::{DemandModel, StatusReport};
use crate::units::MISSING;

use tracing::debug;

/// Largest head loss error and flow change of the current solution.
#[derive(Debug, Default, Clone, Copy)]
struct HydBalance {
    max_head_error: f64,
    max_flow_change: f64,
}

/// Solves the network hydraulic equations at the current point in time.
/// Iteration count and relative error are stored on the solver state.
pub(crate) fn hyd_solve(net: &mut Network, hyd: &mut Hydraul) -> Result<()> {
    let mut next_check = hyd.checkfreq;
    hyd.relax_factor = 1.0;
    let mut relerr = 0.0;
    let mut balance = HydBalance::default();
    let mut ill_conditioned_row = None;

    let max_trials = if hyd.extra_iter > 0 {
        hyd.maxiter + hyd.extra_iter as usize
    } else {
        hyd.maxiter
    };

    let mut iter = 1;
    let mut converged = false;
    while iter <= max_trials {
        coeffs::headloss_coeffs(net, hyd);
        coeffs::matrix_coeffs(net, hyd);

        match hyd.sm.solve() {
            Err(row) => {
                // If a control valve caused the ill-conditioning, fix its
                // status and keep iterating; otherwise give up.
                let node = hyd.sm.order[row];
                if bad_valve(net, hyd, node) {
                    continue;
                }
                ill_conditioned_row = Some(row);
                break;
            }
            Ok(()) => {}
        }

        // Update heads from the solved (permuted) system.
        for i in 1..=net.njuncs {
            hyd.node_head[i] = hyd.sm.f[hyd.sm.row[i]];
        }
        relerr = new_flows(net, hyd, &mut balance);

        // Apply solution damping and check valve statuses.
        hyd.relax_factor = 1.0;
        let mut valve_change = false;
        if hyd.damplimit > 0.0 {
            if relerr <= hyd.damplimit {
                hyd.relax_factor = 0.6;
                valve_change = status::valve_status(net, hyd);
            }
        } else {
            valve_change = status::valve_status(net, hyd);
        }
        // Extra trials granted by the unbalanced option run damped.
        if iter > hyd.maxiter {
            hyd.relax_factor = 0.6;
        }

        if has_converged(net, hyd, relerr, &mut balance) {
            converged = true;
            // Into extra iterations, accept the current solution as is.
            if iter > hyd.maxiter {
                break;
            }
            // Converged with stable statuses ends the outer loop.
            let mut stat_change = valve_change;
            if status::link_status(net, hyd) {
                stat_change = true;
            }
            if pressure_switch(net, hyd) {
                stat_change = true;
            }
            if !stat_change {
                break;
            }
            converged = false;
            next_check = iter + hyd.checkfreq;
        } else if iter <= hyd.maxcheck && iter == next_check {
            // Periodic status check on pumps, CVs and tank connections.
            status::link_status(net, hyd);
            next_check += hyd.checkfreq;
        }
        iter += 1;
    }

    hyd.iterations = iter.min(max_trials);
    hyd.relative_error = relerr;
    hyd.max_head_error = balance.max_head_error;
    hyd.max_flow_change = balance.max_flow_change;

    if let Some(row) = ill_conditioned_row {
        let node = hyd.sm.order[row];
        return Err(EPANETError::IllConditioned {
            id: net.nodes[node].id.clone(),
        });
    }
    if !converged {
        hyd.relative_error = relerr;
        // The caller decides between a warning and a hard stop based on
        // the unbalanced option.
        hyd.iterations = max_trials;
    }
    Ok(())
}

/// Whether the last solve satisfied every convergence criterion.
pub(crate) fn solution_converged(hyd: &Hydraul) -> bool {
    hyd.relative_error <= hyd.hacc
}

/// Applies the GGA flow update to links, emitters, pressure-dependent
/// demands and leakage; returns the relative flow change.
fn new_flows(net: &Network, hyd: &mut Hydraul, balance: &mut HydBalance) -> f64 {
    let mut qsum = 0.0;
    let mut dqsum = 0.0;
    balance.max_flow_change = 0.0;

    // Net inflows at fixed grade nodes accumulate from scratch.
    for n in net.njuncs + 1..=net.nnodes() {
        hyd.node_demand[n] = 0.0;
    }

    for k in 1..=net.nlinks() {
        let link = &net.links[k];
        let (n1, n2) = (link.n1, link.n2);
        let dh = hyd.node_head[n1] - hyd.node_head[n2];
        let mut dq = hyd.y[k] - hyd.p[k] * dh;

        dq *= hyd.relax_factor;

        // Keep constant-horsepower pumps from reversing.
        if link.ty == LinkType::Pump {
            let p = net.find_pump(k).expect("pump record exists for pump link");
            if net.pumps[p].ptype == PumpType::ConstHp && dq > hyd.link_flow[k] {
                dq = hyd.link_flow[k] / 2.0;
            }
        }
        hyd.link_flow[k] -= dq;

        qsum += hyd.link_flow[k].abs();
        dqsum += dq.abs();
        if dq.abs() > balance.max_flow_change {
            balance.max_flow_change = dq.abs();
        }

        if !hyd.link_status[k].is_closed() {
            if n1 > net.njuncs {
                hyd.node_demand[n1] -= hyd.link_flow[k];
            }
            if n2 > net.njuncs {
                hyd.node_demand[n2] += hyd.link_flow[k];
            }
        }
    }

    // Emitter flows.
    for i in 1..=net.njuncs {
        if net.nodes[i].ke == 0.0 {
            continue;
        }
        let dq = coeffs::emit_flow_change(net, hyd, i);
        hyd.emitter_flow[i] -= dq;
        qsum += hyd.emitter_flow[i].abs();
        dqsum += dq.abs();
    }

    // Pressure dependent demand flows.
    if hyd.demand_model == DemandModel::Pda {
        let (dp, n) = coeffs::demand_params(hyd);
        for i in 1..=net.njuncs {
            if hyd.node_demand[i] <= 0.0 {
                continue;
            }
            let dq = coeffs::demand_flow_change(net, hyd, i, dp, n);
            hyd.demand_flow[i] -= dq;
            qsum += hyd.demand_flow[i].abs();
            dqsum += dq.abs();
        }
    }

    // Leakage flows.
    if hyd.has_leakage {
        for i in 1..=net.njuncs {
            let dq = leakage::leakage_flow_change(net, hyd, i);
            if dq != 0.0 {
                qsum += hyd.leakage_flow[i].abs();
                dqsum += dq.abs();
            }
        }
    }

    if qsum > hyd.hacc {
        dqsum / qsum
    } else {
        dqsum
    }
}

/// Tests every convergence criterion against the current solution.
fn has_converged(net: &mut Network, hyd: &mut Hydraul, relerr: f64, balance: &mut HydBalance) -> bool {
    if relerr > hyd.hacc {
        return false;
    }
    check_hyd_balance(net, hyd, balance);
    if hyd.head_error_limit > 0.0 && balance.max_head_error > hyd.head_error_limit {
        return false;
    }
    if hyd.flow_change_limit > 0.0 && balance.max_flow_change > hyd.flow_change_limit {
        return false;
    }
    if hyd.demand_model == DemandModel::Pda && !pda_converged(net, hyd) {
        return false;
    }
    if hyd.has_leakage && !leakage::leakage_has_converged(net, hyd) {
        return false;
    }
    true
}

/// Finds the largest head loss error among open links, re-evaluating the
/// head loss coefficients at the newly updated flows.
fn check_hyd_balance(net: &mut Network, hyd: &mut Hydraul, balance: &mut HydBalance) {
    balance.max_head_error = 0.0;
    coeffs::headloss_coeffs(net, hyd);
    for k in 1..=net.nlinks() {
        if hyd.link_status[k].is_closed() || hyd.p[k] == 0.0 {
            continue;
        }
        let link = &net.links[k];
        let dh = hyd.node_head[link.n1] - hyd.node_head[link.n2];
        let headloss = hyd.y[k] / hyd.p[k];
        let headerror = (dh - headloss).abs();
        if headerror > balance.max_head_error {
            balance.max_head_error = headerror;
        }
    }
}

/// Checks that every junction's pressure-dependent demand satisfies the
/// demand function at the solved heads, and collects the deficiency
/// statistics.
fn pda_converged(net: &Network, hyd: &mut Hydraul) -> bool {
    const QTOL: f64 = 0.0001;
    let (dp, n) = coeffs::demand_params(hyd);

    let mut converged = true;
    let mut total_demand = 0.0;
    let mut total_reduction = 0.0;
    hyd.deficient_nodes = 0;
    hyd.demand_reduction = 0.0;

    for i in 1..=net.njuncs {
        if hyd.node_demand[i] <= 0.0 {
            continue;
        }
        let dq = coeffs::demand_flow_change(net, hyd, i, dp, n);
        if dq.abs() > QTOL {
            converged = false;
        }
        total_demand += hyd.node_demand[i];
        let deficit = hyd.node_demand[i] - hyd.demand_flow[i];
        if deficit > QTOL {
            hyd.deficient_nodes += 1;
            total_reduction += deficit;
        }
    }
    if total_demand > 0.0 {
        hyd.demand_reduction = total_reduction / total_demand * 100.0;
    }
    converged
}

/// When the matrix turns singular at a node, looks for an active control
/// valve on that node and forces it out of the active state so the
/// iteration can continue.
fn bad_valve(net: &Network, hyd: &mut Hydraul, node: usize) -> bool {
    for v in 1..=net.nvalves() {
        let k = net.valves[v].link;
        let link = &net.links[k];
        if node != link.n1 && node != link.n2 {
            continue;
        }
        if matches!(link.ty, LinkType::Prv | LinkType::Psv | LinkType::Fcv)
            && hyd.link_status[k] == LinkStatus::Active
        {
            if hyd.statflag == StatusReport::FullReport {
                debug!(link = %link.id, "valve caused ill-conditioning");
            }
            hyd.link_status[k] = if link.ty == LinkType::Fcv {
                LinkStatus::XFcv
            } else {
                LinkStatus::XPressure
            };
            return true;
        }
    }
    false
}

/// Applies simple low/high pressure controls tied to junctions inside the
/// solver loop. Returns true if any link changed state.
fn pressure_switch(net: &mut Network, hyd: &mut Hydraul) -> bool {
    let mut any_change = false;
    for ci in 0..net.controls.len() {
        let control = net.controls[ci].clone();
        if !control.enabled || control.link_index <= 0 {
            continue;
        }
        let n = control.node_index as usize;
        if n == 0 || n > net.njuncs {
            continue;
        }
        let grade = net.nodes[n].el + control.level;
        let reset = match control.control_type {
            ControlType::LowLevel => hyd.node_head[n] <= grade + hyd.htol,
            ControlType::HiLevel => hyd.node_head[n] >= grade - hyd.htol,
            _ => false,
        };
        if reset && apply_control_action(net, hyd, &control) {
            any_change = true;
        }
    }
    any_change
}

/// Drives a control's link to the control's target state. The setting is
/// interpreted per link kind: open/closed for pipes, speed for pumps and
/// the working setting for valves. Returns true if anything changed.
pub(crate) fn apply_control_action(
    net: &Network,
    hyd: &mut Hydraul,
    control: &crate::types::Control,
) -> bool {
    let k = control.link_index as usize;
    let link = &net.links[k];
    let s = hyd.link_status[k];
    let changed = match link.ty {
        LinkType::CvPipe | LinkType::Pipe => {
            let want = if control.setting == 0.0 {
                LinkStatus::Closed
            } else {
                LinkStatus::Open
            };
            if s.is_closed() != want.is_closed() {
                hyd.link_status[k] = want;
                true
            } else {
                false
            }
        }
        LinkType::Pump => {
            let want = if control.setting > 0.0 {
                LinkStatus::Open
            } else {
                LinkStatus::Closed
            };
            if hyd.link_setting[k] != control.setting || s.is_closed() != want.is_closed() {
                hyd.link_setting[k] = control.setting;
                hyd.link_status[k] = want;
                true
            } else {
                false
            }
        }
        _ => {
            if control.setting == MISSING {
                false
            } else if hyd.link_setting[k] != control.setting
                || hyd.link_status[k] != LinkStatus::Active
            {
                hyd.link_setting[k] = control.setting;
                hyd.link_status[k] = LinkStatus::Active;
                true
            } else {
                false
            }
        }
    };
    if changed && hyd.statflag != StatusReport::NoReport {
        debug!(link = %link.id, status = ?hyd.link_status[k], "control action");
    }
    changed
}

/// Whether applying a control would change its link's current state;
/// used when projecting the time to the next control event.
pub(crate) fn control_would_change(
    net: &Network,
    hyd: &Hydraul,
    control: &crate::types::Control,
) -> bool {
    let k = control.link_index as usize;
    let link = &net.links[k];
    let s = hyd.link_status[k];
    match link.ty {
        LinkType::CvPipe | LinkType::Pipe => {
            s.is_closed() != (control.setting == 0.0)
        }
        LinkType::Pump => {
            hyd.link_setting[k] != control.setting
                || s.is_closed() != (control.setting <= 0.0)
        }
        _ => hyd.link_setting[k] != control.setting,
    }
}

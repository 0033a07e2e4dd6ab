//! Extended-period time stepping: demand and pattern updates, simple
//! control processing, tank volume integration and the computation of the
//! next hydraulic time step.

use crate::epanet_error::{EPANETError, Result};
use crate::hydraul::{energy, flowbalance, solver, Hydraul};
use crate::network::Network;
use crate::rules;
use crate::types::control::ControlType;
use crate::types::link::{LinkStatus, LinkType};
use crate::units::{MISSING, SEC_PER_DAY};
use crate::EPANET;

use tracing::warn;

/// Net flow below which a tank is considered static.
const QZERO: f64 = 1.0e-6;

/// Solves hydraulics at the current point in time. Returns the current
/// simulation time.
pub(crate) fn run_hyd(pr: &mut EPANET) -> Result<u64> {
    let t = pr.times.htime;

    // Apply demand patterns and any controls scheduled for this time.
    demands(pr);
    process_controls(pr);

    solver::hyd_solve(&mut pr.network, &mut pr.hydraul)?;

    // Remember each tank's net inflow for the volume integration.
    for j in 1..=pr.network.ntanks() {
        let n = pr.network.tanks[j].node;
        pr.hydraul.tank_qlast[j] = pr.hydraul.node_demand[n];
    }

    if !solver::solution_converged(&pr.hydraul) {
        if pr.hydraul.extra_iter == -1 {
            pr.times.haltflag = true;
            return Err(EPANETError::Unbalanced { time: t });
        }
        warn!(
            time = t,
            relerr = pr.hydraul.relative_error,
            "hydraulic solution unbalanced; continuing"
        );
    }

    if let Some(cb) = pr.progress.as_mut() {
        cb(t);
    }
    Ok(t)
}

/// Saves the current solution, determines the length of the next time
/// step and advances the simulation clock. Returns the step taken
/// (0 marks the end of the simulation).
pub(crate) fn next_hyd(pr: &mut EPANET) -> Result<u64> {
    if pr.hydraul.save_flag {
        let time = pr.times.htime;
        pr.hydfile
            .save_snapshot(&pr.network, &pr.hydraul, time);
    }

    let mut hydstep = 0;
    if pr.times.htime < pr.times.dur {
        hydstep = timestep(pr);
    }
    if pr.hydraul.save_flag {
        pr.hydfile.save_step(hydstep);
    }

    if pr.times.dur == 0 {
        energy::add_energy(pr, 0);
    } else if pr.times.htime < pr.times.dur {
        energy::add_energy(pr, hydstep);
    }
    flowbalance::update_flow_balance(&pr.network, &mut pr.hydraul, &pr.times, hydstep);

    if pr.times.htime < pr.times.dur {
        pr.times.htime += hydstep;
        if pr.times.htime >= pr.times.rtime {
            pr.times.rtime += pr.times.rstep;
        }
    } else {
        // Force the loop to end and finalize the run's accounting.
        pr.times.htime += 1;
        flowbalance::end_flow_balance(&mut pr.hydraul, &pr.times);
        if pr.hydraul.save_flag {
            pr.hydraul.saved_flag = true;
        }
    }
    Ok(hydstep)
}

/// Computes nodal demands, fixed-grade heads and pattern-driven pump
/// speeds for the current demand period.
pub(crate) fn demands(pr: &mut EPANET) {
    let times = &pr.times;
    let p = (times.htime + times.pstart) / times.pstep;
    let net = &mut pr.network;
    let hyd = &mut pr.hydraul;

    hyd.dsystem = 0.0;
    for i in 1..=net.njuncs {
        let mut sum = 0.0;
        for d in &net.nodes[i].demands {
            let pat = &net.patterns[d.pattern_index as usize];
            let djunc = d.base_demand * pat.factor(p) * hyd.dmult;
            if djunc > 0.0 {
                hyd.dsystem += djunc;
            }
            sum += djunc;
        }
        hyd.node_demand[i] = sum;
        hyd.full_demand[i] = sum;
        hyd.demand_flow[i] = sum;
    }

    // Update fixed grade nodes carrying head patterns.
    for j in 1..=net.ntanks() {
        let tank = &net.tanks[j];
        if tank.is_reservoir() && tank.pat > 0 {
            let f = net.patterns[tank.pat].factor(p);
            let n = tank.node;
            hyd.node_head[n] = net.nodes[n].el * f;
        }
    }

    // Update speed settings of pumps with utilization patterns.
    for j in 1..=net.npumps() {
        if net.pumps[j].upat > 0 {
            let k = net.pumps[j].link;
            let f = net.patterns[net.pumps[j].upat].factor(p);
            set_link_setting(net, hyd, k, f);
        }
    }
}

/// Fixes a link's status fully open or closed, resetting the working
/// setting of pumps and valves accordingly.
pub(crate) fn set_link_status(net: &Network, hyd: &mut Hydraul, k: usize, open: bool) {
    let ty = net.links[k].ty;
    if ty == LinkType::Pump {
        hyd.link_setting[k] = if open { 1.0 } else { 0.0 };
    }
    if ty.is_valve() && ty != LinkType::Gpv {
        hyd.link_setting[k] = MISSING;
    }
    hyd.link_status[k] = if open {
        LinkStatus::Open
    } else {
        LinkStatus::Closed
    };
}

/// Changes a link's working setting: speed for pumps, the control setting
/// for valves (which become active).
pub(crate) fn set_link_setting(net: &Network, hyd: &mut Hydraul, k: usize, value: f64) {
    match net.links[k].ty {
        LinkType::Pump => {
            hyd.link_setting[k] = value;
            if value > 0.0 && hyd.link_status[k].is_closed() {
                hyd.link_status[k] = LinkStatus::Open;
            }
            if value == 0.0 && !hyd.link_status[k].is_closed() {
                hyd.link_status[k] = LinkStatus::Closed;
            }
        }
        LinkType::Gpv => hyd.link_setting[k] = value,
        ty if ty.is_valve() => {
            hyd.link_setting[k] = value;
            hyd.link_status[k] = LinkStatus::Active;
        }
        _ => hyd.link_setting[k] = value,
    }
}

/// Fires every simple control whose trigger condition holds at the
/// current time. Returns the number of control actions taken.
pub(crate) fn process_controls(pr: &mut EPANET) -> usize {
    let mut setsum = 0;
    for ci in 0..pr.network.controls.len() {
        let control = pr.network.controls[ci].clone();
        if !control.enabled || control.link_index <= 0 {
            continue;
        }
        let mut reset = false;

        // Tank level triggers. Junction pressure triggers are handled
        // inside the solver where heads are current.
        let n = control.node_index as usize;
        if n > pr.network.njuncs && n <= pr.network.nnodes() {
            let j = n - pr.network.njuncs;
            let h = pr.hydraul.node_head[n];
            let vplus = pr.hydraul.node_demand[n].abs();
            let v1 = pr.network.tank_volume(j, h);
            let v2 = pr.network.tank_volume(j, pr.network.nodes[n].el + control.level);
            match control.control_type {
                ControlType::LowLevel if v1 <= v2 + vplus => reset = true,
                ControlType::HiLevel if v1 >= v2 - vplus => reset = true,
                _ => {}
            }
        }

        match control.control_type {
            ControlType::Timer => {
                if control.level as u64 == pr.times.htime {
                    reset = true;
                }
            }
            ControlType::TimeOfDay => {
                if (pr.times.htime + pr.times.tstart) % SEC_PER_DAY == control.level as u64 {
                    reset = true;
                }
            }
            _ => {}
        }

        if reset && solver::apply_control_action(&pr.network, &mut pr.hydraul, &control) {
            setsum += 1;
        }
    }
    setsum
}

/// Computes the time until the next hydraulic event: the hydraulic step
/// boundary, a pattern change, the report boundary, a tank filling or
/// emptying, a control trigger or a rule evaluation. Tank levels are
/// advanced over the chosen step.
fn timestep(pr: &mut EPANET) -> u64 {
    let times = &pr.times;
    let mut tstep = times.hstep - times.htime % times.hstep;
    if times.htime + tstep > times.dur {
        tstep = times.dur - times.htime;
    }

    // Time until the next demand pattern period.
    let n = (times.htime + times.pstart) / times.pstep + 1;
    let t = n * times.pstep - times.htime;
    if t > 0 && t < tstep {
        tstep = t;
    }

    // Time until the next reporting period.
    if times.rtime > times.htime {
        let t = times.rtime - times.htime;
        if t < tstep {
            tstep = t;
        }
    }

    tank_timestep(pr, &mut tstep);
    control_timestep(pr, &mut tstep);

    if !pr.network.rules.is_empty() {
        rule_timestep(pr, &mut tstep);
    } else {
        tank_levels(pr, tstep);
    }
    tstep
}

/// Time until the nearest tank fills or drains, projected linearly from
/// each tank's current net flow, with the tank responsible. Returns 0
/// and tank 0 when no tank is heading for either boundary.
pub(crate) fn next_tank_event(pr: &EPANET) -> (u64, usize) {
    let mut tmin = 0u64;
    let mut tank_index = 0;
    for j in 1..=pr.network.ntanks() {
        let tank = &pr.network.tanks[j];
        if tank.is_reservoir() {
            continue;
        }
        let n = tank.node;
        let h = pr.hydraul.node_head[n];
        let q = pr.hydraul.node_demand[n];
        if q.abs() <= QZERO {
            continue;
        }
        let v = if q > 0.0 && h < tank.hmax && !tank.can_overflow {
            tank.vmax - tank.v
        } else if q < 0.0 && h > tank.hmin {
            tank.vmin - tank.v
        } else {
            continue;
        };
        let t = (v / q).round() as i64;
        if t > 0 && (tmin == 0 || (t as u64) < tmin) {
            tmin = t as u64;
            tank_index = j;
        }
    }
    (tmin, tank_index)
}

/// Shrinks the time step to the nearest tank fill or drain event.
fn tank_timestep(pr: &EPANET, tstep: &mut u64) {
    let (t, _) = next_tank_event(pr);
    if t > 0 && t < *tstep {
        *tstep = t;
    }
}

/// Shrinks the time step to the nearest simple-control trigger whose
/// action would actually change its link.
fn control_timestep(pr: &EPANET, tstep: &mut u64) {
    for control in &pr.network.controls {
        if !control.enabled {
            continue;
        }
        let mut t: i64 = 0;
        let n = control.node_index as usize;
        if n > 0 {
            // Only tank levels can be projected forward.
            if n <= pr.network.njuncs {
                continue;
            }
            let j = n - pr.network.njuncs;
            if pr.network.tanks[j].is_reservoir() {
                continue;
            }
            let h = pr.hydraul.node_head[n];
            let q = pr.hydraul.node_demand[n];
            if q.abs() <= QZERO {
                continue;
            }
            let grade = pr.network.nodes[n].el + control.level;
            let filling = grade > h && control.control_type == ControlType::HiLevel && q > 0.0;
            let draining = grade < h && control.control_type == ControlType::LowLevel && q < 0.0;
            if filling || draining {
                let v = pr.network.tank_volume(j, grade) - pr.network.tanks[j].v;
                t = (v / q).round() as i64;
            }
        }

        if control.control_type == ControlType::Timer {
            let ct = control.level as u64;
            if ct > pr.times.htime {
                t = (ct - pr.times.htime) as i64;
            }
        }

        if control.control_type == ControlType::TimeOfDay {
            let t1 = (pr.times.htime + pr.times.tstart) % SEC_PER_DAY;
            let t2 = control.level as u64;
            t = if t2 >= t1 {
                (t2 - t1) as i64
            } else {
                (SEC_PER_DAY - t1 + t2) as i64
            };
        }

        if t > 0
            && (t as u64) < *tstep
            && solver::control_would_change(&pr.network, &pr.hydraul, control)
        {
            *tstep = t as u64;
        }
    }
}

/// Steps through rule evaluation boundaries, updating tank levels as the
/// clock advances, until a rule fires or the time step is exhausted.
fn rule_timestep(pr: &mut EPANET, tstep: &mut u64) {
    let tnow = pr.times.htime;
    let tmax = tnow + *tstep;

    let (mut dt, mut dt1);
    if pr.network.rules.is_empty() {
        dt = *tstep;
        dt1 = dt;
    } else {
        dt = pr.times.rulestep;
        dt1 = pr.times.rulestep - tnow % pr.times.rulestep;
    }
    dt = dt.min(*tstep);
    dt1 = dt1.min(*tstep);
    if dt1 == 0 {
        dt1 = dt;
    }

    loop {
        pr.times.htime += dt1;
        tank_levels(pr, dt1);
        if rules::check_rules(pr, dt1) > 0 {
            break;
        }
        dt = dt.min(tmax - pr.times.htime);
        dt1 = dt;
        if dt == 0 {
            break;
        }
    }

    *tstep = pr.times.htime - tnow;
    pr.times.htime = tnow;
}

/// Integrates tank volumes over `tstep` with the trapezoidal rule on the
/// average of the stored and current net inflows, then projects the new
/// water surface grade.
pub(crate) fn tank_levels(pr: &mut EPANET, tstep: u64) {
    for j in 1..=pr.network.ntanks() {
        let tank = &pr.network.tanks[j];
        if tank.is_reservoir() {
            continue;
        }
        let n = tank.node;
        let q = pr.hydraul.node_demand[n];
        let dv = 0.5 * (q + pr.hydraul.tank_qlast[j]) * tstep as f64;
        pr.hydraul.tank_qlast[j] = q;

        let tank = &mut pr.network.tanks[j];
        tank.v += dv;

        // Clamp if the tank would fill or drain within the next second.
        if tank.v + q >= tank.vmax && !tank.can_overflow {
            tank.v = tank.vmax;
        }
        if tank.v - q.abs() <= tank.vmin {
            tank.v = tank.vmin;
        }

        pr.hydraul.node_head[n] = pr.network.tank_grade(j, pr.network.tanks[j].v);
    }
}

//! Water quality reactions within pipes and tanks.

use crate::types::options::QualityType;
use crate::units::{BIG, L_PER_FT3, SEC_PER_DAY, TINY};
use crate::EPANET;

use std::f64::consts::PI;

/// Whether a reactive constituent is being simulated: age always reacts,
/// a traced constituent never does, and a chemical reacts when any pipe
/// or tank carries a nonzero reaction coefficient.
pub(crate) fn set_react_flag(pr: &EPANET) -> bool {
    match pr.quality.qualflag {
        QualityType::Trace => false,
        QualityType::Age => true,
        _ => {
            let net = &pr.network;
            net.links
                .iter()
                .skip(1)
                .any(|l| l.ty.is_pipe() && (l.kb != 0.0 || l.kw != 0.0))
                || net.tanks.iter().skip(1).any(|t| t.kb != 0.0)
        }
    }
}

/// Unit conversion factor taking bulk reaction rates from a per-liter to
/// a per-cubic-foot concentration basis.
pub(crate) fn get_ucf(order: f64) -> f64 {
    let order = order.max(0.0);
    if order == 1.0 {
        1.0
    } else {
        1.0 / L_PER_FT3.powf(order - 1.0)
    }
}

/// Determines the wall reaction rate coefficient of each pipe at the
/// current hydraulic solution.
pub(crate) fn rate_coeffs(pr: &mut EPANET) {
    for k in 1..=pr.network.nlinks() {
        let kw = pr.network.links[k].kw;
        let rc = if kw != 0.0 { pipe_rate(pr, k) } else { 0.0 };
        pr.network.links[k].rc = rc;
        pr.quality.pipe_rate_coeff[k] = 0.0;
    }
}

/// Wall reaction rate coefficient for first-order reactions, or the mass
/// transfer rate coefficient for zero-order ones, including the
/// Sherwood-number mass transfer limitation.
fn pipe_rate(pr: &EPANET, k: usize) -> f64 {
    let net = &pr.network;
    let qual = &pr.quality;
    let link = &net.links[k];
    let d = link.diam;

    // No mass transfer limitation when the Schmidt number is zero.
    if qual.sc == 0.0 {
        if qual.wall_order == 0.0 {
            return BIG;
        }
        return link.kw * (4.0 / d);
    }

    // Reynolds number at the flow saved to the hydraulics file.
    let q = if pr.hydraul.link_status[k].is_closed() {
        0.0
    } else {
        pr.hydraul.link_flow[k]
    };
    let a = PI * d * d / 4.0;
    let u = q.abs() / a;
    let re = u * d / pr.hydraul.viscos;

    let sh = if re < 1.0 {
        // Stagnant flow: mass transfer coeff = diffusivity / radius.
        2.0
    } else if re >= 2300.0 {
        // Notter-Sleicher formula for turbulent flow.
        0.0149 * re.powf(0.88) * qual.sc.powf(0.333)
    } else {
        // Graetz solution formula for laminar flow.
        let y = d / link.len * re * qual.sc;
        3.65 + 0.0668 * y / (1.0 + 0.04 * y.powf(0.667))
    };

    // Mass transfer coefficient (ft/sec).
    let kf = sh * qual.diffus / d;

    if qual.wall_order == 0.0 {
        return kf;
    }
    let kw = link.kw;
    (4.0 / d) * kw * kf / (kf + kw.abs())
}

/// Reacts the water within each pipe over a time step.
pub(crate) fn react_pipes(pr: &mut EPANET, dt: u64) {
    for k in 1..=pr.network.nlinks() {
        if !pr.network.links[k].ty.is_pipe() {
            continue;
        }
        let mut rsum = 0.0;
        let mut vsum = 0.0;

        let mut i = pr.quality.segs.first[k];
        while i != 0 {
            let seg = pr.quality.segs.segs[i];
            let cnew = pipe_react(pr, k, seg.c, seg.v, dt);
            pr.quality.segs.segs[i].c = cnew;
            pr.quality.mass_balance.reacted += (seg.c - cnew) * seg.v;

            if pr.quality.qualflag == QualityType::Chem {
                rsum += (cnew - seg.c).abs() * seg.v;
                vsum += seg.v;
            }
            i = seg.prev;
        }

        // Volume-weighted average reaction rate, per day.
        pr.quality.pipe_rate_coeff[k] = if vsum > 0.0 {
            rsum / vsum / dt as f64 * SEC_PER_DAY as f64
        } else {
            0.0
        };
    }
}

/// Reacts the water within each tank over a time step.
pub(crate) fn react_tanks(pr: &mut EPANET, dt: u64) {
    for j in 1..=pr.network.ntanks() {
        if pr.network.tanks[j].is_reservoir() {
            continue;
        }
        let kb = pr.network.tanks[j].kb;
        let k = pr.network.nlinks() + j;

        let mut i = pr.quality.segs.first[k];
        while i != 0 {
            let seg = pr.quality.segs.segs[i];
            let cnew = tank_react(pr, seg.c, seg.v, kb, dt);
            pr.quality.segs.segs[i].c = cnew;
            pr.quality.mass_balance.reacted += (seg.c - cnew) * seg.v;
            i = seg.prev;
        }
    }
}

/// New quality in a pipe segment after bulk and wall reactions.
fn pipe_react(pr: &mut EPANET, k: usize, c: f64, v: f64, dt: u64) -> f64 {
    let qual = &pr.quality;

    // Water age grows at unit rate (hours).
    if qual.qualflag == QualityType::Age {
        return (c + dt as f64 / 3600.0).max(0.0);
    }

    let link = &pr.network.links[k];
    let rbulk = bulk_rate(qual, c, link.kb, qual.bulk_order) * qual.bucf;
    let rwall = wall_rate(qual, c, link.diam, link.kw, link.rc);

    let dcbulk = rbulk * dt as f64;
    let dcwall = rwall * dt as f64;

    if pr.times.htime >= pr.times.rstart {
        pr.quality.wbulk += dcbulk.abs() * v;
        pr.quality.wwall += dcwall.abs() * v;
    }

    (c + dcbulk + dcwall).max(0.0)
}

/// New quality in a tank after its bulk reaction.
fn tank_react(pr: &mut EPANET, c: f64, v: f64, kb: f64, dt: u64) -> f64 {
    let qual = &pr.quality;
    let dc = if qual.qualflag == QualityType::Age {
        dt as f64 / 3600.0
    } else {
        let rbulk = bulk_rate(qual, c, kb, qual.tank_order) * qual.tucf;
        let dc = rbulk * dt as f64;
        if pr.times.htime >= pr.times.rstart {
            pr.quality.wtank += dc.abs() * v;
        }
        dc
    };
    (c + dc).max(0.0)
}

/// Bulk reaction rate (mass/volume/time) for n-th order kinetics with a
/// limiting potential; negative orders select Michaelis-Menten kinetics.
fn bulk_rate(qual: &crate::quality::Quality, c: f64, kb: f64, order: f64) -> f64 {
    let mut c = c;
    if order == 0.0 {
        c = 1.0;
    } else if order < 0.0 {
        let mut c1 = qual.climit + kb.signum() * c;
        if c1.abs() < TINY {
            c1 = c1.signum() * TINY;
        }
        c /= c1;
    } else {
        let c1 = if qual.climit == 0.0 {
            c
        } else {
            (kb.signum() * (qual.climit - c)).max(0.0)
        };
        if order == 1.0 {
            c = c1;
        } else if order == 2.0 {
            c = c1 * c;
        } else {
            c = c1 * c.max(0.0).powf(order - 1.0);
        }
    }
    if c < 0.0 {
        c = 0.0;
    }
    kb * c
}

/// Wall reaction rate (mass/cu ft/sec). Zero-order reactions are capped
/// by the available mass transfer rate.
fn wall_rate(qual: &crate::quality::Quality, c: f64, d: f64, kw: f64, kf: f64) -> f64 {
    if kw == 0.0 || d == 0.0 {
        return 0.0;
    }
    if qual.wall_order == 0.0 {
        let mass_transfer = kw.signum() * c * kf;
        let mut kw = kw;
        if mass_transfer.abs() < kw.abs() {
            kw = mass_transfer;
        }
        kw * 4.0 / d
    } else {
        c * kf
    }
}

//! Pump energy usage accounting, accumulated at every hydraulic step.

use crate::units::{CSMALL, KW_PER_HP, SEC_PER_DAY};
use crate::EPANET;

/// Per-pump energy usage statistics reported once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PumpEnergyUsage {
    /// Percent of the run the pump was on-line.
    pub utilization: f64,
    /// Average efficiency (percent).
    pub avg_efficiency: f64,
    /// Average kW consumed per unit of flow.
    pub kw_per_flow: f64,
    /// Average power draw (kW).
    pub avg_kw: f64,
    /// Peak power draw (kW).
    pub peak_kw: f64,
    /// Energy cost per day.
    pub cost_per_day: f64,
}

/// Power draw (kW) and efficiency (percent) of the pump in link `k`.
pub(crate) fn get_energy(pr: &EPANET, k: usize) -> (f64, f64) {
    let hyd = &pr.hydraul;
    let net = &pr.network;

    if hyd.link_status[k].is_closed() || hyd.link_setting[k] == 0.0 {
        return (0.0, 0.0);
    }
    let q = hyd.link_flow[k].abs().max(CSMALL);
    let link = &net.links[k];
    let dh = (hyd.node_head[link.n1] - hyd.node_head[link.n2]).abs();

    let mut e = hyd.epump;
    if let Some(p) = net.find_pump(k) {
        if net.pumps[p].ecurve > 0 {
            e = net.curves[net.pumps[p].ecurve].interp(q);
        }
    }
    let e = (e.clamp(1.0, 100.0)) / 100.0;
    let kw = dh * q * hyd.spgrav / 8.814 / e * KW_PER_HP;
    (kw, e * 100.0)
}

/// Accumulates pump energy usage over a time interval of `hstep` seconds.
pub(crate) fn add_energy(pr: &mut EPANET, hstep: u64) {
    let times = &pr.times;
    let dt = if times.dur == 0 {
        1.0
    } else if times.htime < times.dur {
        hstep as f64 / 3600.0
    } else {
        0.0
    };
    if dt == 0.0 {
        return;
    }

    // Energy price for the current period.
    let c0 = pr.hydraul.ecost;
    let period = (times.htime + times.pstart) / times.pstep;
    let f0 = if pr.hydraul.epat > 0 {
        pr.network.patterns[pr.hydraul.epat].factor(period)
    } else {
        1.0
    };

    let mut psum = 0.0;
    for j in 1..=pr.network.npumps() {
        let k = pr.network.pumps[j].link;
        if pr.hydraul.link_status[k].is_closed() {
            continue;
        }
        let q = pr.hydraul.link_flow[k].abs().max(CSMALL);

        // Pump-specific price and price pattern override the globals.
        let mut c = if pr.network.pumps[j].ecost > 0.0 {
            pr.network.pumps[j].ecost
        } else {
            c0
        };
        let epat = pr.network.pumps[j].epat;
        if epat > 0 {
            c *= pr.network.patterns[epat].factor(period);
        } else {
            c *= f0;
        }

        let (kw, eff) = get_energy(pr, k);
        psum += kw;

        let energy = &mut pr.network.pumps[j].energy;
        energy.hrs_online += dt;
        energy.effic_hrs += eff * dt;
        energy.kw_per_flow_hrs += kw / q * dt;
        energy.kwh += kw * dt;
        energy.max_kw = energy.max_kw.max(kw);
        energy.cost_hrs += c * kw * dt;
    }
    pr.hydraul.emax = pr.hydraul.emax.max(psum);
}

/// Converts a pump's accumulators into its reported usage statistics.
pub(crate) fn usage_stats(pr: &EPANET, p: usize) -> PumpEnergyUsage {
    let energy = &pr.network.pumps[p].energy;
    let total_hrs = if pr.times.dur == 0 {
        1.0
    } else {
        (pr.times.dur as f64 / 3600.0).max(CSMALL)
    };
    let hrs = energy.hrs_online;
    if hrs == 0.0 {
        return PumpEnergyUsage::default();
    }
    PumpEnergyUsage {
        utilization: hrs / total_hrs * 100.0,
        avg_efficiency: energy.effic_hrs / hrs,
        kw_per_flow: energy.kw_per_flow_hrs / hrs,
        avg_kw: energy.kwh / hrs,
        peak_kw: energy.max_kw,
        cost_per_day: energy.cost_hrs / total_hrs * (SEC_PER_DAY as f64 / 3600.0),
    }
}

#[cfg(test)]
mod tests {
    use crate::impls::test_utils::fixtures::ph;
    use crate::impls::test_utils::fixtures::ph_close;
    use crate::types::options::Option as OptionCode;

    #[test]
    fn pump_energy_accumulates_over_a_run() {
        let mut pr = ph(ph_close());
        pr.set_option(OptionCode::GlobalPrice, 0.10).unwrap();
        pr.solve_h().unwrap();

        let pump = pr.get_link_index("PU1").unwrap();
        let usage = pr.get_pump_energy(pump).unwrap();
        assert!(usage.utilization > 0.0 && usage.utilization <= 100.0);
        assert!(usage.avg_kw > 0.0);
        assert!(usage.peak_kw >= usage.avg_kw);
        assert!(usage.avg_efficiency >= 1.0 && usage.avg_efficiency <= 100.0);
        assert!(usage.cost_per_day > 0.0);
    }
}

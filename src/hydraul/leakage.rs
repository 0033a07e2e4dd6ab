//! Pipe leakage modelled with the FAVAD (fixed and variable area
//! discharge) equation
//!
//! ```text
//! Q = Co * L * (Ao + m * H) * sqrt(H)
//! ```
//!
//! inverted into a pair of equivalent emitters at each pipe's end nodes:
//! `H = Cfa * Qfa^2` for fixed-area leaks and `H = Cva * Qva^(2/3)` for
//! variable-area leaks, each pipe contributing half its length to each
//! junction end node.

use crate::hydraul::Hydraul;
use crate::network::Network;
use crate::units::M_PER_FT;

/// Per-junction leakage state: inverted coefficients and the current
/// fixed/variable area leakage flows.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LeakNode {
    pub cfa: f64,
    pub cva: f64,
    pub qfa: f64,
    pub qva: f64,
}

/// Orifice coefficient (0.6*sqrt(2g)) with conversion from sq mm to sq m.
const C_ORIF: f64 = 4.8149866e-6;

/// Builds the per-junction leakage coefficients from the pipes' leak
/// parameters. Called by `open_h`.
pub(crate) fn open_leakage(net: &Network, hyd: &mut Hydraul) {
    hyd.leakage = Vec::new();
    hyd.has_leakage = net.links.iter().skip(1).any(|link| {
        link.ty.is_pipe() && (link.leak_area > 0.0 || link.leak_expan > 0.0)
    });
    if !hyd.has_leakage {
        return;
    }
    let mut leaks = vec![LeakNode::default(); net.njuncs + 1];

    for link in net.links.iter().skip(1) {
        if !link.ty.is_pipe() {
            continue;
        }
        if link.leak_area == 0.0 && link.leak_expan == 0.0 {
            continue;
        }
        // A pipe between two fixed grade nodes contributes no leakage
        // since those nodes carry no demands.
        let j1 = link.n1 <= net.njuncs;
        let j2 = link.n2 <= net.njuncs;
        if !j1 && !j2 {
            continue;
        }
        let mut c_area = C_ORIF * link.leak_area / (M_PER_FT * M_PER_FT);
        let mut c_expan = C_ORIF * link.leak_expan;

        // Number of 100-ft pipe sections, split between the end nodes.
        let mut len = link.len / 100.0;
        if j1 && j2 {
            len *= 0.5;
        }
        c_area *= len;
        c_expan *= len;

        if j1 {
            leaks[link.n1].cfa += c_area;
            leaks[link.n1].cva += c_expan;
        }
        if j2 {
            leaks[link.n2].cfa += c_area;
            leaks[link.n2].cva += c_expan;
        }
    }

    // Invert the summed coefficients and seed the leakage flows with a
    // small non-zero value, as the solver's flow updates require.
    for leak in leaks.iter_mut().skip(1) {
        leak.cfa = if leak.cfa > 0.0 {
            1.0 / (leak.cfa * leak.cfa)
        } else {
            0.0
        };
        leak.cva = if leak.cva > 0.0 {
            1.0 / leak.cva.powf(2.0 / 3.0)
        } else {
            0.0
        };
    }
    hyd.leakage = leaks;
    init_node_leakage(hyd);
}

/// Re-seeds the leakage flows ahead of a run.
pub(crate) fn init_node_leakage(hyd: &mut Hydraul) {
    for leak in hyd.leakage.iter_mut().skip(1) {
        if leak.cfa > 0.0 {
            leak.qfa = 0.001;
        }
        if leak.cva > 0.0 {
            leak.qva = 0.001;
        }
    }
}

/// Leakage flow from link `i` at the current hydraulic solution (cfs).
pub(crate) fn find_link_leakage(net: &Network, hyd: &Hydraul, i: usize) -> f64 {
    let link = &net.links[i];
    if !link.ty.is_pipe() {
        return 0.0;
    }
    if link.leak_area == 0.0 && link.leak_expan == 0.0 {
        return 0.0;
    }
    let (n1, n2) = (link.n1, link.n2);
    if n1 > net.njuncs && n2 > net.njuncs {
        return 0.0;
    }

    let h1 = (hyd.node_head[n1] - net.nodes[n1].el).max(0.0);
    let h2 = (hyd.node_head[n2] - net.nodes[n2].el).max(0.0);

    let a = link.leak_area / (M_PER_FT * M_PER_FT);
    let m = link.leak_expan;
    let len = link.len / 100.0;
    let c = C_ORIF * len / 2.0;

    let mut q1 = 0.0;
    if n1 <= net.njuncs {
        q1 = c * (a + m * h1) * h1.sqrt();
    }
    let mut q2 = 0.0;
    if n2 <= net.njuncs {
        q2 = c * (a + m * h2) * h2.sqrt();
    }

    // A fixed grade end assigns the whole pipe to the other node.
    if n2 > net.njuncs {
        q1 *= 2.0;
    }
    if n1 > net.njuncs {
        q2 *= 2.0;
    }
    q1 + q2
}

/// Coefficients contributed by node leakage to the linearized equations.
pub(crate) fn leakage_coeffs(net: &Network, hyd: &mut Hydraul) {
    for i in 1..=net.njuncs {
        let Some((hfa, gfa, hva, gva)) = leakage_headloss(hyd, i) else {
            continue;
        };
        let node = &net.nodes[i];
        let row = hyd.sm.row[i];
        if gfa > 0.0 {
            hyd.sm.aii[row] += 1.0 / gfa;
            hyd.sm.f[row] += (hfa + node.el) / gfa;
        }
        if gva > 0.0 {
            hyd.sm.aii[row] += 1.0 / gva;
            hyd.sm.f[row] += (hva + node.el) / gva;
        }
        hyd.xflow[i] -= hyd.leakage[i].qfa + hyd.leakage[i].qva;
    }
}

/// GGA flow update for a node's leakage after new heads are computed;
/// returns the total change in leakage flow.
pub(crate) fn leakage_flow_change(net: &Network, hyd: &mut Hydraul, i: usize) -> f64 {
    let Some((hfa, gfa, hva, gva)) = leakage_headloss(hyd, i) else {
        return 0.0;
    };
    let h = hyd.node_head[i] - net.nodes[i].el;

    let mut dqfa = 0.0;
    if gfa > 0.0 {
        dqfa = (hfa - h) / gfa * hyd.relax_factor;
        hyd.leakage[i].qfa -= dqfa;
    }
    let mut dqva = 0.0;
    if gva > 0.0 {
        dqva = (hva - h) / gva * hyd.relax_factor;
        hyd.leakage[i].qva -= dqva;
    }

    hyd.leakage_flow[i] = hyd.leakage[i].qfa + hyd.leakage[i].qva;
    dqfa + dqva
}

/// Compares each node's solved leakage against the leakage the FAVAD
/// equation gives directly at the node's pressure head.
pub(crate) fn leakage_has_converged(net: &Network, hyd: &Hydraul) -> bool {
    const QTOL: f64 = 0.0001; // 0.0001 cfs ~= 0.005 gpm

    for i in 1..=net.njuncs {
        let leak = &hyd.leakage[i];
        if leak.cfa == 0.0 && leak.cva == 0.0 {
            continue;
        }
        let h = hyd.node_head[i] - net.nodes[i].el;
        let mut qref = 0.0;
        if h > 0.0 {
            if leak.cfa > 0.0 {
                qref = (h / leak.cfa).sqrt();
            }
            if leak.cva > 0.0 {
                qref += (h / leak.cva).powf(1.5);
            }
        }
        let qtest = leak.qfa + leak.qva;
        if (qref - qtest).abs() > QTOL {
            return false;
        }
    }
    true
}

/// Head loss and gradient of both inverted leakage relations at the
/// current leakage flows; None when the node cannot leak.
fn leakage_headloss(hyd: &Hydraul, i: usize) -> std::option::Option<(f64, f64, f64, f64)> {
    let leak = &hyd.leakage[i];
    if leak.cfa == 0.0 && leak.cva == 0.0 {
        return None;
    }
    let (hfa, gfa) = if leak.cfa == 0.0 {
        (0.0, 0.0)
    } else {
        eval_leak_headloss(leak.qfa, leak.cfa, 0.5)
    };
    let (hva, gva) = if leak.cva == 0.0 {
        (0.0, 0.0)
    } else {
        eval_leak_headloss(leak.qva, leak.cva, 1.5)
    };
    Some((hfa, gfa, hva, gva))
}

/// Inverted leakage equation `hloss = c * q^(1/n)` evaluated with a lower
/// barrier that keeps leakage flow from going negative.
fn eval_leak_headloss(q: f64, c: f64, n: f64) -> (f64, f64) {
    let n = 1.0 / n;
    let mut hgrad = n * c * q.abs().powf(n - 1.0);
    let mut hloss = hgrad * q / n;
    add_lower_barrier(q, &mut hloss, &mut hgrad);
    (hloss, hgrad)
}

/// Adds a head loss barrier to keep a flow from falling below zero.
pub(crate) fn add_lower_barrier(q: f64, hloss: &mut f64, hgrad: &mut f64) {
    let a = 1.0e9 * q;
    let b = (a * a + 1.0e-6).sqrt();
    *hloss += (a - b) / 2.0;
    *hgrad += (1.0e9 / 2.0) * (1.0 - a / b);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_barrier_is_negligible_for_positive_flow() {
        let (mut h, mut g) = (5.0, 1.0);
        add_lower_barrier(0.5, &mut h, &mut g);
        assert!((h - 5.0).abs() < 1e-6);
        assert!((g - 1.0).abs() < 1e-3);
    }

    #[test]
    fn lower_barrier_blocks_negative_flow() {
        let (mut h, mut g) = (0.0, 1.0);
        add_lower_barrier(-0.5, &mut h, &mut g);
        assert!(h < -1.0e8);
        assert!(g > 1.0e8);
    }
}

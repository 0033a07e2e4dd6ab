//! Discrete status updates for links after each converged Newton subcycle.

use crate::hydraul::Hydraul;
use crate::network::Network;
use crate::types::link::{LinkStatus, LinkType, PumpType};
use crate::types::options::StatusReport;
use crate::units::{BIG, MISSING};

use tracing::debug;

/// Updates status for PRVs and PSVs whose status is not fixed.
/// Returns true if any valve changed status.
pub(crate) fn valve_status(net: &Network, hyd: &mut Hydraul) -> bool {
    let mut change = false;
    for v in 1..=net.nvalves() {
        let k = net.valves[v].link;
        if hyd.link_setting[k] == MISSING {
            continue;
        }
        let link = &net.links[k];
        let (n1, n2) = (link.n1, link.n2);
        let status = hyd.link_status[k];

        let new_status = match link.ty {
            LinkType::Prv => {
                let hset = net.nodes[n2].el + hyd.link_setting[k];
                prv_status(net, hyd, k, status, hset, hyd.node_head[n1], hyd.node_head[n2])
            }
            LinkType::Psv => {
                let hset = net.nodes[n1].el + hyd.link_setting[k];
                psv_status(net, hyd, k, status, hset, hyd.node_head[n1], hyd.node_head[n2])
            }
            _ => continue,
        };

        if status != new_status {
            if hyd.statflag == StatusReport::FullReport {
                debug!(link = %link.id, from = ?status, to = ?new_status, "valve status change");
            }
            hyd.link_status[k] = new_status;
            change = true;
        }
    }
    change
}

/// Determines a new status for pumps, CVs, FCVs and links connected to
/// full or empty tanks. Returns true if any link changed status.
pub(crate) fn link_status(net: &Network, hyd: &mut Hydraul) -> bool {
    let mut change = false;
    for k in 1..=net.nlinks() {
        let link = &net.links[k];
        let (n1, n2) = (link.n1, link.n2);
        let dh = hyd.node_head[n1] - hyd.node_head[n2];

        let status = hyd.link_status[k];
        // Re-open temporarily closed links.
        if status == LinkStatus::XHead || status == LinkStatus::TempClosed {
            hyd.link_status[k] = LinkStatus::Open;
        }

        if link.ty == LinkType::CvPipe {
            hyd.link_status[k] = cv_status(hyd, hyd.link_status[k], dh, hyd.link_flow[k]);
        }
        if link.ty == LinkType::Pump
            && hyd.link_status[k] >= LinkStatus::Open
            && hyd.link_setting[k] > 0.0
        {
            hyd.link_status[k] = pump_status(net, hyd, k, -dh);
        }

        if link.ty == LinkType::Fcv && hyd.link_setting[k] != MISSING {
            hyd.link_status[k] =
                fcv_status(hyd, k, status, hyd.node_head[n1], hyd.node_head[n2]);
        }

        if n1 > net.njuncs || n2 > net.njuncs {
            tank_status(net, hyd, k, n1, n2);
        }

        if status != hyd.link_status[k] {
            change = true;
            if hyd.statflag == StatusReport::FullReport {
                debug!(
                    link = %link.id,
                    from = ?status,
                    to = ?hyd.link_status[k],
                    "link status change"
                );
            }
        }
    }
    change
}

/// New status for a check valve given the head difference and flow.
fn cv_status(hyd: &Hydraul, s: LinkStatus, dh: f64, q: f64) -> LinkStatus {
    // Prevent reverse flow through CVs.
    if dh.abs() > hyd.htol {
        if dh < -hyd.htol || q < -hyd.qtol {
            LinkStatus::Closed
        } else {
            LinkStatus::Open
        }
    } else if q < -hyd.qtol {
        LinkStatus::Closed
    } else {
        s
    }
}

/// New status for an open pump given its head gain.
fn pump_status(net: &Network, hyd: &Hydraul, k: usize, dh: f64) -> LinkStatus {
    let p = net.find_pump(k).expect("pump record exists for pump link");
    let hmax = if net.pumps[p].ptype == PumpType::ConstHp {
        BIG
    } else {
        hyd.link_setting[k] * hyd.link_setting[k] * net.pumps[p].hmax
    };
    // The pump shuts down when asked for more head than it can deliver;
    // no check is made for flow above the pump's maximum flow.
    if dh > hmax + hyd.htol {
        LinkStatus::XHead
    } else {
        LinkStatus::Open
    }
}

/// Pressure-reducing valve state machine.
fn prv_status(
    net: &Network,
    hyd: &Hydraul,
    k: usize,
    s: LinkStatus,
    hset: f64,
    h1: f64,
    h2: f64,
) -> LinkStatus {
    let htol = hyd.htol;
    let hml = net.links[k].km * hyd.link_flow[k] * hyd.link_flow[k];
    match s {
        LinkStatus::Active => {
            if hyd.link_flow[k] < -hyd.qtol {
                LinkStatus::Closed
            } else if h1 - hml < hset - htol {
                LinkStatus::Open
            } else {
                LinkStatus::Active
            }
        }
        LinkStatus::Open => {
            if hyd.link_flow[k] < -hyd.qtol {
                LinkStatus::Closed
            } else if h2 >= hset + htol {
                LinkStatus::Active
            } else {
                LinkStatus::Open
            }
        }
        LinkStatus::Closed => {
            if h1 >= hset + htol && h2 < hset - htol {
                LinkStatus::Active
            } else if h1 < hset - htol && h1 > h2 + htol {
                LinkStatus::Open
            } else {
                LinkStatus::Closed
            }
        }
        LinkStatus::XPressure => {
            if hyd.link_flow[k] < -hyd.qtol {
                LinkStatus::Closed
            } else {
                s
            }
        }
        _ => s,
    }
}

/// Pressure-sustaining valve state machine; PRV logic with the upstream
/// and downstream roles swapped.
fn psv_status(
    net: &Network,
    hyd: &Hydraul,
    k: usize,
    s: LinkStatus,
    hset: f64,
    h1: f64,
    h2: f64,
) -> LinkStatus {
    let htol = hyd.htol;
    let hml = net.links[k].km * hyd.link_flow[k] * hyd.link_flow[k];
    match s {
        LinkStatus::Active => {
            if hyd.link_flow[k] < -hyd.qtol {
                LinkStatus::Closed
            } else if h2 + hml > hset + htol {
                LinkStatus::Open
            } else {
                LinkStatus::Active
            }
        }
        LinkStatus::Open => {
            if hyd.link_flow[k] < -hyd.qtol {
                LinkStatus::Closed
            } else if h1 < hset - htol {
                LinkStatus::Active
            } else {
                LinkStatus::Open
            }
        }
        LinkStatus::Closed => {
            if h2 > hset + htol && h1 > h2 + htol {
                LinkStatus::Open
            } else if h1 >= hset + htol && h1 > h2 + htol {
                LinkStatus::Active
            } else {
                LinkStatus::Closed
            }
        }
        LinkStatus::XPressure => {
            if hyd.link_flow[k] < -hyd.qtol {
                LinkStatus::Closed
            } else {
                s
            }
        }
        _ => s,
    }
}

/// Flow-control valve state machine: reverse flow forces XFCV; an XFCV
/// valve becomes active again once flow exceeds its setting.
fn fcv_status(hyd: &Hydraul, k: usize, s: LinkStatus, h1: f64, h2: f64) -> LinkStatus {
    if h1 - h2 < -hyd.htol || hyd.link_flow[k] < -hyd.qtol {
        LinkStatus::XFcv
    } else if s == LinkStatus::XFcv && hyd.link_flow[k] >= hyd.link_setting[k] {
        LinkStatus::Active
    } else {
        s
    }
}

/// Closes a link flowing into a full tank or out of an empty one.
fn tank_status(net: &Network, hyd: &mut Hydraul, k: usize, n1: usize, n2: usize) {
    if hyd.link_status[k].is_closed() {
        return;
    }

    // Make n1 the tank, reversing the flow sign if needed.
    let (mut n1, mut n2) = (n1, n2);
    let mut q = hyd.link_flow[k];
    let mut i = n1 as i64 - net.njuncs as i64;
    if i <= 0 {
        i = n2 as i64 - net.njuncs as i64;
        if i <= 0 {
            return;
        }
        std::mem::swap(&mut n1, &mut n2);
        q = -q;
    }
    let tank = &net.tanks[i as usize];
    if tank.is_reservoir() {
        return;
    }

    let link = &net.links[k];
    let h = hyd.node_head[n1] - hyd.node_head[n2];

    // Tank full: prevent flow into it (unless it may overflow).
    if hyd.node_head[n1] >= tank.hmax - hyd.htol && !tank.can_overflow {
        if link.ty == LinkType::Pump {
            if link.n2 == n1 {
                hyd.link_status[k] = LinkStatus::TempClosed;
            }
        } else if cv_status(hyd, LinkStatus::Open, h, q) == LinkStatus::Closed {
            hyd.link_status[k] = LinkStatus::TempClosed;
        }
    }

    // Tank empty: prevent flow out of it.
    if hyd.node_head[n1] <= tank.hmin + hyd.htol {
        if link.ty == LinkType::Pump {
            if link.n1 == n1 {
                hyd.link_status[k] = LinkStatus::TempClosed;
            }
        } else if cv_status(hyd, LinkStatus::Closed, h, q) == LinkStatus::Open {
            hyd.link_status[k] = LinkStatus::TempClosed;
        }
    }
}

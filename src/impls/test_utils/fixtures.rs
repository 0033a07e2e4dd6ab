//! Shared rstest fixtures. Networks are built through the public API;
//! all values are in internal units (feet, seconds, cfs).

use crate::types::control::ControlType;
use crate::types::link::{LinkProperty, LinkType};
use crate::types::node::NodeType;
use crate::types::options::{FlowUnits, HeadLossType, TimeParameter};
use crate::EPANET;
use rstest::fixture;

pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// An empty project.
#[fixture]
pub fn ph_close() -> EPANET {
    EPANET::new("", "", FlowUnits::Cfs, HeadLossType::HazenWilliams)
        .expect("ERROR CREATING PROJECT")
}

/// A small looped network: a reservoir pumping up to two junctions that
/// feed a storage tank, with a high-level control on the pump and a
/// 24-hour extended period setup.
///
/// ```text
///   R1 --PU1--> J1 --P1--> J2
///               |           |
///               P3          P2
///               |           |
///               +----T1-----+
/// ```
#[fixture]
pub fn ph(mut ph_close: EPANET) -> EPANET {
    let ph = &mut ph_close;

    let j1 = ph.add_node("J1", NodeType::Junction).unwrap();
    let j2 = ph.add_node("J2", NodeType::Junction).unwrap();
    ph.add_node("R1", NodeType::Reservoir).unwrap();
    let t1 = ph.add_node("T1", NodeType::Tank).unwrap();

    ph.set_junction_data(j1, 600.0, 1.0, "").unwrap();
    ph.set_junction_data(j2, 590.0, 0.5, "").unwrap();
    let r1 = ph.get_node_index("R1").unwrap();
    ph.set_node_value(r1, crate::types::node::NodeProperty::Elevation, 700.0)
        .unwrap();
    ph.set_tank_data(t1, 650.0, 10.0, 0.0, 40.0, 50.0, 0.0, "")
        .unwrap();

    let pump = ph.add_link("PU1", LinkType::Pump, "R1", "J1").unwrap();
    let curve = ph.add_curve("PC1").unwrap();
    ph.set_curve(curve, &[2.0], &[120.0]).unwrap();
    ph.set_link_value(pump, LinkProperty::PumpHCurve, curve as f64)
        .unwrap();

    let p1 = ph.add_link("P1", LinkType::Pipe, "J1", "J2").unwrap();
    let p2 = ph.add_link("P2", LinkType::Pipe, "J2", "T1").unwrap();
    let p3 = ph.add_link("P3", LinkType::Pipe, "J1", "T1").unwrap();
    for k in [p1, p2, p3] {
        ph.set_pipe_data(k, 1000.0, 1.0, 100.0, 0.0).unwrap();
    }

    // Cycle the pump off near the tank's top and back on when it draws
    // down, so demands stay served over a full day.
    ph.add_control(ControlType::HiLevel, pump, 0.0, t1, 35.0)
        .unwrap();
    ph.add_control(ControlType::LowLevel, pump, 1.0, t1, 15.0)
        .unwrap();

    ph.set_time_param(TimeParameter::Duration, 24 * 3600).unwrap();
    ph.set_time_param(TimeParameter::HydStep, 3600).unwrap();
    ph.set_time_param(TimeParameter::QualStep, 360).unwrap();

    ph_close
}

/// A minimal reservoir-to-junction network for link-level tests.
pub fn build_two_node_net(ph: &mut EPANET) {
    let r1 = ph.add_node("R1", NodeType::Reservoir).unwrap();
    let j1 = ph.add_node("J1", NodeType::Junction).unwrap();
    ph.set_node_value(r1, crate::types::node::NodeProperty::Elevation, 100.0)
        .unwrap();
    ph.set_junction_data(j1, 0.0, 1.0, "").unwrap();
    ph.add_link("P1", LinkType::Pipe, "R1", "J1").unwrap();
}

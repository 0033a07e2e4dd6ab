use crate::types::link::{LinkStatus, LinkType, PumpType};

/// A network link: pipe, pump or valve.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub id: String,
    /// Start node index (positive flow runs N1 -> N2).
    pub n1: usize,
    /// End node index.
    pub n2: usize,
    pub ty: LinkType,
    /// Diameter (ft).
    pub diam: f64,
    /// Length (ft).
    pub len: f64,
    /// Roughness for pipes, speed for pumps, setting for valves.
    pub kc: f64,
    /// Minor loss coefficient.
    pub km: f64,
    /// Bulk reaction coefficient.
    pub kb: f64,
    /// Wall reaction coefficient.
    pub kw: f64,
    /// Flow resistance, computed from the head loss formula.
    pub r: f64,
    /// Flow below which head loss reverts to a linear relation.
    pub qa: f64,
    /// Wall reaction rate coefficient computed at quality open.
    pub rc: f64,
    /// Leak area (sq mm per 100 length units; pipes only).
    pub leak_area: f64,
    /// Leak expansion rate (sq mm per unit pressure head; pipes only).
    pub leak_expan: f64,
    /// Initial status.
    pub status: LinkStatus,
}

impl Default for Link {
    fn default() -> Self {
        Link {
            id: String::new(),
            n1: 0,
            n2: 0,
            ty: LinkType::Pipe,
            diam: 0.0,
            len: 0.0,
            kc: 0.0,
            km: 0.0,
            kb: 0.0,
            kw: 0.0,
            r: 0.0,
            qa: 0.0,
            rc: 0.0,
            leak_area: 0.0,
            leak_expan: 0.0,
            status: LinkStatus::Open,
        }
    }
}

impl Link {
    /// Interior cross-sectional area (sq ft).
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.diam * self.diam / 4.0
    }

    /// Full volume of a pipe (cu ft).
    pub fn volume(&self) -> f64 {
        self.len * self.area()
    }
}

/// Energy usage accumulators for a pump, converted to the reported
/// statistics once a run completes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EnergyStats {
    /// Hours on-line.
    pub hrs_online: f64,
    /// Efficiency-hours.
    pub effic_hrs: f64,
    /// kW per unit flow, in hours.
    pub kw_per_flow_hrs: f64,
    /// Kilowatt-hours consumed.
    pub kwh: f64,
    /// Peak power draw (kW).
    pub max_kw: f64,
    /// Cost-hours.
    pub cost_hrs: f64,
}

/// Pump data referenced by a pump-type link.
#[derive(Debug, Clone)]
pub(crate) struct Pump {
    /// Link index of the pump.
    pub link: usize,
    pub ptype: PumpType,
    /// Initial (design) flow.
    pub q0: f64,
    /// Maximum flow.
    pub qmax: f64,
    /// Maximum (shutoff) head.
    pub hmax: f64,
    /// Shutoff head coefficient of H = H0 - R*Q^N.
    pub h0: f64,
    /// Flow coefficient.
    pub r: f64,
    /// Flow exponent.
    pub n: f64,
    /// Head v. flow curve index (0 = none).
    pub hcurve: usize,
    /// Efficiency v. flow curve index (0 = none).
    pub ecurve: usize,
    /// Utilization pattern index (0 = none).
    pub upat: usize,
    /// Energy price pattern index (0 = none).
    pub epat: usize,
    /// Unit energy cost.
    pub ecost: f64,
    /// Constant power rating (horsepower; 0 = none).
    pub power: f64,
    pub energy: EnergyStats,
}

impl Default for Pump {
    fn default() -> Self {
        Pump {
            link: 0,
            ptype: PumpType::NoCurve,
            q0: 0.0,
            qmax: 0.0,
            hmax: 0.0,
            h0: 0.0,
            r: 0.0,
            n: 0.0,
            hcurve: 0,
            ecurve: 0,
            upat: 0,
            epat: 0,
            ecost: 0.0,
            power: 0.0,
            energy: EnergyStats::default(),
        }
    }
}

/// Valve data referenced by a valve-type link.
#[derive(Debug, Clone, Default)]
pub(crate) struct Valve {
    /// Link index of the valve.
    pub link: usize,
}

//! Link-related API methods: pipes, pumps and valves.

use crate::epanet_error::{EPANETError, Result};
use crate::hydraul::{energy, leakage, timestep};
use crate::quality;
use crate::types::link::{LinkProperty, LinkStatus, LinkType, PumpType};
use crate::types::types::ActionCode;
use crate::units::{BIG, SEC_PER_DAY, TINY};
use crate::{PumpEnergyUsage, EPANET};

/// ## Link APIs
impl EPANET {
    /// Adds a link between two existing nodes (given by id).
    /// Returns the 1-based index of the new link.
    pub fn add_link(
        &mut self,
        id: &str,
        link_type: LinkType,
        from_node: &str,
        to_node: &str,
    ) -> Result<i32> {
        let n1 = self.get_node_index(from_node)? as usize;
        let n2 = self.get_node_index(to_node)? as usize;
        let index = self.network.add_link(id, link_type, n1, n2)?;
        Ok(index as i32)
    }

    /// Deletes a link. [`ActionCode::Conditional`] refuses the deletion if
    /// the link appears in a control.
    pub fn delete_link(&mut self, index: i32, action_code: ActionCode) -> Result<()> {
        let index = self.link_index(index)?;
        self.network.delete_link(index, action_code)
    }

    /// Gets the index of the link with the given id.
    pub fn get_link_index(&self, id: &str) -> Result<i32> {
        self.network
            .find_link(id)
            .map(|i| i as i32)
            .ok_or_else(|| EPANETError::UndefinedLink { id: id.to_string() })
    }

    /// Gets a link's id given its index.
    pub fn get_link_id(&self, index: i32) -> Result<String> {
        let index = self.link_index(index)?;
        Ok(self.network.links[index].id.clone())
    }

    /// Changes a link's id.
    pub fn set_link_id(&mut self, index: i32, id: &str) -> Result<()> {
        let index = self.link_index(index)?;
        crate::network::Network::check_id(id)?;
        if let Some(other) = self.network.find_link(id) {
            if other != index {
                return Err(EPANETError::DuplicateId { id: id.to_string() });
            }
        }
        self.network.links[index].id = id.to_string();
        Ok(())
    }

    /// Gets a link's type.
    pub fn get_link_type(&self, index: i32) -> Result<LinkType> {
        let index = self.link_index(index)?;
        Ok(self.network.links[index].ty)
    }

    /// Gets a link's start and end node indexes.
    pub fn get_link_nodes(&self, index: i32) -> Result<(i32, i32)> {
        let index = self.link_index(index)?;
        let link = &self.network.links[index];
        Ok((link.n1 as i32, link.n2 as i32))
    }

    /// Reassigns a link's end nodes; the adjacency lists follow.
    pub fn set_link_nodes(&mut self, index: i32, from_node: i32, to_node: i32) -> Result<()> {
        let index = self.link_index(index)?;
        let n1 = self.node_index(from_node)?;
        let n2 = self.node_index(to_node)?;
        if n1 == n2 {
            return Err(EPANETError::SameStartEndNodes {
                id: self.network.links[index].id.clone(),
            });
        }
        self.network.links[index].n1 = n1;
        self.network.links[index].n2 = n2;
        self.network.rebuild_adjacency();
        Ok(())
    }

    /// Sets the length, diameter, roughness and minor loss coefficient of
    /// a pipe in one call.
    pub fn set_pipe_data(
        &mut self,
        index: i32,
        length: f64,
        diameter: f64,
        roughness: f64,
        minor_loss: f64,
    ) -> Result<()> {
        self.set_link_value(index, LinkProperty::Length, length)?;
        self.set_link_value(index, LinkProperty::Diameter, diameter)?;
        self.set_link_value(index, LinkProperty::Roughness, roughness)?;
        self.set_link_value(index, LinkProperty::MinorLoss, minor_loss)
    }

    /// Retrieves a property value for a link.
    pub fn get_link_value(&self, index: i32, property: LinkProperty) -> Result<f64> {
        let index = self.link_index(index)?;
        let net = &self.network;
        let hyd = &self.hydraul;
        let link = &net.links[index];
        let pump = net.find_pump(index);

        // Hydraulic results stay readable after close_h; the state
        // vectors simply persist from the last run.
        let solved = hyd.link_flow.len() > index;

        let value = match property {
            LinkProperty::Diameter => link.diam,
            LinkProperty::Length => link.len,
            LinkProperty::Roughness => {
                if link.ty.is_pipe() {
                    link.kc
                } else {
                    0.0
                }
            }
            LinkProperty::MinorLoss => link.km,
            LinkProperty::InitStatus => (!link.status.is_closed()) as u32 as f64,
            LinkProperty::InitSetting => link.kc,
            LinkProperty::KBulk => link.kb * SEC_PER_DAY as f64,
            LinkProperty::KWall => link.kw * SEC_PER_DAY as f64,
            LinkProperty::Flow => {
                if !solved || hyd.link_status[index].is_closed() {
                    0.0
                } else {
                    hyd.link_flow[index]
                }
            }
            LinkProperty::Velocity => {
                if !solved || link.ty == LinkType::Pump {
                    0.0
                } else {
                    hyd.link_flow[index].abs() / link.area().max(TINY)
                }
            }
            LinkProperty::HeadLoss => {
                if !solved {
                    0.0
                } else {
                    hyd.node_head[link.n1] - hyd.node_head[link.n2]
                }
            }
            LinkProperty::Status => {
                if solved {
                    (!hyd.link_status[index].is_closed()) as u32 as f64
                } else {
                    (!link.status.is_closed()) as u32 as f64
                }
            }
            LinkProperty::Setting => {
                if solved {
                    hyd.link_setting[index]
                } else {
                    link.kc
                }
            }
            LinkProperty::Energy => {
                if solved && link.ty == LinkType::Pump {
                    energy::get_energy(self, index).0
                } else {
                    0.0
                }
            }
            LinkProperty::LinkQual => quality::avg_qual(self, index),
            LinkProperty::LinkPattern => {
                pump.map(|p| net.pumps[p].upat as f64).unwrap_or(0.0)
            }
            LinkProperty::PumpState => {
                if solved {
                    hyd.link_status[index] as u32 as f64
                } else {
                    link.status as u32 as f64
                }
            }
            LinkProperty::PumpEffic => {
                if solved && link.ty == LinkType::Pump {
                    energy::get_energy(self, index).1
                } else {
                    0.0
                }
            }
            LinkProperty::PumpPower => {
                pump.map(|p| net.pumps[p].power).unwrap_or(0.0)
            }
            LinkProperty::PumpHCurve => {
                pump.map(|p| net.pumps[p].hcurve as f64).unwrap_or(0.0)
            }
            LinkProperty::PumpECurve => {
                pump.map(|p| net.pumps[p].ecurve as f64).unwrap_or(0.0)
            }
            LinkProperty::PumpECost => pump.map(|p| net.pumps[p].ecost).unwrap_or(0.0),
            LinkProperty::PumpEPat => {
                pump.map(|p| net.pumps[p].epat as f64).unwrap_or(0.0)
            }
            LinkProperty::LinkInControl => net.link_in_controls(index) as u32 as f64,
            LinkProperty::GpvCurve => {
                if link.ty == LinkType::Gpv {
                    link.kc
                } else {
                    0.0
                }
            }
            LinkProperty::LeakArea => link.leak_area,
            LinkProperty::LeakExpan => link.leak_expan,
            LinkProperty::LinkLeakage => {
                if solved {
                    leakage::find_link_leakage(net, hyd, index)
                } else {
                    0.0
                }
            }
        };
        Ok(value)
    }

    /// Sets a property value for a link.
    pub fn set_link_value(&mut self, index: i32, property: LinkProperty, value: f64) -> Result<()> {
        let index = self.link_index(index)?;
        let ty = self.network.links[index].ty;
        match property {
            LinkProperty::Diameter => {
                if value <= 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.links[index].diam = value;
                self.refresh_resistance(index);
            }
            LinkProperty::Length => {
                if value <= 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.links[index].len = value;
                self.refresh_resistance(index);
            }
            LinkProperty::Roughness => {
                if value <= 0.0 || !ty.is_pipe() {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.links[index].kc = value;
                self.refresh_resistance(index);
            }
            LinkProperty::MinorLoss => {
                if value < 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.links[index].km = value;
            }
            LinkProperty::InitStatus => {
                if ty == LinkType::CvPipe {
                    return Err(EPANETError::ControlledCheckValve {
                        id: self.network.links[index].id.clone(),
                    });
                }
                self.network.links[index].status = if value == 0.0 {
                    LinkStatus::Closed
                } else {
                    LinkStatus::Open
                };
            }
            LinkProperty::InitSetting => {
                self.network.links[index].kc = value;
                if ty.is_valve() && ty != LinkType::Gpv {
                    self.network.links[index].status = LinkStatus::Active;
                }
                if ty.is_pipe() {
                    self.refresh_resistance(index);
                }
            }
            LinkProperty::KBulk => {
                self.network.links[index].kb = value / SEC_PER_DAY as f64;
            }
            LinkProperty::KWall => {
                self.network.links[index].kw = value / SEC_PER_DAY as f64;
            }
            LinkProperty::Status => {
                if ty == LinkType::CvPipe {
                    return Err(EPANETError::ControlledCheckValve {
                        id: self.network.links[index].id.clone(),
                    });
                }
                if self.hydraul.open_flag {
                    timestep::set_link_status(
                        &self.network,
                        &mut self.hydraul,
                        index,
                        value != 0.0,
                    );
                } else {
                    self.network.links[index].status = if value == 0.0 {
                        LinkStatus::Closed
                    } else {
                        LinkStatus::Open
                    };
                }
            }
            LinkProperty::Setting => {
                if self.hydraul.open_flag {
                    timestep::set_link_setting(&self.network, &mut self.hydraul, index, value);
                } else {
                    self.network.links[index].kc = value;
                }
            }
            LinkProperty::LinkPattern => {
                let p = self.pump_of(index)?;
                let pat = if value == 0.0 { 0 } else { self.pattern_index(value as i32)? };
                self.network.pumps[p].upat = pat;
            }
            LinkProperty::PumpPower => {
                if value <= 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                let p = self.pump_of(index)?;
                let pump = &mut self.network.pumps[p];
                pump.power = value;
                pump.ptype = PumpType::ConstHp;
                pump.hcurve = 0;
                pump.h0 = 0.0;
                pump.r = -8.814 * value;
                pump.n = -1.0;
                pump.hmax = BIG;
                pump.qmax = BIG;
                pump.q0 = 1.0;
            }
            LinkProperty::PumpHCurve => {
                let p = self.pump_of(index)?;
                let curve = if value == 0.0 { 0 } else { self.curve_index(value as i32)? };
                self.network.pumps[p].hcurve = curve;
                if curve > 0 {
                    self.update_pump_params(p)?;
                } else {
                    self.network.pumps[p].ptype = PumpType::NoCurve;
                }
            }
            LinkProperty::PumpECurve => {
                let p = self.pump_of(index)?;
                let curve = if value == 0.0 { 0 } else { self.curve_index(value as i32)? };
                self.network.pumps[p].ecurve = curve;
            }
            LinkProperty::PumpECost => {
                if value < 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                let p = self.pump_of(index)?;
                self.network.pumps[p].ecost = value;
            }
            LinkProperty::PumpEPat => {
                let p = self.pump_of(index)?;
                let pat = if value == 0.0 { 0 } else { self.pattern_index(value as i32)? };
                self.network.pumps[p].epat = pat;
            }
            LinkProperty::GpvCurve => {
                if ty != LinkType::Gpv {
                    return Err(EPANETError::InvalidParameterCode);
                }
                let curve = self.curve_index(value as i32)?;
                self.network.links[index].kc = curve as f64;
            }
            LinkProperty::LeakArea => {
                if value < 0.0 || !ty.is_pipe() {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.links[index].leak_area = value;
            }
            LinkProperty::LeakExpan => {
                if value < 0.0 || !ty.is_pipe() {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.links[index].leak_expan = value;
            }
            _ => return Err(EPANETError::InvalidParameterCode),
        }
        Ok(())
    }

    /// A pump's accumulated energy usage statistics for the current run.
    pub fn get_pump_energy(&self, index: i32) -> Result<PumpEnergyUsage> {
        let index = self.link_index(index)?;
        let p = self.pump_of(index)?;
        Ok(energy::usage_stats(self, p))
    }

    /// Average reaction rate within a pipe over the last quality step
    /// (concentration units per day).
    pub fn get_reaction_rate(&self, index: i32) -> Result<f64> {
        let index = self.link_index(index)?;
        Ok(self
            .quality
            .pipe_rate_coeff
            .get(index)
            .copied()
            .unwrap_or(0.0))
    }

    /// Darcy-Weisbach friction factor implied by a pipe's current flow
    /// and head loss.
    pub fn get_friction_factor(&self, index: i32) -> Result<f64> {
        let index = self.link_index(index)?;
        let link = &self.network.links[index];
        let hyd = &self.hydraul;
        if !link.ty.is_pipe() || hyd.link_flow.len() <= index {
            return Ok(0.0);
        }
        let q = hyd.link_flow[index].abs();
        if q < TINY || hyd.link_status[index].is_closed() {
            return Ok(0.0);
        }
        let v = q / link.area();
        let hloss = (hyd.node_head[link.n1] - hyd.node_head[link.n2]).abs();
        Ok(2.0 * 32.2 * link.diam * hloss / (link.len * v * v))
    }

    fn pump_of(&self, index: usize) -> Result<usize> {
        self.network
            .find_pump(index)
            .ok_or(EPANETError::InvalidParameterCode)
    }

    fn refresh_resistance(&mut self, index: usize) {
        if self.hydraul.open_flag {
            let formflag = self.hydraul.formflag;
            let hexp = self.hydraul.hexp;
            let rqtol = self.hydraul.rqtol;
            crate::hydraul::coeffs::resist_coeff(&mut self.network, formflag, hexp, rqtol, index);
        }
    }

    /// Derives a pump's head curve coefficients: a single point or a
    /// three-point curve starting at zero flow fits the power function
    /// `H = H0 - R*Q^N`; anything else becomes a custom curve.
    pub(crate) fn update_pump_params(&mut self, p: usize) -> Result<()> {
        let pump_link = self.network.pumps[p].link;
        let link_id = self.network.links[pump_link].id.clone();
        let hcurve = self.network.pumps[p].hcurve;
        if hcurve == 0 {
            return Ok(());
        }
        let curve = &self.network.curves[hcurve];
        let npts = curve.len();
        if npts == 0 {
            return Err(EPANETError::InvalidPumpCurve { id: link_id });
        }

        let fitted = if npts == 1 {
            let q1 = curve.x[0];
            let h1 = curve.y[0];
            Some((1.33334 * h1, h1, 0.0, q1, 2.0 * q1))
        } else if npts == 3 && curve.x[0] == 0.0 {
            Some((curve.y[0], curve.y[1], curve.y[2], curve.x[1], curve.x[2]))
        } else {
            None
        };

        match fitted {
            Some((h0, h1, h2, q1, q2)) => {
                let (a, b, c) = power_curve(h0, h1, h2, q1, q2)
                    .ok_or(EPANETError::InvalidPumpCurve { id: link_id })?;
                let pump = &mut self.network.pumps[p];
                pump.ptype = PumpType::PowerFunc;
                pump.h0 = -a;
                pump.r = -b;
                pump.n = c;
                pump.q0 = q1;
                pump.qmax = q2;
                pump.hmax = h0;
            }
            None => {
                // Custom curves must carry strictly decreasing heads.
                for w in curve.y.windows(2) {
                    if w[0] <= w[1] {
                        return Err(EPANETError::InvalidPumpCurve { id: link_id });
                    }
                }
                let q0 = curve.x[npts / 2];
                let qmax = curve.x[npts - 1];
                let hmax = curve.y[0];
                let pump = &mut self.network.pumps[p];
                pump.ptype = PumpType::Custom;
                pump.q0 = q0;
                pump.qmax = qmax;
                pump.hmax = hmax;
            }
        }
        Ok(())
    }
}

/// Fits the power function `H = a - b*Q^c` through a shutoff head, a
/// design point and a maximum-flow point. Returns None when the points
/// cannot produce a falling curve.
fn power_curve(h0: f64, h1: f64, h2: f64, q1: f64, q2: f64) -> std::option::Option<(f64, f64, f64)> {
    if h0 < TINY || h0 - h1 < TINY || h1 - h2 < TINY || q1 < TINY || q2 - q1 < TINY {
        return None;
    }
    let a = h0;
    let h4 = h0 - h1;
    let h5 = h0 - h2;
    let c = (h5 / h4).ln() / (q2 / q1).ln();
    if c <= 0.0 || c > 20.0 {
        return None;
    }
    let b = -h4 / q1.powf(c);
    if b >= 0.0 {
        return None;
    }
    Some((a, b, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn pipe_data_round_trips(ph_close: EPANET) {
        let mut ph = ph_close;
        build_two_node_net(&mut ph);
        let k = ph.get_link_index("P1").unwrap();
        ph.set_pipe_data(k, 1200.0, 1.0, 120.0, 0.5).unwrap();
        assert!(approx_eq(
            ph.get_link_value(k, LinkProperty::Length).unwrap(),
            1200.0,
            1e-12
        ));
        assert!(approx_eq(
            ph.get_link_value(k, LinkProperty::Roughness).unwrap(),
            120.0,
            1e-12
        ));
    }

    #[rstest]
    fn single_point_pump_curve_fits_a_power_function(ph_close: EPANET) {
        let mut ph = ph_close;
        build_two_node_net(&mut ph);
        let pump = ph.add_link("PU1", LinkType::Pump, "R1", "J1").unwrap();
        let curve = ph.add_curve("C1").unwrap();
        ph.set_curve(curve, &[1.0], &[100.0]).unwrap();
        ph.set_link_value(pump, LinkProperty::PumpHCurve, curve as f64)
            .unwrap();
        // Shutoff head is 4/3 of the design head.
        let p = ph.network.find_pump(pump as usize).unwrap();
        assert_eq!(ph.network.pumps[p].ptype, PumpType::PowerFunc);
        assert!(approx_eq(ph.network.pumps[p].hmax, 133.334, 1e-3));
    }

    #[rstest]
    fn rising_pump_curve_is_rejected(ph_close: EPANET) {
        let mut ph = ph_close;
        build_two_node_net(&mut ph);
        let pump = ph.add_link("PU1", LinkType::Pump, "R1", "J1").unwrap();
        let curve = ph.add_curve("C1").unwrap();
        ph.set_curve(curve, &[0.0, 2.0, 4.0], &[10.0, 50.0, 90.0])
            .unwrap();
        let err = ph
            .set_link_value(pump, LinkProperty::PumpHCurve, curve as f64)
            .unwrap_err();
        assert_eq!(err.code(), 227);
    }

    #[rstest]
    fn check_valve_status_cannot_be_forced(ph_close: EPANET) {
        let mut ph = ph_close;
        build_two_node_net(&mut ph);
        let cv = ph.add_link("CV1", LinkType::CvPipe, "R1", "J1").unwrap();
        let err = ph
            .set_link_value(cv, LinkProperty::Status, 0.0)
            .unwrap_err();
        assert_eq!(err.code(), 207);
    }
}

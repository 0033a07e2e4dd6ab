//! Node-related API methods: junctions, reservoirs and tanks.

use crate::epanet_error::{EPANETError, Result};
use crate::network::node::Source;
use crate::types::demand::DemandCategory;
use crate::types::node::{MixingModel, NodeProperty, NodeType, SourceType};
use crate::types::types::ActionCode;
use crate::units::SEC_PER_DAY;
use crate::EPANET;

use num_traits::FromPrimitive;
use std::f64::consts::PI;

/// ## Node APIs
impl EPANET {
    /// Adds a node to the project with a given id and type.
    /// Returns the 1-based index of the new node.
    pub fn add_node(&mut self, id: &str, node_type: NodeType) -> Result<i32> {
        let index = self.network.add_node(id, node_type)?;
        // A new junction slides in ahead of the tank block, so a trace
        // node in that block moves up by one.
        if node_type == NodeType::Junction && self.quality.trace_node >= index {
            self.quality.trace_node += 1;
        }
        Ok(index as i32)
    }

    /// Deletes a node from the project along with its connected links.
    /// [`ActionCode::Conditional`] refuses the deletion if the node or any
    /// of its links appears in a control.
    pub fn delete_node(&mut self, index: i32, action_code: ActionCode) -> Result<()> {
        let index = self.node_index(index)?;
        if self.quality.trace_node == index {
            return Err(EPANETError::InUseAsTraceNode {
                id: self.network.nodes[index].id.clone(),
            });
        }
        self.network.delete_node(index, action_code)?;
        if self.quality.trace_node > index {
            self.quality.trace_node -= 1;
        }
        Ok(())
    }

    /// Gets the index of the node with the given id.
    pub fn get_node_index(&self, id: &str) -> Result<i32> {
        self.network
            .find_node(id)
            .map(|i| i as i32)
            .ok_or_else(|| EPANETError::UndefinedNode { id: id.to_string() })
    }

    /// Gets a node's id given its index.
    pub fn get_node_id(&self, index: i32) -> Result<String> {
        let index = self.node_index(index)?;
        Ok(self.network.nodes[index].id.clone())
    }

    /// Changes a node's id.
    pub fn set_node_id(&mut self, index: i32, id: &str) -> Result<()> {
        let index = self.node_index(index)?;
        crate::network::Network::check_id(id)?;
        if let Some(other) = self.network.find_node(id) {
            if other != index {
                return Err(EPANETError::DuplicateId { id: id.to_string() });
            }
        }
        self.network.nodes[index].id = id.to_string();
        Ok(())
    }

    /// Gets a node's type.
    pub fn get_node_type(&self, index: i32) -> Result<NodeType> {
        let index = self.node_index(index)?;
        Ok(self.network.nodes[index].ty)
    }

    /// Sets the elevation, primary base demand and primary demand pattern
    /// of a junction in one call.
    pub fn set_junction_data(
        &mut self,
        index: i32,
        elev: f64,
        demand: f64,
        pattern_id: &str,
    ) -> Result<()> {
        let index = self.node_index(index)?;
        if self.network.nodes[index].ty != NodeType::Junction {
            return Err(EPANETError::InvalidParameterCode);
        }
        let pat = if pattern_id.is_empty() {
            0
        } else {
            self.network
                .find_pattern(pattern_id)
                .ok_or_else(|| EPANETError::UndefinedPattern {
                    id: pattern_id.to_string(),
                })?
        };
        let node = &mut self.network.nodes[index];
        node.el = elev;
        if node.demands.is_empty() {
            node.demands.push(DemandCategory::default());
        }
        node.demands[0].base_demand = demand;
        node.demands[0].pattern_index = pat as i32;
        Ok(())
    }

    /// Sets the properties of a tank: elevation, initial/minimum/maximum
    /// water levels, diameter, minimum volume and an optional volume
    /// curve id.
    #[allow(clippy::too_many_arguments)]
    pub fn set_tank_data(
        &mut self,
        index: i32,
        elev: f64,
        init_level: f64,
        min_level: f64,
        max_level: f64,
        diameter: f64,
        min_volume: f64,
        volume_curve: &str,
    ) -> Result<()> {
        let index = self.node_index(index)?;
        let Some(j) = self.network.find_tank(index) else {
            return Err(EPANETError::InvalidParameterCode);
        };
        if min_level < 0.0 || init_level < min_level || max_level < init_level {
            return Err(EPANETError::InvalidTankLevels {
                id: self.network.nodes[index].id.clone(),
            });
        }
        if diameter < 0.0 || min_volume < 0.0 {
            return Err(EPANETError::IllegalValue { value: diameter.min(min_volume) });
        }
        let vcurve = if volume_curve.is_empty() {
            0
        } else {
            self.network
                .find_curve(volume_curve)
                .ok_or_else(|| EPANETError::UndefinedCurve {
                    id: volume_curve.to_string(),
                })?
        };
        self.network.nodes[index].el = elev;
        let area = PI * diameter * diameter / 4.0;
        let tank = &mut self.network.tanks[j];
        tank.area = area;
        tank.hmin = elev + min_level;
        tank.hmax = elev + max_level;
        tank.h0 = elev + init_level;
        tank.vmin = if min_volume > 0.0 {
            min_volume
        } else {
            area * min_level
        };
        tank.vcurve = vcurve;
        if vcurve > 0 {
            // Effective area comes from the curve's slope at mid-range.
            let curve = &self.network.curves[vcurve];
            let n = curve.len();
            if n >= 2 {
                let dx = curve.x[n - 1] - curve.x[0];
                let dy = curve.y[n - 1] - curve.y[0];
                if dx > 0.0 {
                    self.network.tanks[j].area = dy / dx;
                }
            }
        }
        self.network.update_tank_volumes(j);
        Ok(())
    }

    /// Retrieves a property value for a node.
    pub fn get_node_value(&self, index: i32, property: NodeProperty) -> Result<f64> {
        let index = self.node_index(index)?;
        let net = &self.network;
        let hyd = &self.hydraul;
        let node = &net.nodes[index];
        let tank = net.find_tank(index);

        let tank_field = |f: &dyn Fn(&crate::network::Tank) -> f64| -> Result<f64> {
            tank.map(|j| f(&net.tanks[j]))
                .ok_or(EPANETError::InvalidParameterCode)
        };

        let value = match property {
            NodeProperty::Elevation => node.el,
            NodeProperty::BaseDemand => {
                node.demands.first().map(|d| d.base_demand).unwrap_or(0.0)
            }
            NodeProperty::Pattern => {
                node.demands.first().map(|d| d.pattern_index as f64).unwrap_or(0.0)
            }
            NodeProperty::Emitter => {
                if node.ke > 0.0 {
                    (1.0 / node.ke).powf(1.0 / hyd.qexp)
                } else {
                    0.0
                }
            }
            NodeProperty::InitQual => node.c0,
            NodeProperty::SourceQual => {
                node.source.as_ref().map(|s| s.c0).unwrap_or(0.0)
            }
            NodeProperty::SourcePat => {
                node.source.as_ref().map(|s| s.pat as f64).unwrap_or(0.0)
            }
            NodeProperty::SourceType => {
                node.source.as_ref().map(|s| s.ty as u32 as f64).unwrap_or(0.0)
            }
            NodeProperty::SourceMass => {
                node.source.as_ref().map(|s| s.smass).unwrap_or(0.0)
            }
            NodeProperty::TankLevel => {
                let j = tank.ok_or(EPANETError::InvalidParameterCode)?;
                // Results persist after close_h.
                if hyd.node_head.len() > index {
                    hyd.node_head[index] - node.el
                } else {
                    net.tanks[j].h0 - node.el
                }
            }
            NodeProperty::Demand => {
                if hyd.node_head.len() <= index {
                    0.0
                } else if index <= net.njuncs {
                    hyd.demand_flow[index] + hyd.emitter_flow[index] + hyd.leakage_flow[index]
                } else {
                    hyd.node_demand[index]
                }
            }
            NodeProperty::Head => hyd.node_head.get(index).copied().unwrap_or(0.0),
            NodeProperty::Pressure => {
                hyd.node_head.get(index).copied().unwrap_or(node.el) - node.el
            }
            NodeProperty::Quality => {
                if self.quality.node_qual.len() > index {
                    self.quality.node_qual[index]
                } else {
                    node.c0
                }
            }
            NodeProperty::InitVolume => tank_field(&|t| t.v0)?,
            NodeProperty::MixModel => tank_field(&|t| t.mix_model as u32 as f64)?,
            NodeProperty::MixZoneVol => tank_field(&|t| t.v1max())?,
            NodeProperty::TankDiam => tank_field(&|t| (4.0 * t.area / PI).sqrt())?,
            NodeProperty::MinVolume => tank_field(&|t| t.vmin)?,
            NodeProperty::VolCurve => tank_field(&|t| t.vcurve as f64)?,
            NodeProperty::MinLevel => tank_field(&|t| t.hmin)? - node.el,
            NodeProperty::MaxLevel => tank_field(&|t| t.hmax)? - node.el,
            NodeProperty::MixFraction => tank_field(&|t| t.v1frac)?,
            NodeProperty::TankKBulk => tank_field(&|t| t.kb * SEC_PER_DAY as f64)?,
            NodeProperty::TankVolume => tank_field(&|t| t.v)?,
            NodeProperty::MaxVolume => tank_field(&|t| t.vmax)?,
            NodeProperty::CanOverflow => tank_field(&|t| t.can_overflow as u32 as f64)?,
            NodeProperty::DemandDeficit => {
                if index <= net.njuncs && hyd.node_head.len() > index {
                    (hyd.full_demand[index] - hyd.demand_flow[index]).max(0.0)
                } else {
                    0.0
                }
            }
            NodeProperty::NodeInControl => net.node_in_controls(index) as u32 as f64,
            NodeProperty::EmitterFlow => hyd.emitter_flow.get(index).copied().unwrap_or(0.0),
            NodeProperty::LeakageFlow => hyd.leakage_flow.get(index).copied().unwrap_or(0.0),
            NodeProperty::DemandFlow => hyd.demand_flow.get(index).copied().unwrap_or(0.0),
            NodeProperty::FullDemand => hyd.full_demand.get(index).copied().unwrap_or(0.0),
        };
        Ok(value)
    }

    /// Sets a property value for a node.
    pub fn set_node_value(&mut self, index: i32, property: NodeProperty, value: f64) -> Result<()> {
        let index = self.node_index(index)?;
        match property {
            NodeProperty::Elevation => {
                if let Some(j) = self.network.find_tank(index) {
                    let dv = value - self.network.nodes[index].el;
                    self.network.nodes[index].el = value;
                    let tank = &mut self.network.tanks[j];
                    tank.hmin += dv;
                    tank.hmax += dv;
                    tank.h0 += dv;
                } else {
                    self.network.nodes[index].el = value;
                }
            }
            NodeProperty::BaseDemand => {
                let node = &mut self.network.nodes[index];
                if node.ty != NodeType::Junction {
                    return Err(EPANETError::InvalidParameterCode);
                }
                if node.demands.is_empty() {
                    node.demands.push(DemandCategory::default());
                }
                node.demands[0].base_demand = value;
            }
            NodeProperty::Pattern => {
                let pat = self.pattern_or_none(value)?;
                let node = &mut self.network.nodes[index];
                if node.demands.is_empty() {
                    node.demands.push(DemandCategory::default());
                }
                node.demands[0].pattern_index = pat as i32;
            }
            NodeProperty::Emitter => {
                if value < 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                let qexp = self.hydraul.qexp;
                self.network.nodes[index].ke = if value > 0.0 {
                    (1.0 / value).powf(qexp)
                } else {
                    0.0
                };
            }
            NodeProperty::InitQual => {
                if value < 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.network.nodes[index].c0 = value;
            }
            NodeProperty::SourceQual => {
                if value < 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                self.source_mut(index).c0 = value;
            }
            NodeProperty::SourcePat => {
                let pat = self.pattern_or_none(value)?;
                self.source_mut(index).pat = pat;
            }
            NodeProperty::SourceType => {
                let ty = SourceType::from_f64(value).ok_or(EPANETError::InvalidParameterCode)?;
                self.source_mut(index).ty = ty;
            }
            NodeProperty::TankLevel => {
                let Some(j) = self.network.find_tank(index) else {
                    return Err(EPANETError::InvalidParameterCode);
                };
                let el = self.network.nodes[index].el;
                self.network.tanks[j].h0 = el + value;
                self.network.update_tank_volumes(j);
                if self.hydraul.open_flag {
                    self.hydraul.node_head[index] = self.network.tanks[j].h0;
                }
            }
            NodeProperty::MixModel => {
                let j = self.tank_of(index)?;
                let model =
                    MixingModel::from_f64(value).ok_or(EPANETError::InvalidParameterCode)?;
                self.network.tanks[j].mix_model = model;
            }
            NodeProperty::MixFraction => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(EPANETError::IllegalValue { value });
                }
                let j = self.tank_of(index)?;
                self.network.tanks[j].v1frac = value;
            }
            NodeProperty::TankDiam => {
                if value <= 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                let j = self.tank_of(index)?;
                self.network.tanks[j].area = PI * value * value / 4.0;
                self.network.update_tank_volumes(j);
            }
            NodeProperty::MinVolume => {
                if value < 0.0 {
                    return Err(EPANETError::IllegalValue { value });
                }
                let j = self.tank_of(index)?;
                self.network.tanks[j].vmin = value;
                self.network.update_tank_volumes(j);
            }
            NodeProperty::VolCurve => {
                let j = self.tank_of(index)?;
                let curve = if value == 0.0 {
                    0
                } else {
                    self.curve_index(value as i32)?
                };
                self.network.tanks[j].vcurve = curve;
                self.network.update_tank_volumes(j);
            }
            NodeProperty::MinLevel => {
                let j = self.tank_of(index)?;
                let el = self.network.nodes[index].el;
                let tank = &mut self.network.tanks[j];
                tank.hmin = el + value;
                if tank.vcurve == 0 {
                    tank.vmin = tank.area * value;
                }
                self.network.update_tank_volumes(j);
            }
            NodeProperty::MaxLevel => {
                let j = self.tank_of(index)?;
                let el = self.network.nodes[index].el;
                self.network.tanks[j].hmax = el + value;
                self.network.update_tank_volumes(j);
            }
            NodeProperty::TankKBulk => {
                let j = self.tank_of(index)?;
                self.network.tanks[j].kb = value / SEC_PER_DAY as f64;
            }
            NodeProperty::CanOverflow => {
                let j = self.tank_of(index)?;
                self.network.tanks[j].can_overflow = value != 0.0;
            }
            _ => return Err(EPANETError::InvalidParameterCode),
        }
        Ok(())
    }

    fn tank_of(&self, index: usize) -> Result<usize> {
        self.network
            .find_tank(index)
            .filter(|&j| !self.network.tanks[j].is_reservoir())
            .ok_or(EPANETError::InvalidParameterCode)
    }

    fn source_mut(&mut self, index: usize) -> &mut Source {
        self.network.nodes[index].source.get_or_insert(Source {
            ty: SourceType::Concen,
            c0: 0.0,
            pat: 0,
            smass: 0.0,
        })
    }

    fn pattern_or_none(&self, value: f64) -> Result<usize> {
        if value == 0.0 {
            Ok(0)
        } else {
            self.pattern_index(value as i32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn node_round_trip(ph_close: EPANET) {
        let mut ph = ph_close;
        let idx = ph.add_node("J9", NodeType::Junction).unwrap();
        assert_eq!(ph.get_node_index("J9"), Ok(idx));
        assert_eq!(ph.get_node_id(idx).unwrap(), "J9");
        assert_eq!(ph.get_node_type(idx), Ok(NodeType::Junction));

        ph.set_node_id(idx, "J10").unwrap();
        assert_eq!(ph.get_node_id(idx).unwrap(), "J10");
        assert_eq!(
            ph.get_node_index("J9").unwrap_err().code(),
            203
        );
    }

    #[rstest]
    fn emitter_coefficient_round_trips(ph_close: EPANET) {
        let mut ph = ph_close;
        let idx = ph.add_node("J1", NodeType::Junction).unwrap();
        ph.set_node_value(idx, NodeProperty::Emitter, 0.5).unwrap();
        let v = ph.get_node_value(idx, NodeProperty::Emitter).unwrap();
        assert!(approx_eq(v, 0.5, 1e-9));
    }

    #[rstest]
    fn tank_geometry_follows_set_tank_data(ph_close: EPANET) {
        let mut ph = ph_close;
        let idx = ph.add_node("T1", NodeType::Tank).unwrap();
        ph.set_tank_data(idx, 100.0, 10.0, 0.0, 20.0, 4.0, 0.0, "")
            .unwrap();
        let area = ph.get_node_value(idx, NodeProperty::TankDiam).unwrap();
        assert!(approx_eq(area, 4.0, 1e-9));
        let v0 = ph.get_node_value(idx, NodeProperty::InitVolume).unwrap();
        assert!(approx_eq(v0, std::f64::consts::PI * 4.0 * 10.0, 1e-9));
        let vmax = ph.get_node_value(idx, NodeProperty::MaxVolume).unwrap();
        assert!(approx_eq(vmax, std::f64::consts::PI * 4.0 * 20.0, 1e-9));
    }

    #[rstest]
    fn invalid_tank_levels_are_rejected(ph_close: EPANET) {
        let mut ph = ph_close;
        let idx = ph.add_node("T1", NodeType::Tank).unwrap();
        let err = ph
            .set_tank_data(idx, 100.0, 30.0, 0.0, 20.0, 4.0, 0.0, "")
            .unwrap_err();
        assert_eq!(err.code(), 225);
    }

    #[rstest]
    fn conditional_delete_of_controlled_node_fails(ph: EPANET) {
        let mut ph = ph;
        // The fixture's control references the tank.
        let tank = ph.get_node_index("T1").unwrap();
        let err = ph.delete_node(tank, ActionCode::Conditional).unwrap_err();
        assert_eq!(err.code(), 261);
        // Nothing was deleted.
        assert_eq!(ph.get_node_index("T1"), Ok(tank));
    }
}

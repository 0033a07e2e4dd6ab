//! Demand category API methods. Each junction carries a list of demand
//! categories, each with a baseline value, a time pattern and an
//! optional name.

use crate::epanet_error::{EPANETError, Result};
use crate::types::demand::DemandCategory;
use crate::types::node::NodeType;
use crate::EPANET;

/// ## Nodal Demand APIs
impl EPANET {
    /// Number of demand categories at a junction.
    pub fn get_num_demands(&self, node_index: i32) -> Result<i32> {
        let index = self.node_index(node_index)?;
        Ok(self.network.nodes[index].demands.len() as i32)
    }

    /// Appends a demand category to a junction.
    pub fn add_demand(
        &mut self,
        node_index: i32,
        base_demand: f64,
        pattern_id: &str,
        name: &str,
    ) -> Result<()> {
        let index = self.node_index(node_index)?;
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
        self.network.nodes[index].demands.push(DemandCategory {
            base_demand,
            pattern_index: pat as i32,
            name: if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            },
        });
        Ok(())
    }

    /// Deletes a (1-based) demand category from a junction.
    pub fn delete_demand(&mut self, node_index: i32, demand_index: i32) -> Result<()> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        self.network.nodes[index].demands.remove(d);
        Ok(())
    }

    /// A demand category's baseline value.
    pub fn get_base_demand(&self, node_index: i32, demand_index: i32) -> Result<f64> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        Ok(self.network.nodes[index].demands[d].base_demand)
    }

    /// Changes a demand category's baseline value.
    pub fn set_base_demand(&mut self, node_index: i32, demand_index: i32, value: f64) -> Result<()> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        self.network.nodes[index].demands[d].base_demand = value;
        Ok(())
    }

    /// A demand category's time pattern index (0 = constant).
    pub fn get_demand_pattern(&self, node_index: i32, demand_index: i32) -> Result<i32> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        Ok(self.network.nodes[index].demands[d].pattern_index)
    }

    /// Changes a demand category's time pattern.
    pub fn set_demand_pattern(
        &mut self,
        node_index: i32,
        demand_index: i32,
        pattern_index: i32,
    ) -> Result<()> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        let pat = if pattern_index == 0 {
            0
        } else {
            self.pattern_index(pattern_index)?
        };
        self.network.nodes[index].demands[d].pattern_index = pat as i32;
        Ok(())
    }

    /// A demand category's name, if it has one.
    pub fn get_demand_name(&self, node_index: i32, demand_index: i32) -> Result<String> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        Ok(self.network.nodes[index].demands[d]
            .name
            .clone()
            .unwrap_or_default())
    }

    /// Names a demand category.
    pub fn set_demand_name(&mut self, node_index: i32, demand_index: i32, name: &str) -> Result<()> {
        let index = self.node_index(node_index)?;
        let d = self.demand_category(index, demand_index)?;
        self.network.nodes[index].demands[d].name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
        Ok(())
    }

    fn demand_category(&self, node: usize, demand_index: i32) -> Result<usize> {
        let n = self.network.nodes[node].demands.len();
        if demand_index >= 1 && demand_index as usize <= n {
            Ok(demand_index as usize - 1)
        } else {
            Err(EPANETError::DemandIndexOutOfRange {
                index: demand_index,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn demand_categories_accumulate(ph_close: EPANET) {
        let mut ph = ph_close;
        let j = ph.add_node("J1", NodeType::Junction).unwrap();
        ph.add_demand(j, 1.0, "", "domestic").unwrap();
        ph.add_demand(j, 0.5, "", "industrial").unwrap();
        assert_eq!(ph.get_num_demands(j), Ok(2));
        assert_eq!(ph.get_demand_name(j, 2).unwrap(), "industrial");
        assert_eq!(ph.get_base_demand(j, 1), Ok(1.0));

        ph.delete_demand(j, 1).unwrap();
        assert_eq!(ph.get_num_demands(j), Ok(1));
        assert_eq!(ph.get_demand_name(j, 1).unwrap(), "industrial");
    }
}

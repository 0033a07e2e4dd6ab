//! Time pattern API methods.

use crate::epanet_error::{EPANETError, Result};
use crate::network::Pattern;
use crate::EPANET;

/// ## Time Pattern APIs
impl EPANET {
    /// Adds a new (constant) time pattern, returning its index.
    pub fn add_pattern(&mut self, id: &str) -> Result<i32> {
        crate::network::Network::check_id(id)?;
        if self.network.find_pattern(id).is_some() {
            return Err(EPANETError::DuplicateId { id: id.to_string() });
        }
        self.network.patterns.push(Pattern::new(id));
        Ok(self.network.npatterns() as i32)
    }

    /// Deletes a time pattern; every reference to it reverts to the
    /// constant pattern and higher pattern indices slide down.
    pub fn delete_pattern(&mut self, index: i32) -> Result<()> {
        let index = self.pattern_index(index)?;
        self.network.patterns.remove(index);
        self.network.shift_pattern_refs(index);
        if self.hydraul.epat == index {
            self.hydraul.epat = 0;
        } else if self.hydraul.epat > index {
            self.hydraul.epat -= 1;
        }
        Ok(())
    }

    /// Gets the index of the pattern with the given id.
    pub fn get_pattern_index(&self, id: &str) -> Result<i32> {
        self.network
            .find_pattern(id)
            .map(|i| i as i32)
            .ok_or_else(|| EPANETError::UndefinedPattern { id: id.to_string() })
    }

    /// Gets a pattern's id given its index.
    pub fn get_pattern_id(&self, index: i32) -> Result<String> {
        let index = self.pattern_index(index)?;
        Ok(self.network.patterns[index].id.clone())
    }

    /// Number of periods in a pattern.
    pub fn get_pattern_len(&self, index: i32) -> Result<i32> {
        let index = self.pattern_index(index)?;
        Ok(self.network.patterns[index].factors.len() as i32)
    }

    /// Gets a pattern's multiplier for a given (1-based) period.
    pub fn get_pattern_value(&self, index: i32, period: i32) -> Result<f64> {
        let index = self.pattern_index(index)?;
        let factors = &self.network.patterns[index].factors;
        if period < 1 || period as usize > factors.len() {
            return Err(EPANETError::IllegalValue {
                value: period as f64,
            });
        }
        Ok(factors[period as usize - 1])
    }

    /// Sets a pattern's multiplier for a given (1-based) period.
    pub fn set_pattern_value(&mut self, index: i32, period: i32, value: f64) -> Result<()> {
        let index = self.pattern_index(index)?;
        if value < 0.0 {
            return Err(EPANETError::IllegalValue { value });
        }
        let factors = &mut self.network.patterns[index].factors;
        if period < 1 || period as usize > factors.len() {
            return Err(EPANETError::IllegalValue {
                value: period as f64,
            });
        }
        factors[period as usize - 1] = value;
        Ok(())
    }

    /// Replaces all of a pattern's multipliers.
    pub fn set_pattern(&mut self, index: i32, values: &[f64]) -> Result<()> {
        let index = self.pattern_index(index)?;
        if values.is_empty() {
            return Err(EPANETError::IllegalValue { value: 0.0 });
        }
        if let Some(&bad) = values.iter().find(|&&v| v < 0.0) {
            return Err(EPANETError::IllegalValue { value: bad });
        }
        self.network.patterns[index].factors = values.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn pattern_round_trip(ph_close: EPANET) {
        let mut ph = ph_close;
        let p = ph.add_pattern("PAT1").unwrap();
        ph.set_pattern(p, &[0.5, 1.0, 1.5]).unwrap();
        assert_eq!(ph.get_pattern_len(p), Ok(3));
        assert_eq!(ph.get_pattern_value(p, 3), Ok(1.5));
        ph.set_pattern_value(p, 2, 2.0).unwrap();
        assert_eq!(ph.get_pattern_value(p, 2), Ok(2.0));
    }

    #[rstest]
    fn deleting_a_pattern_rewrites_demand_references(ph_close: EPANET) {
        let mut ph = ph_close;
        use crate::types::node::{NodeProperty, NodeType};
        let j = ph.add_node("J1", NodeType::Junction).unwrap();
        let p1 = ph.add_pattern("PAT1").unwrap();
        let p2 = ph.add_pattern("PAT2").unwrap();
        ph.set_node_value(j, NodeProperty::Pattern, p2 as f64).unwrap();
        ph.delete_pattern(p1).unwrap();
        // The reference to PAT2 slid down by one.
        let v = ph.get_node_value(j, NodeProperty::Pattern).unwrap();
        assert_eq!(v as i32, ph.get_pattern_index("PAT2").unwrap());
    }
}

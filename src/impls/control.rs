//! Simple control API methods.

use crate::epanet_error::{EPANETError, Result};
use crate::types::control::{Control, ControlType};
use crate::types::link::LinkType;
use crate::EPANET;

/// ## Simple Control APIs
impl EPANET {
    /// Adds a simple control. For level triggers `node_index` names the
    /// controlling node and `level` the tank level or junction pressure;
    /// for timed triggers `level` holds the time in seconds. The setting
    /// is interpreted per link kind: 0/1 status for pipes, speed for
    /// pumps and the working setting for valves.
    pub fn add_control(
        &mut self,
        control_type: ControlType,
        link_index: i32,
        setting: f64,
        node_index: i32,
        level: f64,
    ) -> Result<i32> {
        let link = self.link_index(link_index)?;
        if self.network.links[link].ty == LinkType::CvPipe {
            return Err(EPANETError::ControlledCheckValve {
                id: self.network.links[link].id.clone(),
            });
        }
        let node = match control_type {
            ControlType::LowLevel | ControlType::HiLevel => self.node_index(node_index)?,
            ControlType::Timer | ControlType::TimeOfDay => 0,
        };
        if level < 0.0 && node == 0 {
            return Err(EPANETError::IllegalValue { value: level });
        }
        let index = self.network.controls.len() as i32 + 1;
        self.network.controls.push(Control {
            index,
            control_type,
            link_index: link as i32,
            setting,
            node_index: node as i32,
            level,
            enabled: true,
        });
        Ok(index)
    }

    /// Retrieves a simple control.
    pub fn get_control(&self, index: i32) -> Result<Control> {
        Ok(self.network.controls[self.control_slot(index)?].clone())
    }

    /// Replaces a simple control's parameters.
    pub fn set_control(
        &mut self,
        index: i32,
        control_type: ControlType,
        link_index: i32,
        setting: f64,
        node_index: i32,
        level: f64,
    ) -> Result<()> {
        let slot = self.control_slot(index)?;
        let link = self.link_index(link_index)?;
        let node = match control_type {
            ControlType::LowLevel | ControlType::HiLevel => self.node_index(node_index)?,
            ControlType::Timer | ControlType::TimeOfDay => 0,
        };
        let control = &mut self.network.controls[slot];
        control.control_type = control_type;
        control.link_index = link as i32;
        control.setting = setting;
        control.node_index = node as i32;
        control.level = level;
        Ok(())
    }

    /// Deletes a simple control; higher control indices slide down.
    pub fn delete_control(&mut self, index: i32) -> Result<()> {
        let slot = self.control_slot(index)?;
        self.network.controls.remove(slot);
        for (i, c) in self.network.controls.iter_mut().enumerate() {
            c.index = i as i32 + 1;
        }
        Ok(())
    }

    /// Enables or disables a simple control.
    pub fn set_control_enabled(&mut self, index: i32, enabled: bool) -> Result<()> {
        let slot = self.control_slot(index)?;
        self.network.controls[slot].enabled = enabled;
        Ok(())
    }

    fn control_slot(&self, index: i32) -> Result<usize> {
        if index >= 1 && index as usize <= self.network.controls.len() {
            Ok(index as usize - 1)
        } else {
            Err(EPANETError::ControlIndexOutOfRange { index })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn control_round_trip(ph: EPANET) {
        let mut ph = ph;
        let pump = ph.get_link_index("PU1").unwrap();
        let tank = ph.get_node_index("T1").unwrap();
        let c = ph
            .add_control(ControlType::HiLevel, pump, 0.0, tank, 80.0)
            .unwrap();
        let control = ph.get_control(c).unwrap();
        assert_eq!(control.control_type, ControlType::HiLevel);
        assert_eq!(control.link_index, pump);
        assert_eq!(control.node_index, tank);

        ph.delete_control(c).unwrap();
        assert!(ph.get_control(c).is_err() || ph.network.controls.len() < c as usize);
    }
}

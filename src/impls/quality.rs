//! Water quality analysis API methods. The quality solver runs off a
//! saved hydraulic solution, so hydraulics must be solved (or supplied
//! from a file) first.

use crate::epanet_error::{EPANETError, Result};
use crate::quality;
use crate::types::analysis::InitHydOption;
use crate::EPANET;

/// ## Water Quality Analysis APIs
impl EPANET {
    /// Opens the water quality solver. Requires a complete saved
    /// hydraulic solution.
    pub fn open_q(&mut self) -> Result<()> {
        self.quality.open_flag = false;
        if !self.hydraul.saved_flag {
            return Err(EPANETError::NoHydraulics);
        }
        quality::open_qual(self);
        Ok(())
    }

    /// Initializes the water quality analysis: initial concentrations,
    /// tank states and the quality clock. The save flag is accepted for
    /// toolkit compatibility; result files belong to external
    /// collaborators.
    pub fn init_q(&mut self, _save_flag: InitHydOption) -> Result<()> {
        if !self.quality.open_flag {
            return Err(EPANETError::QualityNotOpen);
        }
        quality::init_qual(self)
    }

    /// Retrieves hydraulic and water quality results at the current
    /// point in time. Returns the current simulation time in seconds.
    /// Used in a loop with `next_q` or `step_q`.
    pub fn run_q(&mut self) -> Result<u64> {
        if !self.quality.open_flag {
            return Err(EPANETError::QualityNotOpen);
        }
        quality::run_qual(self)
    }

    /// Advances the water quality simulation to the next hydraulic
    /// event. Returns the simulation time remaining (0 marks the end).
    pub fn next_q(&mut self) -> Result<u64> {
        if !self.quality.open_flag {
            return Err(EPANETError::QualityNotOpen);
        }
        quality::next_qual(self)
    }

    /// Advances the water quality simulation by a single quality time
    /// step. Returns the simulation time remaining (0 marks the end).
    pub fn step_q(&mut self) -> Result<u64> {
        if !self.quality.open_flag {
            return Err(EPANETError::QualityNotOpen);
        }
        quality::step_qual(self)
    }

    /// Runs a complete water quality analysis over the saved hydraulics.
    pub fn solve_q(&mut self) -> Result<()> {
        self.open_q()?;
        let result = (|| {
            self.init_q(InitHydOption::Save)?;
            loop {
                self.run_q()?;
                if self.next_q()? == 0 {
                    break;
                }
            }
            Ok(())
        })();
        self.close_q()?;
        result
    }

    /// Closes the water quality solver. Calling this twice is a no-op.
    pub fn close_q(&mut self) -> Result<()> {
        if self.quality.open_flag {
            quality::close_qual(self);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use crate::types::options::QualityType;
    use rstest::rstest;

    #[rstest]
    fn quality_requires_saved_hydraulics(ph: EPANET) {
        let mut ph = ph;
        let err = ph.open_q().unwrap_err();
        assert_eq!(err.code(), 104);
    }

    #[rstest]
    fn test_solve_q(ph: EPANET) {
        let mut ph = ph;
        ph.set_qual_type(QualityType::Chem, "Chlorine", "mg/L", "")
            .unwrap();
        assert_eq!(ph.solve_h(), Ok(()));
        assert_eq!(ph.solve_q(), Ok(()));
    }

    #[rstest]
    fn stepwise_quality_reaches_the_duration(ph: EPANET) {
        let mut ph = ph;
        ph.set_qual_type(QualityType::Age, "", "", "").unwrap();
        ph.solve_h().unwrap();
        ph.open_q().unwrap();
        ph.init_q(InitHydOption::NoSave).unwrap();
        loop {
            let t = ph.run_q().unwrap();
            let tleft = ph.step_q().unwrap();
            if tleft == 0 {
                assert!(t > 0);
                break;
            }
        }
        ph.close_q().unwrap();
    }
}

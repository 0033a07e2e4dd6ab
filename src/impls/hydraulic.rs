//! Hydraulic analysis API methods: opening, initializing, running,
//! stepping, saving and closing hydraulic analyses.

use crate::epanet_error::{EPANETError, Result};
use crate::hydraul::{coeffs, leakage, timestep};
use crate::types::analysis::InitHydOption;
use crate::types::link::{LinkType, PumpType};
use crate::EPANET;

/// ## Hydraulic Analysis APIs
impl EPANET {
    /// Opens the hydraulic solver: validates the network, computes link
    /// flow resistances, builds the sparse matrix structures and the
    /// leakage model. Must be called before `init_h`/`run_h`/`next_h`.
    pub fn open_h(&mut self) -> Result<()> {
        self.hydraul.open_flag = false;
        self.hydraul.saved_flag = false;
        self.hydraul.from_file = false;

        // A solvable network needs at least one junction and one fixed
        // grade node.
        if self.network.njuncs < 1 {
            return Err(EPANETError::NotEnoughNodes);
        }
        if self.network.ntanks() < 1 {
            return Err(EPANETError::NoTanksOrReservoirs);
        }
        for j in 1..=self.network.ntanks() {
            let tank = &self.network.tanks[j];
            if !tank.is_reservoir() && !(tank.hmin <= tank.h0 && tank.h0 <= tank.hmax) {
                return Err(EPANETError::InvalidTankLevels {
                    id: self.network.nodes[tank.node].id.clone(),
                });
            }
        }
        for p in 1..=self.network.npumps() {
            let pump = &self.network.pumps[p];
            if pump.ptype == PumpType::NoCurve && pump.power == 0.0 {
                return Err(EPANETError::NoPumpCurve {
                    id: self.network.links[pump.link].id.clone(),
                });
            }
        }
        for v in 1..=self.network.nvalves() {
            let k = self.network.valves[v].link;
            let link = &self.network.links[k];
            if link.ty == LinkType::Gpv {
                let curve = link.kc.round() as i32;
                let missing = || EPANETError::UndefinedCurve {
                    id: format!("head loss curve of valve {}", link.id),
                };
                let c = self.curve_index(curve).map_err(|_| missing())?;
                if self.network.curves[c].len() < 2 {
                    return Err(missing());
                }
            }
        }

        for k in 1..=self.network.nlinks() {
            coeffs::resist_coeff(
                &mut self.network,
                self.hydraul.formflag,
                self.hydraul.hexp,
                self.hydraul.rqtol,
                k,
            );
        }
        self.hydraul.open(&self.network);
        leakage::open_leakage(&self.network, &mut self.hydraul);
        Ok(())
    }

    /// Initializes the network prior to running a hydraulic analysis:
    /// tank levels, link status and settings, the simulation clock, and
    /// (per `init_flag`) link flows and result saving.
    pub fn init_h(&mut self, init_flag: InitHydOption) -> Result<()> {
        if !self.hydraul.open_flag {
            return Err(EPANETError::HydraulicsNotOpen);
        }
        self.hydraul.saved_flag = false;
        self.hydraul.save_flag = init_flag.saves();
        if self.hydraul.save_flag {
            self.hydfile.start(&self.network, self.times.dur);
        }
        self.hydraul
            .init(&mut self.network, &mut self.times, init_flag.reinits_flows());
        Ok(())
    }

    /// Computes a hydraulic solution for the current point in time.
    /// Returns the current simulation time in seconds. Used in a loop
    /// with `next_h` to run an extended period simulation.
    pub fn run_h(&mut self) -> Result<u64> {
        if !self.hydraul.open_flag {
            return Err(EPANETError::HydraulicsNotOpen);
        }
        timestep::run_hyd(self)
    }

    /// Determines the length of the next hydraulic time step, saves the
    /// current results, and advances the simulation clock. Returns the
    /// step taken; 0 marks the end of the simulation.
    pub fn next_h(&mut self) -> Result<u64> {
        if !self.hydraul.open_flag {
            return Err(EPANETError::HydraulicsNotOpen);
        }
        timestep::next_hyd(self)
    }

    /// Runs a complete hydraulic analysis, saving results to the scratch
    /// hydraulics file for use by a water quality analysis.
    pub fn solve_h(&mut self) -> Result<()> {
        self.open_h()?;
        let result = (|| {
            self.init_h(InitHydOption::SaveAndInit)?;
            loop {
                self.run_h()?;
                if self.next_h()? == 0 {
                    break;
                }
            }
            Ok(())
        })();
        self.close_h()?;
        result
    }

    /// Saves the scratch hydraulics to a named binary file for reuse by
    /// `use_hydraulics_file`.
    pub fn save_hydraulics_file(&self, file_name: &str) -> Result<()> {
        if !self.hydraul.saved_flag {
            return Err(EPANETError::NoHydraulics);
        }
        self.hydfile.save_to(file_name)
    }

    /// Supplies the project's hydraulics from a previously saved binary
    /// hydraulics file instead of a new hydraulic analysis.
    pub fn use_hydraulics_file(&mut self, file_name: &str) -> Result<()> {
        let dur = self.hydfile.load_from(file_name, &self.network)?;
        if dur != self.times.dur {
            return Err(EPANETError::InvalidHydFile);
        }
        self.hydraul.saved_flag = true;
        self.hydraul.from_file = true;
        Ok(())
    }

    /// Closes the hydraulic solver. Saved hydraulic results remain
    /// available to the water quality solver. Calling this twice is a
    /// no-op.
    pub fn close_h(&mut self) -> Result<()> {
        self.hydraul.open_flag = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use crate::types::node::NodeProperty;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    fn test_solve_h(ph: EPANET) {
        let mut ph = ph;
        assert_eq!(ph.solve_h(), Ok(()));
    }

    #[rstest]
    fn test_hyd_step(ph: EPANET) {
        let mut ph = ph;
        assert_eq!(ph.open_h(), Ok(()));
        assert_eq!(ph.init_h(InitHydOption::NoSave), Ok(()));

        loop {
            let run_result = ph.run_h();
            assert!(run_result.is_ok());

            let step_result = ph.next_h();
            assert!(step_result.is_ok());

            if step_result.unwrap() == 0 {
                break;
            }
        }

        assert_eq!(ph.close_h(), Ok(()));
        // close_h is idempotent.
        assert_eq!(ph.close_h(), Ok(()));
    }

    #[rstest]
    fn zero_duration_run_solves_once(ph: EPANET) {
        let mut ph = ph;
        ph.set_time_param(crate::types::options::TimeParameter::Duration, 0)
            .unwrap();
        ph.open_h().unwrap();
        ph.init_h(InitHydOption::Save).unwrap();
        let mut solves = 0;
        loop {
            ph.run_h().unwrap();
            solves += 1;
            if ph.next_h().unwrap() == 0 {
                break;
            }
        }
        assert_eq!(solves, 1);
    }

    #[rstest]
    fn solver_requires_open_h(ph: EPANET) {
        let mut ph = ph;
        let err = ph.run_h().unwrap_err();
        assert_eq!(err.code(), 103);
    }

    #[rstest]
    fn junction_flow_balance_holds_at_convergence(ph: EPANET) {
        let mut ph = ph;
        ph.open_h().unwrap();
        ph.init_h(InitHydOption::NoSave).unwrap();
        ph.run_h().unwrap();

        for i in 1..=ph.network.njuncs {
            let mut net_inflow = 0.0;
            for entry in ph.network.adj.of(i).to_vec() {
                let k = entry.link;
                if ph.hydraul.link_status[k].is_closed() {
                    continue;
                }
                let q = ph.hydraul.link_flow[k];
                if ph.network.links[k].n2 == i {
                    net_inflow += q;
                } else {
                    net_inflow -= q;
                }
            }
            let outflow = ph.get_node_value(i as i32, NodeProperty::Demand).unwrap();
            assert!(
                (net_inflow - outflow).abs() < 5.0e-3,
                "junction {} unbalanced: {} vs {}",
                i,
                net_inflow,
                outflow
            );
        }
    }

    #[rstest]
    fn hydraulics_file_round_trips(ph: EPANET) {
        let mut ph = ph;
        ph.solve_h().unwrap();

        let hyd_file = std::env::temp_dir().join("test_savefile.hyd");
        let path = hyd_file.to_str().unwrap();
        ph.save_hydraulics_file(path).unwrap();
        assert!(hyd_file.exists(), "hydraulics file was not created");

        assert_eq!(ph.use_hydraulics_file(path), Ok(()));
        assert_eq!(ph.solve_q(), Ok(()));

        fs::remove_file(hyd_file).expect("failed to remove the hydraulics file");
    }
}

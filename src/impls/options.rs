//! Analysis option, time parameter and statistic API methods.

use crate::epanet_error::{EPANETError, Result};
use crate::hydraul::{coeffs, timestep};
use crate::types::analysis::QualityAnalysisInfo;
use crate::types::options::{
    AnalysisStatistic, DemandModel, FlowUnits, HeadLossType, Option as OptionCode, PressUnits,
    QualityType, StatusReport, TimeParameter,
};
use crate::units::{DIFFUS, VISCOS};
use crate::{FlowBalance, EPANET};

use num_traits::FromPrimitive;

/// ## Analysis Option APIs
impl EPANET {
    /// Retrieves the value of an analysis option.
    pub fn get_option(&self, option: OptionCode) -> Result<f64> {
        let hyd = &self.hydraul;
        let qual = &self.quality;
        let v = match option {
            OptionCode::Trials => hyd.maxiter as f64,
            OptionCode::Accuracy => hyd.hacc,
            OptionCode::Tolerance => qual.ctol,
            OptionCode::EmitExpon => {
                if hyd.qexp > 0.0 {
                    1.0 / hyd.qexp
                } else {
                    0.0
                }
            }
            OptionCode::DemandMult => hyd.dmult,
            OptionCode::HeadError => hyd.head_error_limit,
            OptionCode::FlowChange => hyd.flow_change_limit,
            OptionCode::HeadLossForm => hyd.formflag as u32 as f64,
            OptionCode::GlobalEffic => hyd.epump,
            OptionCode::GlobalPrice => hyd.ecost,
            OptionCode::GlobalPattern => hyd.epat as f64,
            OptionCode::DemandCharge => hyd.dcost,
            OptionCode::SpGravity => hyd.spgrav,
            OptionCode::SpViscos => hyd.viscos / VISCOS,
            OptionCode::Unbalanced => hyd.extra_iter as f64,
            OptionCode::CheckFreq => hyd.checkfreq as f64,
            OptionCode::MaxCheck => hyd.maxcheck as f64,
            OptionCode::DampLimit => hyd.damplimit,
            OptionCode::SpDiffus => qual.diffus / DIFFUS,
            OptionCode::BulkOrder => qual.bulk_order,
            OptionCode::WallOrder => qual.wall_order,
            OptionCode::TankOrder => qual.tank_order,
            OptionCode::ConcenLimit => qual.climit,
            OptionCode::EmitBackflow => hyd.emit_backflow as u32 as f64,
            OptionCode::PressUnits => self.press_units as u32 as f64,
            OptionCode::StatusReport => hyd.statflag as u32 as f64,
        };
        Ok(v)
    }

    /// Sets the value of an analysis option.
    pub fn set_option(&mut self, option: OptionCode, value: f64) -> Result<()> {
        let illegal = |value: f64| EPANETError::IllegalValue { value };
        match option {
            OptionCode::Trials => {
                if value < 1.0 {
                    return Err(illegal(value));
                }
                self.hydraul.maxiter = value as usize;
            }
            OptionCode::Accuracy => {
                if value <= 0.0 {
                    return Err(illegal(value));
                }
                self.hydraul.hacc = value;
            }
            OptionCode::Tolerance => {
                if value < 0.0 {
                    return Err(illegal(value));
                }
                self.quality.ctol = value;
            }
            OptionCode::EmitExpon => {
                if value <= 0.0 {
                    return Err(illegal(value));
                }
                self.hydraul.qexp = 1.0 / value;
            }
            OptionCode::DemandMult => {
                if value < 0.0 {
                    return Err(illegal(value));
                }
                self.hydraul.dmult = value;
            }
            OptionCode::HeadError => self.hydraul.head_error_limit = value.max(0.0),
            OptionCode::FlowChange => self.hydraul.flow_change_limit = value.max(0.0),
            OptionCode::HeadLossForm => {
                let form = HeadLossType::from_f64(value)
                    .ok_or(EPANETError::InvalidParameterCode)?;
                self.hydraul.formflag = form;
                if self.hydraul.open_flag {
                    for k in 1..=self.network.nlinks() {
                        coeffs::resist_coeff(
                            &mut self.network,
                            form,
                            self.hydraul.hexp,
                            self.hydraul.rqtol,
                            k,
                        );
                    }
                }
            }
            OptionCode::GlobalEffic => {
                if !(1.0..=100.0).contains(&value) {
                    return Err(illegal(value));
                }
                self.hydraul.epump = value;
            }
            OptionCode::GlobalPrice => self.hydraul.ecost = value.max(0.0),
            OptionCode::GlobalPattern => {
                self.hydraul.epat = if value == 0.0 {
                    0
                } else {
                    self.pattern_index(value as i32)?
                };
            }
            OptionCode::DemandCharge => self.hydraul.dcost = value.max(0.0),
            OptionCode::SpGravity => {
                if value <= 0.0 {
                    return Err(illegal(value));
                }
                self.hydraul.spgrav = value;
            }
            OptionCode::SpViscos => {
                if value <= 0.0 {
                    return Err(illegal(value));
                }
                self.hydraul.viscos = value * VISCOS;
            }
            OptionCode::Unbalanced => {
                self.hydraul.extra_iter = if value < 0.0 { -1 } else { value as i32 };
            }
            OptionCode::CheckFreq => {
                if value < 1.0 {
                    return Err(illegal(value));
                }
                self.hydraul.checkfreq = value as usize;
            }
            OptionCode::MaxCheck => {
                if value < 1.0 {
                    return Err(illegal(value));
                }
                self.hydraul.maxcheck = value as usize;
            }
            OptionCode::DampLimit => self.hydraul.damplimit = value.max(0.0),
            OptionCode::SpDiffus => {
                if value < 0.0 {
                    return Err(illegal(value));
                }
                self.quality.diffus = value * DIFFUS;
            }
            OptionCode::BulkOrder => self.quality.bulk_order = value,
            OptionCode::WallOrder => {
                if value != 0.0 && value != 1.0 {
                    return Err(illegal(value));
                }
                self.quality.wall_order = value;
            }
            OptionCode::TankOrder => self.quality.tank_order = value,
            OptionCode::ConcenLimit => {
                if value < 0.0 {
                    return Err(illegal(value));
                }
                self.quality.climit = value;
            }
            OptionCode::EmitBackflow => self.hydraul.emit_backflow = value != 0.0,
            OptionCode::PressUnits => {
                self.press_units =
                    PressUnits::from_f64(value).ok_or(EPANETError::InvalidParameterCode)?;
            }
            OptionCode::StatusReport => {
                self.hydraul.statflag =
                    StatusReport::from_f64(value).ok_or(EPANETError::InvalidParameterCode)?;
            }
        }
        Ok(())
    }

    /// The project's flow units.
    pub fn get_flow_units(&self) -> FlowUnits {
        self.flow_units
    }

    /// Changes the project's flow units. Purely descriptive; values cross
    /// the API in internal units.
    pub fn set_flow_units(&mut self, units: FlowUnits) {
        self.flow_units = units;
    }

    /// Retrieves a time parameter (seconds).
    pub fn get_time_param(&self, param: TimeParameter) -> Result<u64> {
        let t = &self.times;
        let v = match param {
            TimeParameter::Duration => t.dur,
            TimeParameter::HydStep => t.hstep,
            TimeParameter::QualStep => t.qstep,
            TimeParameter::PatternStep => t.pstep,
            TimeParameter::PatternStart => t.pstart,
            TimeParameter::ReportStep => t.rstep,
            TimeParameter::ReportStart => t.rstart,
            TimeParameter::RuleStep => t.rulestep,
            TimeParameter::Statistic => 0,
            TimeParameter::Periods => {
                if t.dur >= t.rstart {
                    (t.dur - t.rstart) / t.rstep + 1
                } else {
                    0
                }
            }
            TimeParameter::StartTime => t.tstart,
            TimeParameter::HTime => t.htime,
            TimeParameter::QTime => t.qtime,
            TimeParameter::HaltFlag => t.haltflag as u64,
            TimeParameter::NextEvent => timestep::next_tank_event(self).0,
            TimeParameter::NextEventTank => timestep::next_tank_event(self).1 as u64,
        };
        Ok(v)
    }

    /// Sets a time parameter (seconds).
    pub fn set_time_param(&mut self, param: TimeParameter, value: u64) -> Result<()> {
        let t = &mut self.times;
        match param {
            TimeParameter::Duration => t.dur = value,
            TimeParameter::HydStep => {
                if value == 0 {
                    return Err(EPANETError::IllegalValue { value: 0.0 });
                }
                t.hstep = value;
                t.rulestep = t.rulestep.min(value).max(1);
            }
            TimeParameter::QualStep => {
                if value == 0 {
                    return Err(EPANETError::IllegalValue { value: 0.0 });
                }
                t.qstep = value;
            }
            TimeParameter::PatternStep => {
                if value == 0 {
                    return Err(EPANETError::IllegalValue { value: 0.0 });
                }
                t.pstep = value;
            }
            TimeParameter::PatternStart => t.pstart = value,
            TimeParameter::ReportStep => {
                if value == 0 {
                    return Err(EPANETError::IllegalValue { value: 0.0 });
                }
                t.rstep = value;
            }
            TimeParameter::ReportStart => t.rstart = value,
            TimeParameter::RuleStep => {
                if value == 0 {
                    return Err(EPANETError::IllegalValue { value: 0.0 });
                }
                t.rulestep = value;
            }
            TimeParameter::StartTime => t.tstart = value % crate::units::SEC_PER_DAY,
            _ => return Err(EPANETError::InvalidParameterCode),
        }
        Ok(())
    }

    /// The kind of water quality analysis to perform. For chemical
    /// analysis `chem_name`/`chem_units` label the constituent; for
    /// source tracing `trace_node` names the traced node.
    pub fn set_qual_type(
        &mut self,
        qual_type: QualityType,
        chem_name: &str,
        chem_units: &str,
        trace_node: &str,
    ) -> Result<()> {
        self.quality.qualflag = qual_type;
        match qual_type {
            QualityType::Chem => {
                self.quality.chem_name = chem_name.to_string();
                self.quality.chem_units = chem_units.to_string();
            }
            QualityType::Age => {
                self.quality.chem_name = "Age".to_string();
                self.quality.chem_units = "hrs".to_string();
            }
            QualityType::Trace => {
                let node = self.get_node_index(trace_node)?;
                self.quality.trace_node = node as usize;
                self.quality.chem_name = "Trace".to_string();
                self.quality.chem_units = "%".to_string();
            }
            QualityType::None => {}
        }
        Ok(())
    }

    /// Describes the current water quality analysis.
    pub fn get_qual_info(&self) -> QualityAnalysisInfo {
        QualityAnalysisInfo {
            quality_type: self.quality.qualflag,
            chem_name: self.quality.chem_name.clone(),
            chem_units: self.quality.chem_units.clone(),
            trace_node_index: self.quality.trace_node as i32,
        }
    }

    /// The demand model and its pressure-dependent parameters.
    pub fn get_demand_model(&self) -> (DemandModel, f64, f64, f64) {
        let hyd = &self.hydraul;
        (hyd.demand_model, hyd.pmin, hyd.preq, hyd.pexp)
    }

    /// Selects demand-driven or pressure-driven analysis. Under PDA,
    /// `pmin` and `preq` bound the pressure range over which demand
    /// varies and `pexp` is the delivery exponent.
    pub fn set_demand_model(
        &mut self,
        model: DemandModel,
        pmin: f64,
        preq: f64,
        pexp: f64,
    ) -> Result<()> {
        if preq < pmin || pexp <= 0.0 {
            return Err(EPANETError::IllegalValue { value: pexp });
        }
        let hyd = &mut self.hydraul;
        hyd.demand_model = model;
        hyd.pmin = pmin;
        hyd.preq = preq;
        hyd.pexp = pexp;
        Ok(())
    }

    /// Retrieves a computed analysis statistic.
    pub fn get_statistic(&self, statistic: AnalysisStatistic) -> f64 {
        let hyd = &self.hydraul;
        match statistic {
            AnalysisStatistic::Iterations => hyd.iterations as f64,
            AnalysisStatistic::RelativeError => hyd.relative_error,
            AnalysisStatistic::MaxHeadError => hyd.max_head_error,
            AnalysisStatistic::MaxFlowChange => hyd.max_flow_change,
            AnalysisStatistic::MassBalance => self.quality.mass_balance.ratio,
            AnalysisStatistic::DeficientNodes => hyd.deficient_nodes as f64,
            AnalysisStatistic::DemandReduction => hyd.demand_reduction,
            AnalysisStatistic::LeakageLoss => hyd.leakage_loss,
        }
    }

    /// The flow balance accumulated over the most recent hydraulic run.
    pub fn get_flow_balance(&self) -> FlowBalance {
        self.hydraul.flow_balance
    }

    /// Network-wide reaction totals: bulk, wall and tank mass reacted
    /// plus mass added by sources, averaged per day of simulation.
    pub fn get_reaction_totals(&self) -> (f64, f64, f64, f64) {
        let dur = if self.times.dur > 0 {
            self.times.dur as f64
        } else {
            1.0
        };
        let per_day = crate::units::SEC_PER_DAY as f64 / dur;
        let q = &self.quality;
        (
            q.wbulk * per_day,
            q.wwall * per_day,
            q.wtank * per_day,
            q.wsource * per_day,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    fn every_option_round_trips(ph_close: EPANET) {
        let mut ph = ph_close;
        for option in OptionCode::iter() {
            let v = ph.get_option(option).unwrap();
            ph.set_option(option, v).unwrap();
            assert_eq!(ph.get_option(option), Ok(v), "{:?}", option);
        }
    }

    #[rstest]
    fn emitter_exponent_is_stored_as_its_reciprocal(ph_close: EPANET) {
        let mut ph = ph_close;
        ph.set_option(OptionCode::EmitExpon, 0.5).unwrap();
        assert_eq!(ph.get_option(OptionCode::EmitExpon), Ok(0.5));
        assert!(approx_eq(ph.hydraul.qexp, 2.0, 1e-12));
    }

    #[rstest]
    fn zero_time_steps_are_rejected(ph_close: EPANET) {
        let mut ph = ph_close;
        let err = ph.set_time_param(TimeParameter::HydStep, 0).unwrap_err();
        assert_eq!(err.code(), 202);
    }
}

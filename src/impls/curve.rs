//! Data curve API methods.

use crate::epanet_error::{EPANETError, Result};
use crate::network::Curve;
use crate::types::curve::CurveType;
use crate::EPANET;

use num_traits::FromPrimitive;

/// ## Data Curve APIs
impl EPANET {
    /// Adds a new (empty, generic) data curve, returning its index.
    pub fn add_curve(&mut self, id: &str) -> Result<i32> {
        crate::network::Network::check_id(id)?;
        if self.network.find_curve(id).is_some() {
            return Err(EPANETError::DuplicateId { id: id.to_string() });
        }
        self.network.curves.push(Curve::new(id));
        Ok(self.network.ncurves() as i32)
    }

    /// Deletes a data curve; objects referencing it lose the reference
    /// and higher curve indices slide down.
    pub fn delete_curve(&mut self, index: i32) -> Result<()> {
        let index = self.curve_index(index)?;
        self.network.curves.remove(index);
        self.network.shift_curve_refs(index);
        Ok(())
    }

    /// Gets the index of the curve with the given id.
    pub fn get_curve_index(&self, id: &str) -> Result<i32> {
        self.network
            .find_curve(id)
            .map(|i| i as i32)
            .ok_or_else(|| EPANETError::UndefinedCurve { id: id.to_string() })
    }

    /// Gets a curve's id given its index.
    pub fn get_curve_id(&self, index: i32) -> Result<String> {
        let index = self.curve_index(index)?;
        Ok(self.network.curves[index].id.clone())
    }

    /// Number of points on a curve.
    pub fn get_curve_len(&self, index: i32) -> Result<i32> {
        let index = self.curve_index(index)?;
        Ok(self.network.curves[index].len() as i32)
    }

    /// A curve's assigned type.
    pub fn get_curve_type(&self, index: i32) -> Result<CurveType> {
        let index = self.curve_index(index)?;
        Ok(self.network.curves[index].ctype)
    }

    /// Assigns a curve's type by code.
    pub fn set_curve_type(&mut self, index: i32, curve_type: CurveType) -> Result<()> {
        let index = self.curve_index(index)?;
        self.network.curves[index].ctype = curve_type;
        Ok(())
    }

    /// Gets the (x, y) coordinates of a curve's (1-based) point.
    pub fn get_curve_value(&self, index: i32, point: i32) -> Result<(f64, f64)> {
        let index = self.curve_index(index)?;
        let curve = &self.network.curves[index];
        if point < 1 || point as usize > curve.len() {
            return Err(EPANETError::IllegalValue { value: point as f64 });
        }
        let p = point as usize - 1;
        Ok((curve.x[p], curve.y[p]))
    }

    /// Replaces a curve's data points; x-values must strictly increase.
    pub fn set_curve(&mut self, index: i32, x: &[f64], y: &[f64]) -> Result<()> {
        let index = self.curve_index(index)?;
        if x.is_empty() || x.len() != y.len() {
            return Err(EPANETError::IllegalValue { value: x.len() as f64 });
        }
        if x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EPANETError::NonIncreasingCurve {
                id: self.network.curves[index].id.clone(),
            });
        }
        let curve = &mut self.network.curves[index];
        curve.x = x.to_vec();
        curve.y = y.to_vec();
        // Re-derive coefficients of any pump using this curve.
        for p in 1..=self.network.npumps() {
            if self.network.pumps[p].hcurve == index {
                self.update_pump_params(p)?;
            }
        }
        Ok(())
    }

    /// Looks a curve up by piecewise-linear interpolation, clamped at its
    /// endpoints.
    pub fn get_curve_interp(&self, index: i32, x: f64) -> Result<f64> {
        let index = self.curve_index(index)?;
        Ok(self.network.curves[index].interp(x))
    }

    /// Sets a curve's type from a numeric code.
    pub fn set_curve_type_code(&mut self, index: i32, code: i32) -> Result<()> {
        let ty = CurveType::from_i32(code).ok_or(EPANETError::InvalidParameterCode)?;
        self.set_curve_type(index, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn curve_round_trip(ph_close: EPANET) {
        let mut ph = ph_close;
        let c = ph.add_curve("C1").unwrap();
        ph.set_curve(c, &[0.0, 5.0, 10.0], &[100.0, 80.0, 40.0]).unwrap();
        assert_eq!(ph.get_curve_len(c), Ok(3));
        assert_eq!(ph.get_curve_value(c, 2), Ok((5.0, 80.0)));
        assert!(approx_eq(ph.get_curve_interp(c, 7.5).unwrap(), 60.0, 1e-12));
        // Clamped beyond the endpoints.
        assert!(approx_eq(ph.get_curve_interp(c, 50.0).unwrap(), 40.0, 1e-12));
    }

    #[rstest]
    fn non_increasing_x_values_are_rejected(ph_close: EPANET) {
        let mut ph = ph_close;
        let c = ph.add_curve("C1").unwrap();
        let err = ph.set_curve(c, &[0.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err.code(), 230);
    }
}

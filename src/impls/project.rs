//! Project-level API methods.

use crate::epanet_error::Result;
use crate::types::types::CountType;
use crate::types::MAX_TITLE_SIZE;
use crate::EPANET;

/// ## Project APIs
impl EPANET {
    /// Number of objects of a given class in the project.
    pub fn get_count(&self, count_type: CountType) -> Result<i32> {
        let n = match count_type {
            CountType::NodeCount => self.network.nnodes(),
            CountType::TankCount => self.network.ntanks(),
            CountType::LinkCount => self.network.nlinks(),
            CountType::PatCount => self.network.npatterns(),
            CountType::CurveCount => self.network.ncurves(),
            CountType::ControlCount => self.network.controls.len(),
            CountType::RuleCount => self.network.rules.len(),
        };
        Ok(n as i32)
    }

    /// The project's title lines.
    pub fn get_title(&self) -> &[String] {
        &self.title
    }

    /// Replaces the project's title lines (up to three are kept).
    pub fn set_title(&mut self, lines: &[&str]) {
        self.title = lines
            .iter()
            .take(3)
            .map(|l| {
                let mut s = l.to_string();
                s.truncate(MAX_TITLE_SIZE);
                s
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use rstest::rstest;

    #[rstest]
    fn counts_track_network_contents(ph: EPANET) {
        assert_eq!(ph.get_count(CountType::NodeCount), Ok(4));
        assert_eq!(ph.get_count(CountType::TankCount), Ok(2));
        assert_eq!(ph.get_count(CountType::LinkCount), Ok(4));
    }

    #[rstest]
    fn titles_are_capped_at_three_lines(ph_close: EPANET) {
        let mut ph = ph_close;
        ph.set_title(&["a", "b", "c", "d"]);
        assert_eq!(ph.get_title().len(), 3);
    }
}

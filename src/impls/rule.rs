//! Rule-based control API methods.

use crate::epanet_error::{EPANETError, Result};
use crate::types::link::LinkType;
use crate::types::rule::{ActionClause, Premise, Rule, RuleObject, RuleStatus};
use crate::units::MISSING;
use crate::EPANET;

/// ## Rule-Based Control APIs
impl EPANET {
    /// Adds a rule-based control. Premises must reference existing
    /// objects; actions cannot target check valves and cannot assign a
    /// numeric setting to a GPV. A numeric setting on a pipe converts to
    /// an open/closed status action.
    pub fn add_rule(&mut self, mut rule: Rule) -> Result<i32> {
        crate::network::Network::check_id(&rule.rule_id)?;
        if self
            .network
            .rules
            .iter()
            .any(|r| r.rule_id == rule.rule_id)
        {
            return Err(EPANETError::DuplicateId {
                id: rule.rule_id.clone(),
            });
        }
        for p in &rule.premises {
            match p.rule_object {
                RuleObject::Node => {
                    self.node_index(p.object_index)?;
                }
                RuleObject::Link => {
                    self.link_index(p.object_index)?;
                }
                RuleObject::System => {}
            }
        }
        for action in rule
            .then_actions
            .iter_mut()
            .chain(rule.else_actions.iter_mut())
        {
            let k = self.link_index(action.link_index)?;
            let ty = self.network.links[k].ty;
            if ty == LinkType::CvPipe {
                return Err(EPANETError::ControlledCheckValve {
                    id: self.network.links[k].id.clone(),
                });
            }
            if action.setting != MISSING {
                if action.setting < 0.0 {
                    return Err(EPANETError::IllegalValue {
                        value: action.setting,
                    });
                }
                if ty == LinkType::Gpv {
                    return Err(EPANETError::IllegalValue {
                        value: action.setting,
                    });
                }
                // A setting on a pipe is really a status action.
                if ty == LinkType::Pipe {
                    action.status = Some(if action.setting == 0.0 {
                        RuleStatus::IsClosed
                    } else {
                        RuleStatus::IsOpen
                    });
                    action.setting = MISSING;
                }
            }
        }
        self.network.rules.push(rule);
        Ok(self.network.rules.len() as i32)
    }

    /// Retrieves a rule-based control.
    pub fn get_rule(&self, index: i32) -> Result<Rule> {
        Ok(self.network.rules[self.rule_slot(index)?].clone())
    }

    /// Gets a rule's label.
    pub fn get_rule_id(&self, index: i32) -> Result<String> {
        Ok(self.network.rules[self.rule_slot(index)?].rule_id.clone())
    }

    /// Deletes a rule; higher rule indices slide down.
    pub fn delete_rule(&mut self, index: i32) -> Result<()> {
        let slot = self.rule_slot(index)?;
        self.network.rules.remove(slot);
        Ok(())
    }

    /// Changes a rule's priority.
    pub fn set_rule_priority(&mut self, index: i32, priority: f64) -> Result<()> {
        let slot = self.rule_slot(index)?;
        self.network.rules[slot].priority = priority;
        Ok(())
    }

    /// Enables or disables a rule.
    pub fn set_rule_enabled(&mut self, index: i32, enabled: bool) -> Result<()> {
        let slot = self.rule_slot(index)?;
        self.network.rules[slot].enabled = enabled;
        Ok(())
    }

    /// Counts of a rule's premises, THEN actions and ELSE actions.
    pub fn get_rule_sizes(&self, index: i32) -> Result<(i32, i32, i32)> {
        let rule = &self.network.rules[self.rule_slot(index)?];
        Ok((
            rule.premises.len() as i32,
            rule.then_actions.len() as i32,
            rule.else_actions.len() as i32,
        ))
    }

    /// Retrieves one of a rule's premises (1-based).
    pub fn get_premise(&self, index: i32, premise: i32) -> Result<Premise> {
        let rule = &self.network.rules[self.rule_slot(index)?];
        rule.premises
            .get(premise as usize - 1)
            .cloned()
            .ok_or(EPANETError::RuleIndexOutOfRange { index: premise })
    }

    /// Retrieves one of a rule's THEN actions (1-based).
    pub fn get_then_action(&self, index: i32, action: i32) -> Result<ActionClause> {
        let rule = &self.network.rules[self.rule_slot(index)?];
        rule.then_actions
            .get(action as usize - 1)
            .cloned()
            .ok_or(EPANETError::RuleIndexOutOfRange { index: action })
    }

    /// Retrieves one of a rule's ELSE actions (1-based).
    pub fn get_else_action(&self, index: i32, action: i32) -> Result<ActionClause> {
        let rule = &self.network.rules[self.rule_slot(index)?];
        rule.else_actions
            .get(action as usize - 1)
            .cloned()
            .ok_or(EPANETError::RuleIndexOutOfRange { index: action })
    }

    fn rule_slot(&self, index: i32) -> Result<usize> {
        if index >= 1 && index as usize <= self.network.rules.len() {
            Ok(index as usize - 1)
        } else {
            Err(EPANETError::RuleIndexOutOfRange { index })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::*;
    use crate::types::rule::{LogicalOperator, RuleOperator, RuleVariable};
    use rstest::rstest;

    fn sample_rule(ph: &EPANET) -> Rule {
        let tank = ph.get_node_index("T1").unwrap();
        let pump = ph.get_link_index("PU1").unwrap();
        Rule {
            rule_id: "R1".to_string(),
            premises: vec![Premise {
                logical_operator: LogicalOperator::If,
                rule_object: RuleObject::Node,
                object_index: tank,
                variable: RuleVariable::Level,
                rule_operator: RuleOperator::Below,
                status: None,
                value: 30.0,
            }],
            then_actions: vec![ActionClause {
                link_index: pump,
                status: Some(RuleStatus::IsOpen),
                setting: crate::units::MISSING,
            }],
            else_actions: vec![],
            priority: 1.0,
            enabled: true,
        }
    }

    #[rstest]
    fn rule_round_trip(ph: EPANET) {
        let mut ph = ph;
        let rule = sample_rule(&ph);
        let r = ph.add_rule(rule).unwrap();
        assert_eq!(ph.get_rule_id(r).unwrap(), "R1");
        assert_eq!(ph.get_rule_sizes(r), Ok((1, 1, 0)));
        let p = ph.get_premise(r, 1).unwrap();
        assert_eq!(p.variable, RuleVariable::Level);

        ph.delete_rule(r).unwrap();
        assert_eq!(ph.get_rule_sizes(r).unwrap_err().code(), 257);
    }

    #[rstest]
    fn pipe_setting_actions_become_status_actions(ph: EPANET) {
        let mut ph = ph;
        let pipe = ph.get_link_index("P1").unwrap();
        let mut rule = sample_rule(&ph);
        rule.then_actions = vec![ActionClause {
            link_index: pipe,
            status: None,
            setting: 0.0,
        }];
        let r = ph.add_rule(rule).unwrap();
        let action = ph.get_then_action(r, 1).unwrap();
        assert_eq!(action.status, Some(RuleStatus::IsClosed));
        assert_eq!(action.setting, crate::units::MISSING);
    }
}

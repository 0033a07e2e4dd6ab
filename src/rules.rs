//! Rule-based control engine.
//!
//! At each rule evaluation boundary every rule's premise list is checked
//! against a snapshot of the hydraulic state with short-circuit semantics;
//! THEN or ELSE actions collect on one action list where higher-priority
//! rules displace lower ones targeting the same link, and the surviving
//! actions are applied atomically.

use crate::hydraul::timestep::{set_link_setting, set_link_status};
use crate::types::link::LinkStatus;
use crate::types::options::StatusReport;
use crate::types::rule::{
    ActionClause, LogicalOperator, Premise, RuleObject, RuleOperator, RuleStatus, RuleVariable,
};
use crate::units::{MISSING, SEC_PER_DAY, TINY};
use crate::EPANET;

use tracing::debug;

/// One pending action, tagged with the rule that produced it.
struct ActItem {
    rule: usize,
    action: ActionClause,
}

/// Evaluates all rules over the interval ending at the current time and
/// applies the winning actions. Returns the number of actions that
/// actually changed a link.
pub(crate) fn check_rules(pr: &mut EPANET, dt: u64) -> usize {
    // Start of the rule evaluation time interval; clock premises test the
    // half-open interval (time1 - 1, htime].
    let time1 = pr.times.htime.saturating_sub(dt) + 1;

    let mut act_list: Vec<ActItem> = Vec::new();
    for ri in 0..pr.network.rules.len() {
        if !pr.network.rules[ri].enabled {
            continue;
        }
        let fired = eval_premises(pr, ri, time1);
        let rule = &pr.network.rules[ri];
        let actions = if fired {
            rule.then_actions.clone()
        } else {
            rule.else_actions.clone()
        };
        for action in actions {
            update_act_list(pr, &mut act_list, ri, action);
        }
    }
    take_actions(pr, &act_list)
}

/// Adds a rule's action to the pending list unless a rule of higher
/// priority (or an equal-priority earlier rule) already targets the link.
fn update_act_list(pr: &EPANET, list: &mut Vec<ActItem>, ri: usize, action: ActionClause) {
    for item in list.iter_mut() {
        if item.action.link_index == action.link_index {
            if pr.network.rules[ri].priority > pr.network.rules[item.rule].priority {
                item.rule = ri;
                item.action = action;
            }
            return;
        }
    }
    list.push(ActItem { rule: ri, action });
}

/// Checks a rule's premises with short-circuit semantics: AND chains stop
/// at the first false premise, OR premises re-enable the chain.
fn eval_premises(pr: &EPANET, ri: usize, time1: u64) -> bool {
    let mut result = true;
    for p in &pr.network.rules[ri].premises {
        if p.logical_operator == LogicalOperator::Or {
            if !result {
                result = check_premise(pr, p, time1);
            }
        } else {
            if !result {
                return false;
            }
            result = check_premise(pr, p, time1);
        }
    }
    result
}

fn check_premise(pr: &EPANET, p: &Premise, time1: u64) -> bool {
    if p.variable == RuleVariable::Time || p.variable == RuleVariable::ClockTime {
        check_time(pr, p, time1)
    } else if p.status.is_some() {
        check_status(pr, p)
    } else {
        check_value(pr, p)
    }
}

/// Checks a premise over the system clock. Equality tests fire when the
/// premise time falls inside the evaluation interval, so each clock
/// condition fires exactly once per boundary crossing.
fn check_time(pr: &EPANET, p: &Premise, time1: u64) -> bool {
    let (t1, t2) = match p.variable {
        RuleVariable::Time => (time1 as i64, pr.times.htime as i64),
        RuleVariable::ClockTime => (
            ((time1 + pr.times.tstart) % SEC_PER_DAY) as i64,
            ((pr.times.htime + pr.times.tstart) % SEC_PER_DAY) as i64,
        ),
        _ => return false,
    };

    let x = p.value as i64;
    match p.rule_operator.canonical() {
        RuleOperator::Lt => t2 < x,
        RuleOperator::Le => t2 <= x,
        RuleOperator::Gt => t2 > x,
        RuleOperator::Ge => t2 >= x,
        RuleOperator::Eq | RuleOperator::Ne => {
            // A wrap-around interval (e.g. 11 pm to 1 am) straddles midnight.
            let inside = if t2 < t1 {
                x >= t1 || x <= t2
            } else {
                x >= t1 && x <= t2
            };
            (p.rule_operator.canonical() == RuleOperator::Eq) == inside
        }
        _ => false,
    }
}

/// Checks a premise over a link's discrete status.
fn check_status(pr: &EPANET, p: &Premise) -> bool {
    let k = p.object_index as usize;
    if k == 0 || k > pr.network.nlinks() {
        return false;
    }
    let s = pr.hydraul.link_status[k];
    let current = if s.is_closed() {
        RuleStatus::IsClosed
    } else if s == LinkStatus::Active {
        RuleStatus::IsActive
    } else {
        RuleStatus::IsOpen
    };
    let Some(target) = p.status else {
        return false;
    };
    match p.rule_operator.canonical() {
        RuleOperator::Eq => current == target,
        RuleOperator::Ne => current != target,
        _ => false,
    }
}

/// Checks a numerical premise, with a 0.001 tolerance on comparisons.
fn check_value(pr: &EPANET, p: &Premise) -> bool {
    const TOL: f64 = 1.0e-3;
    let net = &pr.network;
    let hyd = &pr.hydraul;
    let i = p.object_index as usize;

    let x = match p.variable {
        RuleVariable::Demand => {
            if p.rule_object == RuleObject::System {
                hyd.dsystem
            } else {
                hyd.node_demand[i]
            }
        }
        RuleVariable::Head | RuleVariable::Grade => hyd.node_head[i],
        RuleVariable::Pressure | RuleVariable::Level => hyd.node_head[i] - net.nodes[i].el,
        RuleVariable::Flow => hyd.link_flow[i].abs(),
        RuleVariable::Setting => {
            if hyd.link_setting[i] == MISSING {
                return false;
            }
            hyd.link_setting[i]
        }
        RuleVariable::FillTime => {
            let Some(j) = net.find_tank(i) else { return false };
            if net.tanks[j].is_reservoir() || hyd.node_demand[i] <= TINY {
                return false;
            }
            (net.tanks[j].vmax - net.tanks[j].v) / hyd.node_demand[i]
        }
        RuleVariable::DrainTime => {
            let Some(j) = net.find_tank(i) else { return false };
            if net.tanks[j].is_reservoir() || hyd.node_demand[i] >= -TINY {
                return false;
            }
            (net.tanks[j].vmin - net.tanks[j].v) / hyd.node_demand[i]
        }
        _ => return false,
    };

    match p.rule_operator.canonical() {
        RuleOperator::Eq => (x - p.value).abs() <= TOL,
        RuleOperator::Ne => (x - p.value).abs() >= TOL,
        RuleOperator::Lt => x <= p.value + TOL,
        RuleOperator::Le => x <= p.value - TOL,
        RuleOperator::Gt => x >= p.value - TOL,
        RuleOperator::Ge => x >= p.value + TOL,
        _ => false,
    }
}

/// Applies the surviving actions, returning how many changed a link.
fn take_actions(pr: &mut EPANET, list: &[ActItem]) -> usize {
    const TOL: f64 = 1.0e-3;
    let mut n = 0;
    for item in list {
        let a = &item.action;
        let k = a.link_index as usize;
        if k == 0 || k > pr.network.nlinks() {
            continue;
        }
        let s = pr.hydraul.link_status[k];
        let v = pr.hydraul.link_setting[k];
        let x = a.setting;
        let mut changed = false;

        if a.status == Some(RuleStatus::IsOpen) && s.is_closed() {
            set_link_status(&pr.network, &mut pr.hydraul, k, true);
            changed = true;
        } else if a.status == Some(RuleStatus::IsClosed) && !s.is_closed() {
            set_link_status(&pr.network, &mut pr.hydraul, k, false);
            changed = true;
        } else if x != MISSING && (x - v).abs() > TOL {
            set_link_setting(&pr.network, &mut pr.hydraul, k, x);
            changed = true;
        }

        if changed {
            n += 1;
            if pr.hydraul.statflag != StatusReport::NoReport {
                debug!(
                    rule = %pr.network.rules[item.rule].rule_id,
                    link = %pr.network.links[k].id,
                    "rule action taken"
                );
            }
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::test_utils::fixtures::{ph, ph_close};
    use crate::types::analysis::InitHydOption;
    use crate::types::rule::{ActionClause, Rule, RuleObject};
    use crate::EPANET;

    fn clock_premise(op: RuleOperator, value: f64) -> Premise {
        Premise {
            logical_operator: LogicalOperator::If,
            rule_object: RuleObject::System,
            object_index: 0,
            variable: RuleVariable::Time,
            rule_operator: op,
            status: None,
            value,
        }
    }

    #[test]
    fn clock_equality_fires_once_per_boundary_crossing() {
        let mut pr = ph(ph_close());
        let p = clock_premise(RuleOperator::Eq, 7200.0);

        // Evaluation interval (3601, 7200] contains 7200.
        pr.times.htime = 7200;
        assert!(check_time(&pr, &p, 7200 - 3600 + 1));

        // The next interval no longer does.
        pr.times.htime = 10800;
        assert!(!check_time(&pr, &p, 10800 - 3600 + 1));
    }

    fn pump_rule(pr: &EPANET, id: &str, priority: f64, open: bool) -> Rule {
        let pump = pr.get_link_index("PU1").unwrap();
        Rule {
            rule_id: id.to_string(),
            premises: vec![clock_premise(RuleOperator::Ge, 0.0)],
            then_actions: vec![ActionClause {
                link_index: pump,
                status: Some(if open {
                    RuleStatus::IsOpen
                } else {
                    RuleStatus::IsClosed
                }),
                setting: MISSING,
            }],
            else_actions: vec![],
            priority,
            enabled: true,
        }
    }

    #[test]
    fn higher_priority_rule_wins_a_link_conflict() {
        let mut pr = ph(ph_close());
        let close_rule = pump_rule(&pr, "CLOSE", 1.0, false);
        let open_rule = pump_rule(&pr, "OPEN", 2.0, true);
        pr.add_rule(close_rule).unwrap();
        pr.add_rule(open_rule).unwrap();

        pr.open_h().unwrap();
        pr.init_h(InitHydOption::NoSave).unwrap();
        let pump = pr.get_link_index("PU1").unwrap() as usize;
        pr.hydraul.link_status[pump] = LinkStatus::Closed;

        pr.times.htime = 60;
        let n = check_rules(&mut pr, 60);
        assert_eq!(n, 1);
        assert_eq!(pr.hydraul.link_status[pump], LinkStatus::Open);
    }

    #[test]
    fn or_premises_reenable_a_failed_chain() {
        let mut pr = ph(ph_close());
        let mut rule = pump_rule(&pr, "R1", 1.0, false);
        // A failing premise followed by an OR that succeeds.
        rule.premises = vec![
            clock_premise(RuleOperator::Ge, 1.0e9),
            Premise {
                logical_operator: LogicalOperator::Or,
                ..clock_premise(RuleOperator::Ge, 0.0)
            },
        ];
        pr.add_rule(rule).unwrap();

        pr.open_h().unwrap();
        pr.init_h(InitHydOption::NoSave).unwrap();
        pr.times.htime = 60;
        let n = check_rules(&mut pr, 60);
        assert_eq!(n, 1);
        let pump = pr.get_link_index("PU1").unwrap() as usize;
        assert!(pr.hydraul.link_status[pump].is_closed());
    }
}

//! The network data model: object tables with dense 1-based indices,
//! junctions ordered before tanks and reservoirs, plus the derived node
//! incidence lists.

pub(crate) mod adjacency;
pub(crate) mod curve;
pub(crate) mod link;
pub(crate) mod node;
pub(crate) mod pattern;

use crate::epanet_error::{EPANETError, Result};
use crate::types::link::{LinkStatus, LinkType};
use crate::types::node::NodeType;
use crate::types::rule::RuleObject;
use crate::types::types::ActionCode;
use crate::types::{Control, Rule, MAX_ID_SIZE};

pub(crate) use adjacency::Adjacency;
pub(crate) use curve::Curve;
pub(crate) use link::{Link, Pump, Valve};
pub(crate) use node::{Node, Tank};
pub(crate) use pattern::Pattern;

#[derive(Debug)]
pub(crate) struct Network {
    /// Nodes, 1-based; indices 1..=njuncs are junctions, the rest are
    /// tanks/reservoirs in the same order as `tanks`.
    pub nodes: Vec<Node>,
    pub njuncs: usize,
    /// Tank/reservoir records, 1-based; `tanks[i].node == njuncs + i`.
    pub tanks: Vec<Tank>,
    /// Links, 1-based.
    pub links: Vec<Link>,
    /// Pump records, 1-based.
    pub pumps: Vec<Pump>,
    /// Valve records, 1-based.
    pub valves: Vec<Valve>,
    /// Time patterns, 1-based; index 0 is the built-in constant pattern.
    pub patterns: Vec<Pattern>,
    /// Data curves, 1-based.
    pub curves: Vec<Curve>,
    /// Simple controls, 0-based.
    pub controls: Vec<Control>,
    /// Rule-based controls, 0-based.
    pub rules: Vec<Rule>,
    /// Node incidence lists, rebuilt on any topology change.
    pub adj: Adjacency,
}

impl Network {
    pub fn new() -> Self {
        Network {
            nodes: vec![Node::default()],
            njuncs: 0,
            tanks: vec![Tank::default()],
            links: vec![Link::default()],
            pumps: vec![Pump::default()],
            valves: vec![Valve::default()],
            patterns: vec![Pattern::new("")],
            curves: vec![Curve::new("")],
            controls: Vec::new(),
            rules: Vec::new(),
            adj: Adjacency::default(),
        }
    }

    pub fn nnodes(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn ntanks(&self) -> usize {
        self.tanks.len() - 1
    }

    pub fn nlinks(&self) -> usize {
        self.links.len() - 1
    }

    pub fn npumps(&self) -> usize {
        self.pumps.len() - 1
    }

    pub fn nvalves(&self) -> usize {
        self.valves.len() - 1
    }

    pub fn npatterns(&self) -> usize {
        self.patterns.len() - 1
    }

    pub fn ncurves(&self) -> usize {
        self.curves.len() - 1
    }

    pub fn rebuild_adjacency(&mut self) {
        self.adj = Adjacency::build(self.nnodes(), &self.links);
    }

    // ----- lookups -----

    pub fn find_node(&self, id: &str) -> std::option::Option<usize> {
        self.nodes.iter().skip(1).position(|n| n.id == id).map(|p| p + 1)
    }

    pub fn find_link(&self, id: &str) -> std::option::Option<usize> {
        self.links.iter().skip(1).position(|l| l.id == id).map(|p| p + 1)
    }

    pub fn find_pattern(&self, id: &str) -> std::option::Option<usize> {
        self.patterns.iter().skip(1).position(|p| p.id == id).map(|p| p + 1)
    }

    pub fn find_curve(&self, id: &str) -> std::option::Option<usize> {
        self.curves.iter().skip(1).position(|c| c.id == id).map(|p| p + 1)
    }

    /// Tank record index for node `node`, if the node is a tank/reservoir.
    pub fn find_tank(&self, node: usize) -> std::option::Option<usize> {
        if node > self.njuncs && node <= self.nnodes() {
            Some(node - self.njuncs)
        } else {
            None
        }
    }

    /// Pump record index for link `link`.
    pub fn find_pump(&self, link: usize) -> std::option::Option<usize> {
        self.pumps.iter().skip(1).position(|p| p.link == link).map(|p| p + 1)
    }

    /// Valve record index for link `link`.
    pub fn find_valve(&self, link: usize) -> std::option::Option<usize> {
        self.valves.iter().skip(1).position(|v| v.link == link).map(|p| p + 1)
    }

    pub fn node_type(&self, node: usize) -> NodeType {
        self.nodes[node].ty
    }

    /// Validates a new object ID: length, reserved characters, no blanks.
    pub fn check_id(id: &str) -> Result<()> {
        let ok = !id.is_empty()
            && id.len() <= MAX_ID_SIZE
            && !id.contains(|c: char| c.is_whitespace() || c == ';' || c == '"');
        if ok {
            Ok(())
        } else {
            Err(EPANETError::InvalidId { id: id.to_string() })
        }
    }

    // ----- structural editing -----

    /// Adds a node of the given type, returning its new 1-based index.
    /// Junctions are inserted ahead of the tank/reservoir block, so existing
    /// tank node indices shift up by one.
    pub fn add_node(&mut self, id: &str, ty: NodeType) -> Result<usize> {
        Self::check_id(id)?;
        if self.find_node(id).is_some() {
            return Err(EPANETError::DuplicateId { id: id.to_string() });
        }
        let node = Node {
            id: id.to_string(),
            ty,
            ..Node::default()
        };
        let index;
        match ty {
            NodeType::Junction => {
                index = self.njuncs + 1;
                self.nodes.insert(index, node);
                self.njuncs += 1;
                self.shift_node_refs(index, 1);
                for tank in self.tanks.iter_mut().skip(1) {
                    tank.node += 1;
                }
            }
            NodeType::Reservoir | NodeType::Tank => {
                index = self.nodes.len();
                self.nodes.push(node);
                let mut tank = Tank {
                    node: index,
                    ..Tank::default()
                };
                if ty == NodeType::Tank {
                    // A unit-area cylinder so the tank is usable before
                    // set_tank_data supplies real geometry.
                    tank.area = 1.0;
                    tank.hmax = crate::units::BIG;
                    tank.vmax = crate::units::BIG;
                }
                self.tanks.push(tank);
            }
        }
        self.rebuild_adjacency();
        Ok(index)
    }

    /// Deletes a node and every link connected to it. With
    /// [`ActionCode::Conditional`], refuses if the node or any of its links
    /// appears in a simple or rule-based control.
    pub fn delete_node(&mut self, index: usize, action: ActionCode) -> Result<()> {
        if index == 0 || index > self.nnodes() {
            return Err(EPANETError::NodeIndexOutOfRange { index: index as i32 });
        }
        let incident: Vec<usize> = self.adj.of(index).iter().map(|a| a.link).collect();
        if action == ActionCode::Conditional {
            if self.node_in_controls(index) {
                return Err(EPANETError::InUseByControl {
                    id: format!("node {}", self.nodes[index].id),
                });
            }
            for &k in &incident {
                if self.link_in_controls(k) {
                    return Err(EPANETError::InUseByControl {
                        id: format!("link {}", self.links[k].id),
                    });
                }
            }
        }
        // Remove incident links from highest index down so earlier removals
        // don't invalidate later ones.
        let mut incident = incident;
        incident.sort_unstable_by(|a, b| b.cmp(a));
        for k in incident {
            self.remove_link_record(k);
        }
        // Drop controls and rules that reference the node.
        self.controls
            .retain(|c| !(c.node_index == index as i32));
        self.rules.retain(|r| {
            !r.premises.iter().any(|p| {
                p.rule_object == RuleObject::Node && p.object_index == index as i32
            })
        });
        self.renumber_controls();
        // Remove the node itself.
        self.nodes.remove(index);
        if index <= self.njuncs {
            self.njuncs -= 1;
        } else {
            self.tanks.remove(index - self.njuncs);
        }
        for tank in self.tanks.iter_mut().skip(1) {
            if tank.node > index {
                tank.node -= 1;
            }
        }
        self.shift_node_refs(index + 1, -1);
        self.rebuild_adjacency();
        Ok(())
    }

    /// Adds a link of the given type between two existing nodes, returning
    /// its new 1-based index.
    pub fn add_link(
        &mut self,
        id: &str,
        ty: LinkType,
        from_node: usize,
        to_node: usize,
    ) -> Result<usize> {
        Self::check_id(id)?;
        if self.find_link(id).is_some() {
            return Err(EPANETError::DuplicateId { id: id.to_string() });
        }
        if from_node == 0 || from_node > self.nnodes() || to_node == 0 || to_node > self.nnodes() {
            return Err(EPANETError::UndefinedNode {
                id: from_node.max(to_node).to_string(),
            });
        }
        if from_node == to_node {
            return Err(EPANETError::SameStartEndNodes { id: id.to_string() });
        }
        let mut link = Link {
            id: id.to_string(),
            n1: from_node,
            n2: to_node,
            ty,
            ..Link::default()
        };
        match ty {
            LinkType::CvPipe | LinkType::Pipe => {
                link.diam = 10.0 / 12.0;
                link.len = 330.0;
                link.kc = 100.0;
                link.status = LinkStatus::Open;
            }
            LinkType::Pump => {
                link.kc = 1.0;
                link.status = LinkStatus::Open;
            }
            _ => {
                link.diam = 10.0 / 12.0;
                link.kc = 0.0;
                link.status = LinkStatus::Active;
            }
        }
        self.links.push(link);
        let index = self.links.len() - 1;
        match ty {
            LinkType::Pump => self.pumps.push(Pump {
                link: index,
                ..Pump::default()
            }),
            t if t.is_valve() => self.valves.push(Valve { link: index }),
            _ => {}
        }
        self.rebuild_adjacency();
        Ok(index)
    }

    /// Deletes a link. With [`ActionCode::Conditional`], refuses if the link
    /// appears in a simple or rule-based control.
    pub fn delete_link(&mut self, index: usize, action: ActionCode) -> Result<()> {
        if index == 0 || index > self.nlinks() {
            return Err(EPANETError::LinkIndexOutOfRange { index: index as i32 });
        }
        if action == ActionCode::Conditional && self.link_in_controls(index) {
            return Err(EPANETError::InUseByControl {
                id: format!("link {}", self.links[index].id),
            });
        }
        self.remove_link_record(index);
        self.renumber_controls();
        self.rebuild_adjacency();
        Ok(())
    }

    /// Removes a link record, its pump/valve companion, and any controls or
    /// rules that reference it, then renumbers higher link indices downward.
    fn remove_link_record(&mut self, index: usize) {
        if let Some(p) = self.find_pump(index) {
            self.pumps.remove(p);
        }
        if let Some(v) = self.find_valve(index) {
            self.valves.remove(v);
        }
        self.links.remove(index);
        self.controls.retain(|c| c.link_index != index as i32);
        self.rules.retain(|r| {
            !r.then_actions.iter().any(|a| a.link_index == index as i32)
                && !r.else_actions.iter().any(|a| a.link_index == index as i32)
                && !r.premises.iter().any(|p| {
                    p.rule_object == RuleObject::Link && p.object_index == index as i32
                })
        });
        self.shift_link_refs(index + 1, -1);
    }

    /// Shifts every stored node index >= `start` by `delta`.
    fn shift_node_refs(&mut self, start: usize, delta: i32) {
        let start = start as i32;
        for link in self.links.iter_mut().skip(1) {
            if link.n1 as i32 >= start {
                link.n1 = (link.n1 as i32 + delta) as usize;
            }
            if link.n2 as i32 >= start {
                link.n2 = (link.n2 as i32 + delta) as usize;
            }
        }
        for c in self.controls.iter_mut() {
            if c.node_index >= start {
                c.node_index += delta;
            }
        }
        for r in self.rules.iter_mut() {
            for p in r.premises.iter_mut() {
                if p.rule_object == RuleObject::Node && p.object_index >= start {
                    p.object_index += delta;
                }
            }
        }
    }

    /// Shifts every stored link index >= `start` by `delta`.
    fn shift_link_refs(&mut self, start: usize, delta: i32) {
        let start = start as i32;
        for pump in self.pumps.iter_mut().skip(1) {
            if pump.link as i32 >= start {
                pump.link = (pump.link as i32 + delta) as usize;
            }
        }
        for valve in self.valves.iter_mut().skip(1) {
            if valve.link as i32 >= start {
                valve.link = (valve.link as i32 + delta) as usize;
            }
        }
        for c in self.controls.iter_mut() {
            if c.link_index >= start {
                c.link_index += delta;
            }
        }
        for r in self.rules.iter_mut() {
            for p in r.premises.iter_mut() {
                if p.rule_object == RuleObject::Link && p.object_index >= start {
                    p.object_index += delta;
                }
            }
            for a in r.then_actions.iter_mut().chain(r.else_actions.iter_mut()) {
                if a.link_index >= start {
                    a.link_index += delta;
                }
            }
        }
    }

    /// Shifts every stored pattern index >= `start` by `delta`; references to
    /// a deleted pattern (shift of exactly `start - 1`) become 0.
    pub fn shift_pattern_refs(&mut self, deleted: usize) {
        let fix = |p: &mut i32| {
            use std::cmp::Ordering::*;
            match (*p as usize).cmp(&deleted) {
                Equal => *p = 0,
                Greater => *p -= 1,
                Less => {}
            }
        };
        for node in self.nodes.iter_mut().skip(1) {
            for d in node.demands.iter_mut() {
                fix(&mut d.pattern_index);
            }
            if let Some(src) = node.source.as_mut() {
                let mut p = src.pat as i32;
                fix(&mut p);
                src.pat = p as usize;
            }
        }
        for tank in self.tanks.iter_mut().skip(1) {
            let mut p = tank.pat as i32;
            fix(&mut p);
            tank.pat = p as usize;
        }
        for pump in self.pumps.iter_mut().skip(1) {
            let mut p = pump.upat as i32;
            fix(&mut p);
            pump.upat = p as usize;
            let mut p = pump.epat as i32;
            fix(&mut p);
            pump.epat = p as usize;
        }
    }

    /// Shifts every stored curve index after curve `deleted` is removed;
    /// references to the deleted curve become 0.
    pub fn shift_curve_refs(&mut self, deleted: usize) {
        let fix = |c: &mut usize| {
            use std::cmp::Ordering::*;
            match (*c).cmp(&deleted) {
                Equal => *c = 0,
                Greater => *c -= 1,
                Less => {}
            }
        };
        for tank in self.tanks.iter_mut().skip(1) {
            fix(&mut tank.vcurve);
        }
        for pump in self.pumps.iter_mut().skip(1) {
            fix(&mut pump.hcurve);
            fix(&mut pump.ecurve);
        }
    }

    fn renumber_controls(&mut self) {
        for (i, c) in self.controls.iter_mut().enumerate() {
            c.index = i as i32 + 1;
        }
    }

    // ----- control references -----

    pub fn node_in_controls(&self, node: usize) -> bool {
        let n = node as i32;
        self.controls.iter().any(|c| c.node_index == n)
            || self.rules.iter().any(|r| {
                r.premises
                    .iter()
                    .any(|p| p.rule_object == RuleObject::Node && p.object_index == n)
            })
    }

    pub fn link_in_controls(&self, link: usize) -> bool {
        let k = link as i32;
        self.controls.iter().any(|c| c.link_index == k)
            || self.rules.iter().any(|r| {
                r.premises
                    .iter()
                    .any(|p| p.rule_object == RuleObject::Link && p.object_index == k)
                    || r.then_actions.iter().any(|a| a.link_index == k)
                    || r.else_actions.iter().any(|a| a.link_index == k)
            })
    }

    // ----- tank geometry -----

    /// Whether tank `j` carries a usable volume curve.
    fn tank_curve(&self, j: usize) -> std::option::Option<&Curve> {
        let vcurve = self.tanks[j].vcurve;
        if vcurve > 0 && self.curves[vcurve].len() >= 2 {
            Some(&self.curves[vcurve])
        } else {
            None
        }
    }

    /// Volume of tank `j` when its water surface sits at grade `h`.
    pub fn tank_volume(&self, j: usize, h: f64) -> f64 {
        let tank = &self.tanks[j];
        match self.tank_curve(j) {
            None => tank.vmin + (h - tank.hmin) * tank.area,
            Some(curve) => {
                let el = self.nodes[tank.node].el;
                curve.interp(h - el)
            }
        }
    }

    /// Water surface grade of tank `j` holding volume `v`.
    pub fn tank_grade(&self, j: usize, v: f64) -> f64 {
        let tank = &self.tanks[j];
        match self.tank_curve(j) {
            None => tank.hmin + (v - tank.vmin) / tank.area,
            Some(curve) => {
                let el = self.nodes[tank.node].el;
                el + curve.interp_inverse(v)
            }
        }
    }

    /// Recomputes a tank's max/initial volumes from its levels and geometry.
    /// `vmin` must already hold the explicit minimum volume (or the cylinder
    /// volume below the minimum level). Call after changing tank data or its
    /// volume curve.
    pub fn update_tank_volumes(&mut self, j: usize) {
        let tank = &self.tanks[j];
        if tank.is_reservoir() {
            return;
        }
        let (vmin, vmax, v0) = match self.tank_curve(j) {
            None => {
                let a = tank.area;
                let vmin = tank.vmin;
                (
                    vmin,
                    vmin + (tank.hmax - tank.hmin) * a,
                    vmin + (tank.h0 - tank.hmin) * a,
                )
            }
            Some(curve) => {
                let el = self.nodes[tank.node].el;
                (
                    curve.interp(tank.hmin - el),
                    curve.interp(tank.hmax - el),
                    curve.interp(tank.h0 - el),
                )
            }
        };
        let tank = &mut self.tanks[j];
        tank.vmin = vmin;
        tank.vmax = vmax;
        tank.v0 = v0;
        tank.v = v0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn junctions_insert_before_tanks_and_shift_references() {
        let mut net = Network::new();
        let j1 = net.add_node("J1", NodeType::Junction).unwrap();
        let r1 = net.add_node("R1", NodeType::Reservoir).unwrap();
        assert_eq!((j1, r1), (1, 2));
        net.add_link("P1", LinkType::Pipe, j1, r1).unwrap();

        let j2 = net.add_node("J2", NodeType::Junction).unwrap();
        assert_eq!(j2, 2);
        // Reservoir slid to index 3 and the pipe's end node followed it.
        assert_eq!(net.find_node("R1"), Some(3));
        assert_eq!(net.links[1].n2, 3);
        assert_eq!(net.tanks[1].node, 3);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut net = Network::new();
        net.add_node("N1", NodeType::Junction).unwrap();
        let err = net.add_node("N1", NodeType::Tank).unwrap_err();
        assert_eq!(err.code(), 215);
    }

    #[test]
    fn deleting_a_node_removes_its_links() {
        let mut net = Network::new();
        let a = net.add_node("A", NodeType::Junction).unwrap();
        let b = net.add_node("B", NodeType::Junction).unwrap();
        let c = net.add_node("C", NodeType::Reservoir).unwrap();
        net.add_link("AB", LinkType::Pipe, a, b).unwrap();
        net.add_link("BC", LinkType::Pipe, b, c).unwrap();

        net.delete_node(b, ActionCode::Unconditional).unwrap();
        assert_eq!(net.nnodes(), 2);
        assert_eq!(net.nlinks(), 0);
        assert_eq!(net.find_node("C"), Some(2));
    }
}

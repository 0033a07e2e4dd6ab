//! The binary scratch hydraulics file.
//!
//! A recoverable snapshot of every hydraulic step so a water quality run
//! can be driven from saved hydraulics. All words are 32 bits:
//!
//! - Prologue: magic number, engine version, and
//!   `(nnodes, nlinks, ntanks, npumps, nvalves, duration)`.
//! - Per step, in simulation order: time of step, node demands, node
//!   heads, link flows, link statuses and link settings, then the step
//!   size.
//!
//! The scratch copy lives in memory; `save_hydraulics_file` and
//! `use_hydraulics_file` move it to and from disk.

use crate::epanet_error::{EPANETError, Result};
use crate::hydraul::Hydraul;
use crate::network::Network;
use crate::types::link::LinkStatus;
use num_traits::FromPrimitive;

pub(crate) const MAGIC_NUMBER: i32 = 516114521;
pub(crate) const ENGINE_VERSION: i32 = 20300;

/// One hydraulic snapshot decoded from the file.
#[derive(Debug, Clone, Default)]
pub(crate) struct HydSnapshot {
    pub time: u64,
    pub node_demand: Vec<f64>,
    pub node_head: Vec<f64>,
    pub link_flow: Vec<f64>,
    pub link_status: Vec<LinkStatus>,
    pub link_setting: Vec<f64>,
    pub hstep: u64,
}

#[derive(Debug, Default)]
pub(crate) struct HydFile {
    buf: Vec<u8>,
    read_pos: usize,
}

impl HydFile {
    /// Starts a fresh scratch file with the network's prologue.
    pub fn start(&mut self, net: &Network, dur: u64) {
        self.buf.clear();
        self.read_pos = 0;
        self.put_i32(MAGIC_NUMBER);
        self.put_i32(ENGINE_VERSION);
        self.put_i32(net.nnodes() as i32);
        self.put_i32(net.nlinks() as i32);
        self.put_i32(net.ntanks() as i32);
        self.put_i32(net.npumps() as i32);
        self.put_i32(net.nvalves() as i32);
        self.put_i32(dur as i32);
    }

    /// Appends the current hydraulic solution at time `time`.
    pub fn save_snapshot(&mut self, net: &Network, hyd: &Hydraul, time: u64) {
        self.put_i32(time as i32);
        for i in 1..=net.nnodes() {
            // Junctions record their total outflow (consumer, emitter and
            // leakage) so quality transport sees a closed volume balance;
            // fixed grade nodes record their net inflow.
            let d = if i <= net.njuncs {
                hyd.demand_flow[i] + hyd.emitter_flow[i] + hyd.leakage_flow[i]
            } else {
                hyd.node_demand[i]
            };
            self.put_f32(d as f32);
        }
        for i in 1..=net.nnodes() {
            self.put_f32(hyd.node_head[i] as f32);
        }
        for k in 1..=net.nlinks() {
            // A closed link stores zero flow.
            let q = if hyd.link_status[k].is_closed() {
                0.0
            } else {
                hyd.link_flow[k]
            };
            self.put_f32(q as f32);
        }
        for k in 1..=net.nlinks() {
            self.put_i32(hyd.link_status[k] as i32);
        }
        for k in 1..=net.nlinks() {
            self.put_f32(hyd.link_setting[k] as f32);
        }
    }

    /// Appends the size of the step that follows the last snapshot.
    pub fn save_step(&mut self, hstep: u64) {
        self.put_i32(hstep as i32);
    }

    /// Validates the prologue against the network and positions the reader
    /// at the first snapshot.
    pub fn open_reader(&mut self, net: &Network) -> Result<u64> {
        self.read_pos = 0;
        let magic = self.get_i32()?;
        let version = self.get_i32()?;
        if magic != MAGIC_NUMBER || version != ENGINE_VERSION {
            return Err(EPANETError::InvalidHydFile);
        }
        let counts = [
            net.nnodes() as i32,
            net.nlinks() as i32,
            net.ntanks() as i32,
            net.npumps() as i32,
            net.nvalves() as i32,
        ];
        for expected in counts {
            if self.get_i32()? != expected {
                return Err(EPANETError::InvalidHydFile);
            }
        }
        let dur = self.get_i32()?;
        Ok(dur as u64)
    }

    /// Reads the next hydraulic snapshot, or None at end of file.
    pub fn read_snapshot(&mut self, net: &Network) -> Result<std::option::Option<HydSnapshot>> {
        if self.read_pos >= self.buf.len() {
            return Ok(None);
        }
        let nnodes = net.nnodes();
        let nlinks = net.nlinks();
        let mut snap = HydSnapshot {
            time: self.get_i32()? as u64,
            node_demand: vec![0.0; nnodes + 1],
            node_head: vec![0.0; nnodes + 1],
            link_flow: vec![0.0; nlinks + 1],
            link_status: vec![LinkStatus::Closed; nlinks + 1],
            link_setting: vec![0.0; nlinks + 1],
            hstep: 0,
        };
        for i in 1..=nnodes {
            snap.node_demand[i] = self.get_f32()? as f64;
        }
        for i in 1..=nnodes {
            snap.node_head[i] = self.get_f32()? as f64;
        }
        for k in 1..=nlinks {
            snap.link_flow[k] = self.get_f32()? as f64;
        }
        for k in 1..=nlinks {
            let code = self.get_i32()?;
            snap.link_status[k] =
                LinkStatus::from_i32(code).ok_or(EPANETError::CannotReadHydFile)?;
        }
        for k in 1..=nlinks {
            snap.link_setting[k] = self.get_f32()? as f64;
        }
        snap.hstep = self.get_i32()? as u64;
        Ok(Some(snap))
    }

    /// Writes the scratch contents to a file on disk.
    pub fn save_to(&self, path: &str) -> Result<()> {
        std::fs::write(path, &self.buf).map_err(|_| EPANETError::CannotOpenHydFile {
            path: path.to_string(),
        })
    }

    /// Replaces the scratch contents with a file read from disk and checks
    /// its prologue against the network.
    pub fn load_from(&mut self, path: &str, net: &Network) -> Result<u64> {
        self.buf = std::fs::read(path).map_err(|_| EPANETError::CannotOpenHydFile {
            path: path.to_string(),
        })?;
        self.open_reader(net)
    }

    fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn get_i32(&mut self) -> Result<i32> {
        let end = self.read_pos + 4;
        if end > self.buf.len() {
            return Err(EPANETError::CannotReadHydFile);
        }
        let v = i32::from_le_bytes(self.buf[self.read_pos..end].try_into().unwrap());
        self.read_pos = end;
        Ok(v)
    }

    fn get_f32(&mut self) -> Result<f32> {
        let end = self.read_pos + 4;
        if end > self.buf.len() {
            return Err(EPANETError::CannotReadHydFile);
        }
        let v = f32::from_le_bytes(self.buf[self.read_pos..end].try_into().unwrap());
        self.read_pos = end;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydraul::Hydraul;
    use crate::network::Network;
    use crate::types::link::LinkType;
    use crate::types::node::NodeType;

    fn sample() -> (Network, Hydraul) {
        let mut net = Network::new();
        net.add_node("J1", NodeType::Junction).unwrap();
        net.add_node("R1", NodeType::Reservoir).unwrap();
        net.add_link("P1", LinkType::Pipe, 2, 1).unwrap();
        let mut hyd = Hydraul::new();
        hyd.open(&net);
        hyd.node_demand[1] = 0.5;
        hyd.node_head[1] = 95.25;
        hyd.node_head[2] = 100.0;
        hyd.link_flow[1] = 0.5;
        hyd.link_setting[1] = 100.0;
        (net, hyd)
    }

    #[test]
    fn snapshots_round_trip_through_the_file() {
        let (net, hyd) = sample();
        let mut file = HydFile::default();
        file.start(&net, 3600);
        file.save_snapshot(&net, &hyd, 0);
        file.save_step(3600);
        file.save_snapshot(&net, &hyd, 3600);
        file.save_step(0);

        assert_eq!(file.open_reader(&net), Ok(3600));
        let snap = file.read_snapshot(&net).unwrap().unwrap();
        assert_eq!(snap.time, 0);
        assert_eq!(snap.hstep, 3600);
        assert!((snap.node_head[1] - 95.25).abs() < 1e-6);
        assert!((snap.link_flow[1] - 0.5).abs() < 1e-6);
        assert_eq!(snap.link_status[1], LinkStatus::Open);
        let snap = file.read_snapshot(&net).unwrap().unwrap();
        assert_eq!((snap.time, snap.hstep), (3600, 0));
        assert!(file.read_snapshot(&net).unwrap().is_none());
    }

    #[test]
    fn prologue_must_match_the_network() {
        let (net, hyd) = sample();
        let mut file = HydFile::default();
        file.start(&net, 0);
        file.save_snapshot(&net, &hyd, 0);
        file.save_step(0);

        let mut other = Network::new();
        other.add_node("J1", NodeType::Junction).unwrap();
        other.add_node("J2", NodeType::Junction).unwrap();
        other.add_node("R1", NodeType::Reservoir).unwrap();
        assert_eq!(file.open_reader(&other), Err(EPANETError::InvalidHydFile));
    }
}

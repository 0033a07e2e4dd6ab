use crate::types::demand::DemandCategory;
use crate::types::node::{MixingModel, NodeType, SourceType};

/// A water quality source attached to a node.
#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub ty: SourceType,
    /// Base concentration or mass inflow strength.
    pub c0: f64,
    /// Strength time pattern index (0 = none).
    pub pat: usize,
    /// Mass inflow rate computed for the current quality step.
    pub smass: f64,
}

/// A network node: junction, reservoir or tank.
///
/// Tank/reservoir-specific data lives in the companion [`Tank`] record.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub id: String,
    pub ty: NodeType,
    /// Elevation (ft).
    pub el: f64,
    /// Initial quality.
    pub c0: f64,
    /// Emitter flow coefficient (0 = no emitter).
    pub ke: f64,
    /// Demand categories (junctions only).
    pub demands: Vec<DemandCategory>,
    pub source: std::option::Option<Source>,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            id: String::new(),
            ty: NodeType::Junction,
            el: 0.0,
            c0: 0.0,
            ke: 0.0,
            demands: Vec::new(),
            source: None,
        }
    }
}

impl Node {
    /// Total baseline demand over all categories.
    pub fn base_demand(&self) -> f64 {
        self.demands.iter().map(|d| d.base_demand).sum()
    }
}

/// Tank/reservoir data. Element `i` belongs to node `njuncs + i`.
#[derive(Debug, Clone)]
pub(crate) struct Tank {
    /// Index of the node this record belongs to.
    pub node: usize,
    /// Cross-sectional area (sq ft); 0 marks a reservoir (fixed grade).
    pub area: f64,
    /// Minimum water elevation (ft).
    pub hmin: f64,
    /// Maximum water elevation (ft).
    pub hmax: f64,
    /// Initial water elevation (ft).
    pub h0: f64,
    /// Minimum volume (cu ft).
    pub vmin: f64,
    /// Maximum volume (cu ft).
    pub vmax: f64,
    /// Initial volume (cu ft).
    pub v0: f64,
    /// Bulk reaction coefficient (1/sec).
    pub kb: f64,
    /// Current volume (cu ft).
    pub v: f64,
    /// Current quality.
    pub c: f64,
    /// Fixed-grade time pattern (reservoirs only, 0 = none).
    pub pat: usize,
    /// Volume v. depth curve index (0 = none; overrides `area`).
    pub vcurve: usize,
    pub mix_model: MixingModel,
    /// Mixing compartment fraction of total volume (2-compartment model).
    pub v1frac: f64,
    pub can_overflow: bool,
}

impl Default for Tank {
    fn default() -> Self {
        Tank {
            node: 0,
            area: 0.0,
            hmin: 0.0,
            hmax: 0.0,
            h0: 0.0,
            vmin: 0.0,
            vmax: 0.0,
            v0: 0.0,
            kb: 0.0,
            v: 0.0,
            c: 0.0,
            pat: 0,
            vcurve: 0,
            mix_model: MixingModel::Mix1,
            v1frac: 1.0,
            can_overflow: false,
        }
    }
}

impl Tank {
    pub fn is_reservoir(&self) -> bool {
        self.area == 0.0
    }

    /// Size of the mixing compartment for the 2-compartment model.
    pub fn v1max(&self) -> f64 {
        self.v1frac * self.vmax
    }
}

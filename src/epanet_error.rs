use thiserror::Error;

/// EPANET Errors
///
/// Structured error values carry the offending object or value; [`EPANETError::code`]
/// maps each variant onto the stable EPANET toolkit error code so embedding
/// layers can translate at an ABI boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EPANETError {
    #[error("hydraulic solver has not been opened")]
    HydraulicsNotOpen,
    #[error("no hydraulic results are available")]
    NoHydraulics,
    #[error("water quality solver has not been opened")]
    QualityNotOpen,
    #[error("cannot solve network hydraulic equations; check connectivity at node {id}")]
    IllConditioned { id: String },
    #[error("hydraulic solution did not converge at {time} seconds")]
    Unbalanced { time: u64 },
    #[error("illegal numeric value {value}")]
    IllegalValue { value: f64 },
    #[error("undefined node {id}")]
    UndefinedNode { id: String },
    #[error("undefined link {id}")]
    UndefinedLink { id: String },
    #[error("undefined time pattern {id}")]
    UndefinedPattern { id: String },
    #[error("undefined data curve {id}")]
    UndefinedCurve { id: String },
    #[error("attempt to control check valve {id}")]
    ControlledCheckValve { id: String },
    #[error("node index {index} out of range")]
    NodeIndexOutOfRange { index: i32 },
    #[error("link index {index} out of range")]
    LinkIndexOutOfRange { index: i32 },
    #[error("pattern index {index} out of range")]
    PatternIndexOutOfRange { index: i32 },
    #[error("curve index {index} out of range")]
    CurveIndexOutOfRange { index: i32 },
    #[error("control index {index} out of range")]
    ControlIndexOutOfRange { index: i32 },
    #[error("rule index {index} out of range")]
    RuleIndexOutOfRange { index: i32 },
    #[error("demand category index {index} out of range")]
    DemandIndexOutOfRange { index: i32 },
    #[error("duplicate ID {id}")]
    DuplicateId { id: String },
    #[error("invalid parameter code")]
    InvalidParameterCode,
    #[error("invalid ID name {id}")]
    InvalidId { id: String },
    #[error("link {id} has the same start and end nodes")]
    SameStartEndNodes { id: String },
    #[error("network has fewer than two nodes")]
    NotEnoughNodes,
    #[error("network has no tanks or reservoirs")]
    NoTanksOrReservoirs,
    #[error("invalid lower/upper levels for tank {id}")]
    InvalidTankLevels { id: String },
    #[error("pump {id} has no head curve or power rating")]
    NoPumpCurve { id: String },
    #[error("pump {id} has an invalid head curve")]
    InvalidPumpCurve { id: String },
    #[error("curve {id} has non-increasing x-values")]
    NonIncreasingCurve { id: String },
    #[error("node {id} still has links connected to it")]
    NodeHasLinks { id: String },
    #[error("node {id} is assigned as the quality trace node")]
    InUseAsTraceNode { id: String },
    #[error("{id} appears in a simple or rule-based control")]
    InUseByControl { id: String },
    #[error("cannot open hydraulics file {path}")]
    CannotOpenHydFile { path: String },
    #[error("hydraulics file does not match network data")]
    InvalidHydFile,
    #[error("cannot read hydraulics file")]
    CannotReadHydFile,
}

impl EPANETError {
    /// The stable EPANET toolkit error code for this error.
    pub fn code(&self) -> i32 {
        use EPANETError::*;
        match self {
            HydraulicsNotOpen => 103,
            NoHydraulics => 104,
            QualityNotOpen => 105,
            IllConditioned { .. } => 110,
            Unbalanced { .. } => 110,
            IllegalValue { .. } => 202,
            UndefinedNode { .. } | NodeIndexOutOfRange { .. } => 203,
            UndefinedLink { .. } | LinkIndexOutOfRange { .. } => 204,
            UndefinedPattern { .. } | PatternIndexOutOfRange { .. } => 205,
            UndefinedCurve { .. } | CurveIndexOutOfRange { .. } => 206,
            ControlledCheckValve { .. } => 207,
            ControlIndexOutOfRange { .. } => 241,
            RuleIndexOutOfRange { .. } => 257,
            DemandIndexOutOfRange { .. } => 253,
            DuplicateId { .. } => 215,
            InvalidParameterCode => 251,
            InvalidId { .. } => 252,
            SameStartEndNodes { .. } => 222,
            NotEnoughNodes => 223,
            NoTanksOrReservoirs => 224,
            InvalidTankLevels { .. } => 225,
            NoPumpCurve { .. } => 226,
            InvalidPumpCurve { .. } => 227,
            NonIncreasingCurve { .. } => 230,
            NodeHasLinks { .. } => 259,
            InUseAsTraceNode { .. } => 260,
            InUseByControl { .. } => 261,
            CannotOpenHydFile { .. } => 305,
            InvalidHydFile => 306,
            CannotReadHydFile => 307,
        }
    }
}

/// EPANET Result type with EPANET specific errors
pub type Result<T> = std::result::Result<T, EPANETError>;

use num_derive::FromPrimitive;

/// Deletion behavior for nodes and links referenced by controls or rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum ActionCode {
    /// Refuse the deletion if any simple or rule-based control references the object.
    Conditional = 0,
    /// Delete the object along with every control that references it.
    Unconditional = 1,
}

/// Object classes countable through `get_count`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum CountType {
    NodeCount = 0,    // Number of nodes (junctions + tanks + reservoirs)
    TankCount = 1,    // Number of tanks and reservoirs
    LinkCount = 2,    // Number of links (pipes + pumps + valves)
    PatCount = 3,     // Number of time patterns
    CurveCount = 4,   // Number of data curves
    ControlCount = 5, // Number of simple controls
    RuleCount = 6,    // Number of rule-based controls
}

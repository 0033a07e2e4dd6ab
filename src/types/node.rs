use num_derive::FromPrimitive;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum MixingModel {
    Mix1 = 0, // Complete mix model
    Mix2 = 1, // 2-compartment model
    Fifo = 2, // First in, first out model
    Lifo = 3, // Last in, first out model
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum NodeProperty {
    Elevation = 0,      // Elevation
    BaseDemand = 1,     // Primary demand baseline value
    Pattern = 2,        // Primary demand time pattern index
    Emitter = 3,        // Emitter flow coefficient
    InitQual = 4,       // Initial quality
    SourceQual = 5,     // Quality source strength
    SourcePat = 6,      // Quality source pattern index
    SourceType = 7,     // Quality source type
    TankLevel = 8,      // Current computed tank water level (read only)
    Demand = 9,         // Current computed demand (read only)
    Head = 10,          // Current computed hydraulic head (read only)
    Pressure = 11,      // Current computed pressure (read only)
    Quality = 12,       // Current computed quality (read only)
    SourceMass = 13,    // Current computed quality source mass inflow (read only)
    InitVolume = 14,    // Tank initial volume (read only)
    MixModel = 15,      // Tank mixing model
    MixZoneVol = 16,    // Tank mixing zone volume (read only)
    TankDiam = 17,      // Tank diameter
    MinVolume = 18,     // Tank minimum volume
    VolCurve = 19,      // Tank volume curve index
    MinLevel = 20,      // Tank minimum level
    MaxLevel = 21,      // Tank maximum level
    MixFraction = 22,   // Tank mixing fraction
    TankKBulk = 23,     // Tank bulk decay coefficient
    TankVolume = 24,    // Current computed tank volume (read only)
    MaxVolume = 25,     // Tank maximum volume (read only)
    CanOverflow = 26,   // Tank can overflow (= 1) or not (= 0)
    DemandDeficit = 27, // Amount that full demand is reduced under PDA (read only)
    NodeInControl = 28, // Is present in any simple or rule-based control (= 1) or not (= 0)
    EmitterFlow = 29,   // Current emitter flow (read only)
    LeakageFlow = 30,   // Current leakage flow (read only)
    DemandFlow = 31,    // Current consumer demand delivered (read only)
    FullDemand = 32,    // Current consumer demand requested (read only)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum NodeType {
    Junction = 0,  // Junction node
    Reservoir = 1, // Reservoir node
    Tank = 2,      // Storage tank node
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum SourceType {
    Concen = 0,    // Sets the concentration of external inflow entering a node
    Mass = 1,      // Injects a given mass/minute into a node
    Setpoint = 2,  // Sets the concentration leaving a node to a given value
    FlowPaced = 3, // Adds a given value to the concentration leaving a node
}

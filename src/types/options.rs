use num_derive::FromPrimitive;
#[cfg(test)]
use strum_macros::EnumIter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum AnalysisStatistic {
    Iterations = 0,      // Number of hydraulic iterations taken
    RelativeError = 1,   // Sum of link flow changes / sum of link flows
    MaxHeadError = 2,    // Largest head loss error for links
    MaxFlowChange = 3,   // Largest flow change in links
    MassBalance = 4,     // Cumulative water quality mass balance ratio
    DeficientNodes = 5,  // Number of pressure deficient nodes
    DemandReduction = 6, // % demand reduction at pressure deficient nodes
    LeakageLoss = 7,     // % flow lost to system leakage
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum FlowUnits {
    Cfs = 0,  // Cubic feet per second
    Gpm = 1,  // Gallons per minute
    Mgd = 2,  // Million gallons per day
    Imgd = 3, // Imperial million gallons per day
    Afd = 4,  // Acre-feet per day
    Lps = 5,  // Liters per second
    Lpm = 6,  // Liters per minute
    Mld = 7,  // Million liters per day
    Cmh = 8,  // Cubic meters per hour
    Cmd = 9,  // Cubic meters per day
    Cms = 10, // Cubic meters per second
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
#[repr(u32)]
pub enum HeadLossType {
    #[default]
    HazenWilliams = 0, // Hazen-Williams
    DarcyWeisbach = 1, // Darcy-Weisbach
    ChezyManning = 2,  // Chezy-Manning
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum PressUnits {
    Psi = 0,    // Pounds per square inch
    Kpa = 1,    // Kilopascals
    Meters = 2, // Meters
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
#[repr(u32)]
pub enum DemandModel {
    #[default]
    Dda = 0, // Demand driven analysis
    Pda = 1, // Pressure driven analysis
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[cfg_attr(test, derive(EnumIter))]
#[repr(u32)]
pub enum Option {
    Trials = 0,        // Maximum trials allowed for hydraulic convergence
    Accuracy = 1,      // Total normalized flow change for hydraulic convergence
    Tolerance = 2,     // Water quality tolerance
    EmitExpon = 3,     // Exponent in emitter discharge formula
    DemandMult = 4,    // Global demand multiplier
    HeadError = 5,     // Maximum head loss error for hydraulic convergence
    FlowChange = 6,    // Maximum flow change for hydraulic convergence
    HeadLossForm = 7,  // Head loss formula
    GlobalEffic = 8,   // Global pump efficiency (percent)
    GlobalPrice = 9,   // Global energy price per KWH
    GlobalPattern = 10, // Index of a global energy price pattern
    DemandCharge = 11, // Energy charge per max. KW usage
    SpGravity = 12,    // Specific gravity
    SpViscos = 13,     // Specific viscosity (relative to water at 20 deg C)
    Unbalanced = 14,   // Extra trials allowed if hydraulics don't converge
    CheckFreq = 15,    // Frequency of hydraulic status checks
    MaxCheck = 16,     // Maximum trials for status checking
    DampLimit = 17,    // Accuracy level where solution damping begins
    SpDiffus = 18,     // Specific diffusivity (relative to chlorine at 20 deg C)
    BulkOrder = 19,    // Bulk water reaction order for pipes
    WallOrder = 20,    // Wall reaction order for pipes (either 0 or 1)
    TankOrder = 21,    // Bulk water reaction order for tanks
    ConcenLimit = 22,  // Limiting concentration for growth reactions
    EmitBackflow = 23, // 1 if emitters can backflow, 0 if not
    PressUnits = 24,   // Pressure units
    StatusReport = 25, // Type of status report to produce
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
#[repr(u32)]
pub enum QualityType {
    #[default]
    None = 0,  // No quality analysis
    Chem = 1,  // Chemical fate and transport
    Age = 2,   // Water age analysis
    Trace = 3, // Source tracing analysis
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
#[repr(u32)]
pub enum StatusReport {
    #[default]
    NoReport = 0,     // No status reporting
    NormalReport = 1, // Normal level of status reporting
    FullReport = 2,   // Full level of status reporting
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[cfg_attr(test, derive(EnumIter))]
#[repr(u32)]
pub enum TimeParameter {
    Duration = 0,      // Total simulation duration
    HydStep = 1,       // Hydraulic time step
    QualStep = 2,      // Water quality time step
    PatternStep = 3,   // Time pattern period
    PatternStart = 4,  // Time when time patterns begin
    ReportStep = 5,    // Reporting time step
    ReportStart = 6,   // Time when reporting starts
    RuleStep = 7,      // Rule-based control evaluation time step
    Statistic = 8,     // Reporting statistic code
    Periods = 9,       // Number of reporting time periods (read only)
    StartTime = 10,    // Simulation starting time of day
    HTime = 11,        // Elapsed time of current hydraulic solution (read only)
    QTime = 12,        // Elapsed time of current quality solution (read only)
    HaltFlag = 13,     // Flag indicating if the simulation was halted (read only)
    NextEvent = 14,    // Shortest time until a tank becomes empty or full (read only)
    NextEventTank = 15, // Index of tank with shortest time to become empty or full (read only)
}

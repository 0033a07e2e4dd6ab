use num_derive::FromPrimitive;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum LinkProperty {
    Diameter = 0,       // Pipe/valve diameter
    Length = 1,         // Pipe length
    Roughness = 2,      // Pipe roughness coefficient
    MinorLoss = 3,      // Pipe/valve minor loss coefficient
    InitStatus = 4,     // Initial status
    InitSetting = 5,    // Initial pump speed or valve setting
    KBulk = 6,          // Bulk chemical reaction coefficient
    KWall = 7,          // Pipe wall chemical reaction coefficient
    Flow = 8,           // Current computed flow rate (read only)
    Velocity = 9,       // Current computed flow velocity (read only)
    HeadLoss = 10,      // Current computed head loss (read only)
    Status = 11,        // Current link status
    Setting = 12,       // Current link setting
    Energy = 13,        // Current computed pump energy usage (read only)
    LinkQual = 14,      // Current computed link quality (read only)
    LinkPattern = 15,   // Pump speed time pattern index
    PumpState = 16,     // Current computed pump state (read only)
    PumpEffic = 17,     // Current computed pump efficiency (read only)
    PumpPower = 18,     // Pump constant power rating
    PumpHCurve = 19,    // Pump head v. flow curve index
    PumpECurve = 20,    // Pump efficiency v. flow curve index
    PumpECost = 21,     // Pump average energy price
    PumpEPat = 22,      // Pump energy price time pattern index
    LinkInControl = 23, // Is present in any simple or rule-based control (= 1) or not (= 0)
    GpvCurve = 24,      // GPV head loss v. flow curve index
    LeakArea = 25,      // Pipe leak area (sq mm per 100 length units)
    LeakExpan = 26,     // Leak expansion rate (sq mm per unit of pressure head)
    LinkLeakage = 27,   // Current leakage rate (read only)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum LinkType {
    CvPipe = 0, // Pipe with check valve
    Pipe = 1,   // Pipe
    Pump = 2,   // Pump
    Prv = 3,    // Pressure reducing valve
    Psv = 4,    // Pressure sustaining valve
    Pbv = 5,    // Pressure breaker valve
    Fcv = 6,    // Flow control valve
    Tcv = 7,    // Throttle control valve
    Gpv = 8,    // General purpose valve
}

impl LinkType {
    /// True for PRV/PSV/PBV/FCV/TCV/GPV links.
    pub fn is_valve(self) -> bool {
        self as u32 >= LinkType::Prv as u32
    }

    /// True for plain pipes and check-valve pipes.
    pub fn is_pipe(self) -> bool {
        matches!(self, LinkType::CvPipe | LinkType::Pipe)
    }
}

/// Status values used when setting a link's status through the API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum LinkStatusType {
    Closed = 0, // Link is closed
    Open = 1,   // Link is open
}

/// Full discrete state of a link as tracked by the hydraulic solver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, Default)]
#[repr(u32)]
pub enum LinkStatus {
    XHead = 0,      // Pump cannot deliver head (closed)
    TempClosed = 1, // Temporarily closed
    Closed = 2,     // Closed
    #[default]
    Open = 3,       // Open
    Active = 4,     // Valve active (partially open)
    XFlow = 5,      // Pump exceeds maximum flow
    XFcv = 6,       // FCV cannot supply flow
    XPressure = 7,  // Valve cannot supply pressure
    Filling = 8,    // Tank filling
    Emptying = 9,   // Tank emptying
}

impl LinkStatus {
    /// A link passes no flow when its status is at or below `Closed`.
    pub fn is_closed(self) -> bool {
        self <= LinkStatus::Closed
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum PumpType {
    ConstHp = 0,   // Constant horsepower
    PowerFunc = 1, // Power function
    Custom = 2,    // User-defined custom curve
    NoCurve = 3,   // No curve
}

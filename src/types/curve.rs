use num_derive::FromPrimitive;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum CurveType {
    Volume = 0,   // Tank volume v. depth curve
    Pump = 1,     // Pump head v. flow curve
    Effic = 2,    // Pump efficiency v. flow curve
    HeadLoss = 3, // Valve head loss v. flow curve
    Generic = 4,  // Generic curve
}

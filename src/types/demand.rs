/// One category of a junction's demand: a baseline value scaled by a time
/// pattern, with an optional category name.
#[derive(Debug, Clone, Default)]
pub struct DemandCategory {
    pub base_demand: f64,
    pub pattern_index: i32,
    pub name: std::option::Option<String>,
}

/// Marks IR forms with an intervening materialization point between stages.
pub const MEDIATE_MARKER: &str = "mediate";
/// Marks in-place accumulation the builder cannot inline.
pub const ACCUMULATE_MARKER: &str = "+=!";
/// Marks assignment forms that pin the node and its first producer.
pub const ASSIGN_MARKER: &str = "=.";

/// Substring markers found in a node's IR translation.
///
/// Matching is plain substring containment on the opaque IR text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IrMarkers {
    pub mediate: bool,
    pub accumulate: bool,
    pub assign: bool,
}

impl IrMarkers {
    pub fn scan(ir: &str) -> Self {
        Self {
            mediate: ir.contains(MEDIATE_MARKER),
            accumulate: ir.contains(ACCUMULATE_MARKER),
            assign: ir.contains(ASSIGN_MARKER),
        }
    }

    pub fn any(&self) -> bool {
        self.mediate || self.accumulate || self.assign
    }
}

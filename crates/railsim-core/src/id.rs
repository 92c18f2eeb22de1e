use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a switch in the [`crate::switch::SwitchBank`]. Opaque; the
    /// letter printed on the grid is only the external encoding.
    pub struct SwitchId;
}

/// Identifies a train. Stable for the whole run and equal to the train's
/// position in the level's train list, so iteration order is id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrainId(pub u32);

impl TrainId {
    /// Index into the engine's train table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TrainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

use crate::creature::Side;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Fetch both rosters. `move_seed` drives the move-pool shuffle.
    LoadTeams {
        player: Vec<u32>,
        enemy: Vec<u32>,
        move_seed: u64,
    },
    LoadMegaForm {
        side: Side,
        mega_id: u32,
    },
}

use super::face::Face;

pub const NUM_FLOORS: usize = 7;
pub const LAYERS_PER_FLOOR: usize = 3;
pub const NUM_LAYERS: usize = NUM_FLOORS * LAYERS_PER_FLOOR;
pub const DARKNESS_FULL_BRIGHT: u8 = 255;

pub const GROUND_FLOOR: usize = 3;

pub const FLOOR_ORDER: [usize; NUM_FLOORS] = [3, 2, 1, 0, 4, 5, 6];

pub const fn floor_layers(floor: usize) -> std::ops::Range<usize> {
    floor * LAYERS_PER_FLOOR..(floor + 1) * LAYERS_PER_FLOOR
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSquare {
    layers: [Option<Face>; NUM_LAYERS],
    darkness: [u8; NUM_FLOORS],
    fog_of_war: [bool; NUM_FLOORS],
}

impl Default for MapSquare {
    fn default() -> Self {
        Self {
            layers: [None; NUM_LAYERS],
            darkness: [DARKNESS_FULL_BRIGHT; NUM_FLOORS],
            fog_of_war: [false; NUM_FLOORS],
        }
    }
}

impl MapSquare {
    pub fn face(&self, layer: usize) -> Option<Face> {
        self.layers.get(layer).copied().flatten()
    }

    pub fn darkness(&self, floor: usize) -> u8 {
        self.darkness
            .get(floor)
            .copied()
            .unwrap_or(DARKNESS_FULL_BRIGHT)
    }

    pub fn is_fog(&self, floor: usize) -> bool {
        self.fog_of_war.get(floor).copied().unwrap_or(false)
    }

    pub fn has_faces(&self) -> bool {
        self.layers.iter().any(Option::is_some)
    }

    pub fn floor_has_faces(&self, floor: usize) -> bool {
        floor < NUM_FLOORS && floor_layers(floor).any(|layer| self.layers[layer].is_some())
    }

    pub fn faces(&self) -> impl Iterator<Item = (usize, Face)> + '_ {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(layer, face)| face.map(|face| (layer, face)))
    }

    pub(crate) fn set_face(&mut self, layer: usize, face: Option<Face>) -> bool {
        let Some(slot) = self.layers.get_mut(layer) else {
            return false;
        };
        if *slot == face {
            return false;
        }
        *slot = face;
        true
    }

    pub(crate) fn set_darkness(&mut self, floor: usize, darkness: u8) -> bool {
        if floor >= NUM_FLOORS {
            return false;
        }
        let was_fog = self.fog_of_war[floor];
        let changed = was_fog || self.darkness[floor] != darkness;
        self.fog_of_war[floor] = false;
        self.darkness[floor] = darkness;
        if was_fog {
            for layer in floor_layers(floor) {
                self.layers[layer] = None;
            }
        }
        changed
    }

    pub(crate) fn clear(&mut self, floor: usize) -> bool {
        if floor >= NUM_FLOORS || self.fog_of_war[floor] {
            return false;
        }
        if !self.floor_has_faces(floor) && self.darkness[floor] == DARKNESS_FULL_BRIGHT {
            return false;
        }
        self.fog_of_war[floor] = true;
        true
    }

    pub(crate) fn fog_all_floors(&mut self) -> bool {
        let mut changed = false;
        for floor in 0..NUM_FLOORS {
            changed |= self.clear(floor);
        }
        changed
    }
}

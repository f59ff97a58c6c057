//! 144-node chip composition (spec.md §4.9) and its cooperative scheduler
//! (spec.md §5). One host thread, one active set, one node advanced by one
//! slot per visit — no OS threads, unlike the teacher's
//! `raya-core::scheduler` (which work-steals across real threads): the
//! hardware this toolchain targets is itself the concurrency model, so the
//! driver owns the only loop.

use cube_codegen::CompiledNode;

use crate::error::BootError;
use crate::node::{NeighborPorts, NodeInterpreter, StepEvent, ROM_SIZE};
use crate::port::Port;

pub const GRID_COLUMNS: usize = 18;
pub const GRID_ROWS: usize = 8;
pub const NODE_COUNT: usize = GRID_COLUMNS * GRID_ROWS;

/// `coordToIndex` (spec.md §4.9): `(coord/100)*18 + (coord%100)`.
pub fn coord_to_index(coord: u16) -> Option<usize> {
    let row = coord / 100;
    let col = coord % 100;
    if row as usize >= GRID_ROWS || col as usize >= GRID_COLUMNS {
        return None;
    }
    Some(row as usize * GRID_COLUMNS + col as usize)
}

/// Inverse of [`coord_to_index`].
pub fn index_to_coord(index: usize) -> u16 {
    let row = (index / GRID_COLUMNS) as u16;
    let col = (index % GRID_COLUMNS) as u16;
    row * 100 + col
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    North,
    South,
    East,
    West,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhysicalPort {
    Right,
    Down,
    Left,
    Up,
}

/// Direction-parity-dependent neighbor mapping (spec.md §4.9): on even rows
/// "north" maps to the down port and on odd rows to the up port
/// (symmetrically for south); on even columns "east" maps to right and on
/// odd columns to left.
fn neighbor_port(row: usize, col: usize, dir: Direction) -> PhysicalPort {
    match dir {
        Direction::North => if row % 2 == 0 { PhysicalPort::Down } else { PhysicalPort::Up },
        Direction::South => if row % 2 == 0 { PhysicalPort::Up } else { PhysicalPort::Down },
        Direction::East => if col % 2 == 0 { PhysicalPort::Right } else { PhysicalPort::Left },
        Direction::West => if col % 2 == 0 { PhysicalPort::Left } else { PhysicalPort::Right },
    }
}

/// Which link-vector index backs one of this node's four directional
/// registers. `right`/`left` always index [`Chip::east_links`]; `down`/`up`
/// always index [`Chip::north_links`]; `None` at the grid edge.
struct NodeLinks {
    right: Option<usize>,
    down: Option<usize>,
    left: Option<usize>,
    up: Option<usize>,
}

/// Resolves `index`'s four directional registers to link-vector indices,
/// following `neighbor_port`'s parity mapping. `east_links[index]` is the
/// link from `index` to its east neighbor; `west_links[index - 1]` is the
/// link from `index` to its west neighbor (the same link its west neighbor
/// calls its own east link); symmetrically for `north_links`/south.
fn node_links(index: usize) -> NodeLinks {
    let row = index / GRID_COLUMNS;
    let col = index % GRID_COLUMNS;

    let east_link = if col + 1 < GRID_COLUMNS { Some(index) } else { None };
    let west_link = if col > 0 { Some(index - 1) } else { None };
    let south_link = if row + 1 < GRID_ROWS { Some(index) } else { None };
    let north_link = if row > 0 { Some(index - GRID_COLUMNS) } else { None };

    let pick = |dir| match dir {
        PhysicalPort::Right => east_link,
        PhysicalPort::Left => west_link,
        PhysicalPort::Down => south_link,
        PhysicalPort::Up => north_link,
    };

    NodeLinks {
        right: pick(neighbor_port(row, col, Direction::East)),
        left: pick(neighbor_port(row, col, Direction::West)),
        down: pick(neighbor_port(row, col, Direction::South)),
        up: pick(neighbor_port(row, col, Direction::North)),
    }
}

/// Borrows two distinct indices of `slice` mutably at once. `i` and `j`
/// must differ; callers here derive them from [`node_links`], which never
/// produces the same link-vector index for both of a node's two registers
/// sharing a vector (east/west differ by one, as do north/south).
fn two_mut<T>(slice: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j);
    if i < j {
        let (left, right) = slice.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// A 144-node F18A chip. Owns every node plus the physical links between
/// them; `east_links[i]` is the link from node `i` to its east neighbor,
/// `north_links[i]` the link from node `i` to its north neighbor — edge
/// nodes simply never reference the links that would run off the grid.
pub struct Chip {
    nodes: Vec<NodeInterpreter>,
    east_links: Vec<Port>,
    north_links: Vec<Port>,
    active: Vec<bool>,
    active_count: usize,
    rom_image: [u32; ROM_SIZE],
}

impl Chip {
    pub fn new(rom_image: [u32; ROM_SIZE]) -> Self {
        Self {
            nodes: (0..NODE_COUNT).map(|i| NodeInterpreter::new(index_to_coord(i))).collect(),
            east_links: (0..NODE_COUNT).map(|_| Port::new()).collect(),
            north_links: (0..NODE_COUNT).map(|_| Port::new()).collect(),
            active: vec![false; NODE_COUNT],
            active_count: 0,
            rom_image,
        }
    }

    /// Hardware-resets every node, then loads each `CompiledNode` at its
    /// `coord`'s index and marks it active.
    pub fn boot(&mut self, images: &[CompiledNode]) -> Result<(), BootError> {
        for node in &mut self.nodes {
            node.reset(&self.rom_image);
        }
        for image in images {
            let index = coord_to_index(image.coord).ok_or(BootError::CoordOutOfRange { coord: image.coord })?;
            self.nodes[index].load(image)?;
            self.set_active(index, true);
        }
        Ok(())
    }

    fn set_active(&mut self, index: usize, active: bool) {
        if self.active[index] != active {
            self.active[index] = active;
            self.active_count = if active { self.active_count + 1 } else { self.active_count - 1 };
        }
    }

    pub fn active_node_count(&self) -> usize {
        self.active_count
    }

    /// Advances every active node by one slot (spec.md §5: "a tick of the
    /// chip visits every active node once"). A node that suspends drops out
    /// of the active set; a node whose transfer completed *because of*
    /// another node's step this tick is reactivated right after that step,
    /// by checking [`Port::take_woken`] on exactly the (up to four) links
    /// the step just touched — no scan over the rest of the chip.
    pub fn step_program(&mut self) {
        for index in 0..NODE_COUNT {
            if !self.active[index] {
                continue;
            }
            let links = node_links(index);

            let mut right_scratch = Port::new();
            let mut down_scratch = Port::new();
            let mut left_scratch = Port::new();
            let mut up_scratch = Port::new();

            let (right, left) = match (links.right, links.left) {
                (Some(r), Some(l)) => {
                    let (a, b) = two_mut(&mut self.east_links, r, l);
                    (a, b)
                }
                (Some(r), None) => (&mut self.east_links[r], &mut left_scratch),
                (None, Some(l)) => (&mut right_scratch, &mut self.east_links[l]),
                (None, None) => (&mut right_scratch, &mut left_scratch),
            };
            let (down, up) = match (links.down, links.up) {
                (Some(d), Some(u)) => {
                    let (a, b) = two_mut(&mut self.north_links, d, u);
                    (a, b)
                }
                (Some(d), None) => (&mut self.north_links[d], &mut up_scratch),
                (None, Some(u)) => (&mut down_scratch, &mut self.north_links[u]),
                (None, None) => (&mut down_scratch, &mut up_scratch),
            };

            let mut neighbors = NeighborPorts { right, down, left, up };
            let event = self.nodes[index].step_slot(index, &mut neighbors);

            match event {
                StepEvent::Suspended | StepEvent::Breakpoint => self.set_active(index, false),
                StepEvent::Continued => {}
            }

            self.reactivate_woken(&links);
        }
    }

    fn reactivate_woken(&mut self, links: &NodeLinks) {
        let mut woken = [None; 4];
        if let Some(i) = links.right {
            woken[0] = self.east_links[i].take_woken();
        }
        if let Some(i) = links.left {
            woken[1] = self.east_links[i].take_woken();
        }
        if let Some(i) = links.down {
            woken[2] = self.north_links[i].take_woken();
        }
        if let Some(i) = links.up {
            woken[3] = self.north_links[i].take_woken();
        }
        for node_index in woken.into_iter().flatten() {
            self.set_active(node_index, true);
        }
    }

    pub fn node(&self, coord: u16) -> Option<&NodeInterpreter> {
        coord_to_index(coord).map(|i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, coord: u16) -> Option<&mut NodeInterpreter> {
        coord_to_index(coord).map(move |i| &mut self.nodes[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_to_index_matches_the_documented_formula() {
        assert_eq!(coord_to_index(0), Some(0));
        assert_eq!(coord_to_index(17), Some(17));
        assert_eq!(coord_to_index(100), Some(18));
        assert_eq!(coord_to_index(707), Some(7 * 18 + 7));
    }

    #[test]
    fn index_to_coord_inverts_coord_to_index() {
        for coord in [0u16, 17, 100, 117, 707] {
            let index = coord_to_index(coord).unwrap();
            assert_eq!(index_to_coord(index), coord);
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert_eq!(coord_to_index(18), None); // column 18 doesn't exist
        assert_eq!(coord_to_index(800), None); // row 8 doesn't exist
    }

    #[test]
    fn a_freshly_booted_chip_has_no_active_nodes() {
        let chip = Chip::new([0; ROM_SIZE]);
        assert_eq!(chip.active_node_count(), 0);
    }

    #[test]
    fn even_row_north_maps_to_the_down_port() {
        assert_eq!(neighbor_port(0, 0, Direction::North), PhysicalPort::Down);
        assert_eq!(neighbor_port(1, 0, Direction::North), PhysicalPort::Up);
    }

    #[test]
    fn even_column_east_maps_to_the_right_port() {
        assert_eq!(neighbor_port(0, 0, Direction::East), PhysicalPort::Right);
        assert_eq!(neighbor_port(0, 1, Direction::East), PhysicalPort::Left);
    }

    /// Every horizontally or vertically adjacent pair of nodes must share
    /// exactly one link slot, no matter which of their own directional
    /// fields (right/left, up/down) resolves to it — the parity mirroring
    /// means two neighbors don't necessarily name their shared wire the
    /// same thing (spec.md §4.9).
    #[test]
    fn every_adjacent_row_pair_shares_one_east_link_slot() {
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLUMNS - 1 {
                let west = row * GRID_COLUMNS + col;
                let east = west + 1;
                let west_links = node_links(west);
                let east_links = node_links(east);
                let west_side = [west_links.right, west_links.left].into_iter().find(|l| *l == Some(west));
                let east_side = [east_links.right, east_links.left].into_iter().find(|l| *l == Some(west));
                assert_eq!(west_side, Some(Some(west)), "node {west} has no field pointing at link {west}");
                assert_eq!(east_side, Some(Some(west)), "node {east} has no field pointing at link {west}");
            }
        }
    }

    #[test]
    fn every_adjacent_column_pair_shares_one_north_link_slot() {
        for row in 0..GRID_ROWS - 1 {
            for col in 0..GRID_COLUMNS {
                let north = row * GRID_COLUMNS + col;
                let south = north + GRID_COLUMNS;
                let north_links = node_links(north);
                let south_links = node_links(south);
                let north_side = [north_links.down, north_links.up].into_iter().find(|l| *l == Some(north));
                let south_side = [south_links.down, south_links.up].into_iter().find(|l| *l == Some(north));
                assert_eq!(north_side, Some(Some(north)), "node {north} has no field pointing at link {north}");
                assert_eq!(south_side, Some(Some(north)), "node {south} has no field pointing at link {north}");
            }
        }
    }

    #[test]
    fn two_mut_returns_distinct_mutable_references_regardless_of_order() {
        let mut v = vec![1, 2, 3, 4];
        {
            let (a, b) = two_mut(&mut v, 1, 3);
            *a = 20;
            *b = 40;
        }
        assert_eq!(v, vec![1, 20, 3, 40]);
        {
            let (a, b) = two_mut(&mut v, 3, 1);
            *a = 41;
            *b = 21;
        }
        assert_eq!(v, vec![1, 21, 3, 41]);
    }

    fn node_image(coord: u16, words: &[(usize, u32)], a: u32) -> CompiledNode {
        let mut mem = [None; 64];
        for (addr, word) in words {
            mem[*addr] = Some(*word);
        }
        CompiledNode {
            coord,
            mem,
            len: words.len() as u16,
            a: Some(a),
            b: None,
            p: None,
            io: None,
            symbols: Default::default(),
            source_map: Vec::new(),
        }
    }

    /// A hand-assembled two-node program exercising the full suspend ->
    /// write -> reactivate -> retry -> collect pipeline through `Chip`,
    /// not just through a bare `Port` (spec.md §8's port-handshake
    /// property). Node 0 (`@p` then `!`) sends a literal to its east
    /// neighbor; node 1 (`@`) reads it from the matching port address on
    /// its own side of the same physical link.
    #[test]
    fn a_two_node_chip_completes_a_port_handshake_across_a_suspend_and_wake() {
        use f18a_isa::{pack_word, xor_load, xor_store, PortAddr};

        let right_addr = PortAddr::Right.addr();

        // word0: @p (8), ! (15), . (28, filler), ; (0, slot-3 filler)
        let sender_word0 = xor_store(pack_word(8, 15, 28, 0));
        let sender_data = xor_store(777);
        let sender = node_image(0, &[(0, sender_word0), (1, sender_data)], right_addr);

        // word0: @ (11), . (28), . (28), ; (0)
        let receiver_word0 = xor_store(pack_word(11, 28, 28, 0));
        let receiver = node_image(1, &[(0, receiver_word0)], right_addr);

        let mut chip = Chip::new([0; ROM_SIZE]);
        chip.boot(&[sender, receiver]).expect("boot should succeed");
        assert_eq!(chip.active_node_count(), 2);

        // Tick 1: both nodes complete their primed instruction fetch.
        chip.step_program();
        // Tick 2: node 0 executes `@p` (loads 777); node 1's `@` suspends
        // waiting for a writer and drops out of the active set.
        chip.step_program();
        assert_eq!(chip.active_node_count(), 1);
        // Tick 3: node 0 executes `!`, finds node 1's pending read, and
        // completes it, reactivating node 1 in time for this same sweep
        // (node 1's index comes after node 0's) to retry and collect it.
        chip.step_program();
        assert_eq!(chip.active_node_count(), 2);

        // Node memory (and anything passed through it, including a value
        // in transit over a port) stays XOR-encoded until something
        // explicitly decodes it, the same as an instruction word does.
        assert_eq!(xor_load(chip.node(1).unwrap().data.t), 777);
    }
}

use bulwark_ecs::{Entity, names};
use bulwark_game::Level;
use glam::IVec2;

/// What to overlay on the terrain.
#[derive(Debug, Clone, Default)]
pub struct RenderView {
    /// Cells of the enemy route, drawn under entities.
    pub route: Vec<IVec2>,
    /// Cell to mark with the cursor glyph, drawn last.
    pub highlight: Option<IVec2>,
}

/// Renderer-agnostic interface. All renderers implement this trait.
pub trait Renderer {
    type Output;

    fn render(&self, level: &Level, view: &RenderView) -> Self::Output;
}

/// Plain-text renderer, one character per cell.
#[derive(Debug, Clone)]
pub struct AsciiRenderer {
    pub route_glyph: char,
    pub highlight_glyph: char,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self {
            route_glyph: '*',
            highlight_glyph: '+',
        }
    }
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn glyph(entity: &Entity) -> char {
        if entity.has_active(names::PLAYER) {
            '@'
        } else if entity.has_active(names::TOWER) {
            'T'
        } else if entity.has_active(names::SPAWN_POINT) {
            'S'
        } else if entity.has_active(names::ENDPOINT) {
            'E'
        } else if entity.has_active(names::WAYPOINT) {
            entity
                .value::<f64>(names::WAYPOINT_NUMBER)
                .and_then(|n| char::from_digit(*n as u32, 10))
                .unwrap_or('W')
        } else {
            '?'
        }
    }
}

impl Renderer for AsciiRenderer {
    type Output = String;

    fn render(&self, level: &Level, view: &RenderView) -> String {
        let map = &level.tile_map;
        let width = map.width() as usize;
        let mut grid: Vec<char> = map
            .positions()
            .map(|p| map.get_tile(&level.registry, p).map_or(' ', |t| t.glyph))
            .collect();

        let mut put = |p: IVec2, c: char| {
            if let Some(i) = map.index(p) {
                grid[i] = c;
            }
        };
        for p in &view.route {
            put(*p, self.route_glyph);
        }
        let mut drawn = 0usize;
        for id in level.manager.collection(names::RENDERABLE) {
            let Some(entity) = level.manager.get(*id) else {
                continue;
            };
            let Some(tile) = entity.value::<IVec2>(names::TILE_POS) else {
                continue;
            };
            put(*tile, Self::glyph(entity));
            drawn += 1;
        }
        if let Some(p) = view.highlight {
            put(p, self.highlight_glyph);
        }
        tracing::trace!(drawn, route = view.route.len(), "ascii frame");

        let mut out = String::with_capacity(grid.len() + map.height() as usize);
        for row in grid.chunks(width.max(1)) {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}

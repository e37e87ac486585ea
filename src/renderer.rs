//! Drawing capability consumed by the overlay.
//!
//! The overlay never owns pixels or fonts: it issues text and line requests in
//! surface coordinates and lets the host rasterize them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HudPos {
    pub x: f32,
    pub y: f32,
}

impl HudPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HudExtent {
    pub width: u32,
    pub height: u32,
}

/// Float colour used for text
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HudColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl HudColor {
    pub const WHITE: HudColor = HudColor {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
}

/// 8-bit normalized colour used for line vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HudNormColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HudLineVertex {
    pub position: HudPos,
    pub color: HudNormColor,
}

pub trait HudRenderer {
    fn draw_text(&mut self, size: f32, pos: HudPos, color: HudColor, text: &str);

    /// Vertices are taken in pairs, one line segment per pair
    fn draw_lines(&mut self, vertices: &[HudLineVertex]);

    fn surface_size(&self) -> HudExtent;
}

/// One recorded draw request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Text {
        size: f32,
        pos: HudPos,
        color: HudColor,
        text: String,
    },
    Lines {
        vertices: Vec<HudLineVertex>,
    },
}

/// Renderer that keeps every request instead of drawing it
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    surface: HudExtent,
    pub commands: Vec<DrawCommand>,
}

impl RecordingRenderer {
    pub fn new(surface: HudExtent) -> Self {
        Self {
            surface,
            commands: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn texts(&self) -> impl Iterator<Item = (HudPos, &str)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { pos, text, .. } => Some((*pos, text.as_str())),
            DrawCommand::Lines { .. } => None,
        })
    }

    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for command in &self.commands {
            out.push_str(&serde_json::to_string(command)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl HudRenderer for RecordingRenderer {
    fn draw_text(&mut self, size: f32, pos: HudPos, color: HudColor, text: &str) {
        self.commands.push(DrawCommand::Text {
            size,
            pos,
            color,
            text: text.to_string(),
        });
    }

    fn draw_lines(&mut self, vertices: &[HudLineVertex]) {
        self.commands.push(DrawCommand::Lines {
            vertices: vertices.to_vec(),
        });
    }

    fn surface_size(&self) -> HudExtent {
        self.surface
    }
}

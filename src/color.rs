// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

/// A display color, stored as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    pub const fn new(hex: &'static str) -> Self {
        Self(hex)
    }

    pub fn hex(&self) -> &'static str {
        self.0
    }

    /// Red, green and blue channels, if the hex string is well formed
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some((channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Dark colors that keep white event text readable
pub const DEFAULT_PALETTE: [Color; 5] = [
    Color::new("#0B4B30"), // dark forest green
    Color::new("#0054A3"), // dark blue
    Color::new("#392083"), // deep purple
    Color::new("#5F3800"), // dark amber gold
    Color::new("#A20769"), // dark raspberry
];

/// Hands out one palette color per podcast and takes it back on release.
///
/// Free colors are always handed out in palette order, and a released color
/// returns to its palette slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorAllocator {
    palette: Vec<Color>,
    /// Palette indices not assigned to any podcast
    available: BTreeSet<usize>,
    assigned: HashMap<String, usize>,
}

impl ColorAllocator {
    /// Create an allocator able to color `max_podcasts` podcasts at once.
    ///
    /// Fails if the palette is smaller than the cap or repeats a color.
    pub fn new(palette: &[Color], max_podcasts: usize) -> Result<Self, ConfigError> {
        if palette.len() < max_podcasts || palette.is_empty() {
            return Err(ConfigError::PaletteTooSmall {
                cap: max_podcasts,
                palette: palette.len(),
            });
        }

        let mut seen = HashSet::new();
        for color in palette {
            if !seen.insert(color.hex().to_ascii_uppercase()) {
                return Err(ConfigError::DuplicatePaletteColor(color.to_string()));
            }
        }

        Ok(Self {
            palette: palette.to_vec(),
            available: (0..palette.len()).collect(),
            assigned: HashMap::new(),
        })
    }

    /// Color for a podcast, assigning the first free one on first request.
    ///
    /// With the pool exhausted this falls back to the first palette color
    /// without recording an assignment. `new` rules that out for any caller
    /// that respects its selection cap.
    pub fn get_color(&mut self, podcast_id: &str) -> Color {
        if let Some(&index) = self.assigned.get(podcast_id) {
            return self.palette[index];
        }

        match self.available.pop_first() {
            Some(index) => {
                self.assigned.insert(podcast_id.to_string(), index);
                self.palette[index]
            }
            None => {
                log::warn!("Ran out of podcast colors, reusing {}", self.palette[0]);
                self.palette[0]
            }
        }
    }

    /// Color already assigned to a podcast, without assigning one
    pub fn peek(&self, podcast_id: &str) -> Option<Color> {
        self.assigned.get(podcast_id).map(|&i| self.palette[i])
    }

    /// Return a podcast's color to the pool; no-op if it has none
    pub fn release(&mut self, podcast_id: &str) {
        if let Some(index) = self.assigned.remove(podcast_id) {
            self.available.insert(index);
        }
    }

    /// Release every color whose podcast is not in `selected`
    pub fn retain_selected(&mut self, selected: &HashSet<&str>) {
        let stale: Vec<String> = self
            .assigned
            .keys()
            .filter(|id| !selected.contains(id.as_str()))
            .cloned()
            .collect();

        for id in stale {
            self.release(&id);
        }
    }

    /// Return all colors to the pool
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.available = (0..self.palette.len()).collect();
    }

    /// Colors currently free, in the order they will be handed out
    pub fn available(&self) -> Vec<Color> {
        self.available.iter().map(|&i| self.palette[i]).collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> ColorAllocator {
        ColorAllocator::new(&DEFAULT_PALETTE, 5).unwrap()
    }

    #[test]
    fn assigns_in_palette_order() {
        let mut colors = allocator();

        assert_eq!(colors.get_color("a"), DEFAULT_PALETTE[0]);
        assert_eq!(colors.get_color("b"), DEFAULT_PALETTE[1]);
        assert_eq!(colors.available().len(), 3);
    }

    #[test]
    fn repeated_requests_are_idempotent() {
        let mut colors = allocator();

        let first = colors.get_color("a");
        let pool = colors.available();
        assert_eq!(colors.get_color("a"), first);
        assert_eq!(colors.available(), pool);
        assert_eq!(colors.assigned_count(), 1);
    }

    #[test]
    fn released_color_is_reused() {
        let mut colors = allocator();

        colors.get_color("x");
        let released = colors.get_color("y");
        colors.get_color("z");

        colors.release("y");
        assert_eq!(colors.get_color("w"), released);
    }

    #[test]
    fn release_of_unknown_podcast_is_noop() {
        let mut colors = allocator();
        colors.get_color("a");
        let before = colors.clone();

        colors.release("nobody");
        assert_eq!(colors, before);
    }

    #[test]
    fn assign_then_release_restores_pool() {
        let mut colors = allocator();
        colors.get_color("a");
        let before = colors.clone();

        colors.get_color("b");
        colors.release("b");
        assert_eq!(colors, before);
    }

    #[test]
    fn selected_podcasts_never_share_a_color() {
        let mut colors = allocator();
        let ids = ["a", "b", "c", "d", "e"];

        let assigned: HashSet<_> = ids.iter().map(|id| colors.get_color(id)).collect();
        assert_eq!(assigned.len(), ids.len());
        assert!(colors.available().is_empty());
    }

    #[test]
    fn exhaustion_falls_back_to_first_color() {
        let mut colors = ColorAllocator::new(&DEFAULT_PALETTE[..2], 2).unwrap();
        colors.get_color("a");
        colors.get_color("b");

        assert_eq!(colors.get_color("c"), DEFAULT_PALETTE[0]);
        assert_eq!(colors.assigned_count(), 2);
        assert!(colors.peek("c").is_none());
    }

    #[test]
    fn retain_selected_releases_the_rest() {
        let mut colors = allocator();
        colors.get_color("a");
        colors.get_color("b");

        colors.retain_selected(&HashSet::from(["b"]));
        assert!(colors.peek("a").is_none());
        assert_eq!(colors.peek("b"), Some(DEFAULT_PALETTE[1]));
        assert_eq!(colors.available()[0], DEFAULT_PALETTE[0]);
    }

    #[test]
    fn reset_frees_everything() {
        let mut colors = allocator();
        colors.get_color("a");
        colors.get_color("b");

        colors.reset();
        assert_eq!(colors, allocator());
    }

    #[test]
    fn cap_larger_than_palette_is_rejected() {
        assert!(matches!(
            ColorAllocator::new(&DEFAULT_PALETTE, 6),
            Err(ConfigError::PaletteTooSmall { cap: 6, palette: 5 })
        ));
    }

    #[test]
    fn duplicate_palette_entries_are_rejected() {
        let palette = [Color::new("#112233"), Color::new("#112233")];
        assert!(matches!(
            ColorAllocator::new(&palette, 1),
            Err(ConfigError::DuplicatePaletteColor(_))
        ));
    }

    #[test]
    fn rgb_decodes_hex() {
        assert_eq!(DEFAULT_PALETTE[1].rgb(), Some((0x00, 0x54, 0xA3)));
        assert_eq!(Color::new("blue").rgb(), None);
    }
}

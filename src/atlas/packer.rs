//! Guillotine rectangle packing into a fixed-width, open-ended strip.
//!
//! The strip is as wide as the widest rectangle or the square root of the
//! total area, whichever is larger, and grows downwards. Free space is kept
//! as a list of rectangles; the bottom one is unbounded.

/// Pixel size of a rectangle to pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectSize {
    pub width: u32,
    pub height: u32,
}

impl RectSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Result of one packing run.
#[derive(Debug, Clone, PartialEq)]
pub struct Packing {
    pub width: u32,
    pub height: u32,
    /// Top-left corner per input rectangle, in input order.
    pub positions: Vec<[u32; 2]>,
}

impl Packing {
    /// Packed area over bounding area, in (0, 1].
    pub fn efficiency(&self, sizes: &[RectSize]) -> f64 {
        let bounding = self.width as u64 * self.height as u64;
        if bounding == 0 {
            return 1.0;
        }
        let used: u64 = sizes.iter().map(RectSize::area).sum();
        used as f64 / bounding as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct FreeRect {
    x: u32,
    y: u32,
    width: u32,
    /// `None` for the unbounded bottom strip.
    height: Option<u32>,
}

impl FreeRect {
    fn fits(&self, size: RectSize) -> bool {
        size.width <= self.width && self.height.map_or(true, |h| size.height <= h)
    }

    /// Smaller leftover side after placing `size`; the unbounded strip scores last.
    fn short_side_fit(&self, size: RectSize) -> u32 {
        match self.height {
            Some(h) => (self.width - size.width).min(h - size.height),
            None => u32::MAX,
        }
    }
}

/// Pack with both sort orders and keep the denser result; ties keep the
/// area-sorted run.
pub fn pack(sizes: &[RectSize]) -> Packing {
    let by_area = pack_in_order(sizes, &order_by(sizes, |s| (s.area(), s.height as u64)));
    let by_width = pack_in_order(sizes, &order_by(sizes, |s| (s.width as u64, s.height as u64)));

    let (area_eff, width_eff) = (by_area.efficiency(sizes), by_width.efficiency(sizes));
    log::debug!(
        "Atlas packing: area-first {}x{} ({:.3}), width-first {}x{} ({:.3})",
        by_area.width,
        by_area.height,
        area_eff,
        by_width.width,
        by_width.height,
        width_eff
    );
    if width_eff > area_eff {
        by_width
    } else {
        by_area
    }
}

/// Indices sorted by a descending key, stable on input order.
fn order_by(sizes: &[RectSize], key: impl Fn(&RectSize) -> (u64, u64)) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| key(&sizes[b]).cmp(&key(&sizes[a])));
    order
}

/// Best-short-side-fit guillotine packing in the given order.
pub fn pack_in_order(sizes: &[RectSize], order: &[usize]) -> Packing {
    let total_area: u64 = sizes.iter().map(RectSize::area).sum();
    let widest = sizes.iter().map(|s| s.width).max().unwrap_or(0);
    let width = widest.max((total_area as f64).sqrt().ceil() as u32);

    let mut free = vec![FreeRect {
        x: 0,
        y: 0,
        width,
        height: None,
    }];
    let mut positions = vec![[0u32; 2]; sizes.len()];
    let mut height = 0;

    for &i in order {
        let size = sizes[i];
        if size.width == 0 || size.height == 0 {
            continue;
        }

        let Some(slot) = free
            .iter()
            .enumerate()
            .filter(|(_, rect)| rect.fits(size))
            .min_by_key(|(_, rect)| rect.short_side_fit(size))
            .map(|(slot, _)| slot)
        else {
            // The bottom strip is at least as wide as any rectangle.
            debug_assert!(false, "no free slot for a {}x{} rectangle", size.width, size.height);
            log::error!(
                "No free slot for a {}x{} rectangle in a {} wide atlas",
                size.width,
                size.height,
                width
            );
            continue;
        };

        let rect = free.swap_remove(slot);
        positions[i] = [rect.x, rect.y];
        height = height.max(rect.y + size.height);
        free.extend(split(rect, size));
    }

    Packing {
        width,
        height,
        positions,
    }
}

/// Split the space left around a placed rectangle into two free rectangles.
fn split(rect: FreeRect, size: RectSize) -> Vec<FreeRect> {
    let leftover_w = rect.width - size.width;
    let (right, bottom) = match rect.height {
        // The strip always keeps its full width below the placement.
        None => (
            FreeRect {
                x: rect.x + size.width,
                y: rect.y,
                width: leftover_w,
                height: Some(size.height),
            },
            FreeRect {
                x: rect.x,
                y: rect.y + size.height,
                width: rect.width,
                height: None,
            },
        ),
        Some(h) => {
            let leftover_h = h - size.height;
            if leftover_w < leftover_h {
                (
                    FreeRect {
                        x: rect.x + size.width,
                        y: rect.y,
                        width: leftover_w,
                        height: Some(size.height),
                    },
                    FreeRect {
                        x: rect.x,
                        y: rect.y + size.height,
                        width: rect.width,
                        height: Some(leftover_h),
                    },
                )
            } else {
                (
                    FreeRect {
                        x: rect.x + size.width,
                        y: rect.y,
                        width: leftover_w,
                        height: Some(h),
                    },
                    FreeRect {
                        x: rect.x,
                        y: rect.y + size.height,
                        width: size.width,
                        height: Some(leftover_h),
                    },
                )
            }
        }
    };

    [right, bottom]
        .into_iter()
        .filter(|r| r.width > 0 && r.height != Some(0))
        .collect()
}
